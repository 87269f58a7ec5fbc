use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("line {line}: {msg}")]
    Syntax { line: usize, msg: String },
    #[error("grammar contains no productions")]
    Empty,
    #[error("line {line}: unknown directive '%{directive}'")]
    UnknownDirective { line: usize, directive: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("grammar does not cover some of the input words: {}", .0.join(", "))]
    Coverage(Vec<String>),
}
