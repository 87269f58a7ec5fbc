use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogicError {
    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        offset: usize,
    },

    #[error("unexpected end of expression, expected {0}")]
    UnexpectedEnd(&'static str),

    #[error("unrecognised character '{ch}' at offset {offset}")]
    BadChar { ch: char, offset: usize },

    #[error("beta reduction did not reach a normal form within {0} steps")]
    Diverged(usize),
}
