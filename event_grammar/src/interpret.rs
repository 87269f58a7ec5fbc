use chartparse::{ChartParser, FeatureGrammar, ParseError, Tree};
use logic::{Expr, LogicError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterpretError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("could not reduce the semantics of {tree}: {source}")]
    Logic { tree: String, source: LogicError },
    #[error("parse {0} has no semantics at its root")]
    MissingSem(String),
    #[error("semantics of {tree} reduced to {sem}, which applies a term that is not a predicate")]
    Stuck { tree: String, sem: String },
}

/// One analysis of a sentence: its parse tree and the reduced semantics of the root.
#[derive(Clone, Debug)]
pub struct Reading {
    pub tree: Tree,
    pub sem: Expr,
}

/// Splits a sentence into tokens on whitespace. Words are matched case-sensitively.
pub fn tokenize(sentence: &str) -> Vec<String> {
    sentence.split_whitespace().map(String::from).collect()
}

pub struct Interpreter<'a> {
    parser: ChartParser<'a>,
}

impl<'a> Interpreter<'a> {
    pub fn new(grammar: &'a FeatureGrammar) -> Self {
        Interpreter {
            parser: ChartParser::from_grammar(grammar),
        }
    }

    pub fn interpret(&self, sentence: &str) -> Result<Vec<Reading>, InterpretError> {
        self.interpret_tokens(&tokenize(sentence))
    }

    /// Every reading of `tokens`. Covered input the grammar cannot analyse gives no readings.
    pub fn interpret_tokens(&self, tokens: &[String]) -> Result<Vec<Reading>, InterpretError> {
        let trees = self.parser.parse(tokens)?;
        log::debug!("{} parses for {:?}", trees.len(), tokens.join(" "));

        trees
            .into_iter()
            .map(|tree| {
                let sem = tree
                    .sem()
                    .ok_or_else(|| InterpretError::MissingSem(tree.skeleton()))?
                    .simplify()
                    .map_err(|source| InterpretError::Logic {
                        tree: tree.skeleton(),
                        source,
                    })?;
                if sem.has_stuck_application() {
                    return Err(InterpretError::Stuck {
                        tree: tree.skeleton(),
                        sem: sem.to_string(),
                    });
                }
                let unresolved = sem.feature_variables();
                if !unresolved.is_empty() {
                    log::warn!(
                        "semantics of {} still mentions ?{}",
                        tree.skeleton(),
                        unresolved.join(", ?")
                    );
                }
                Ok(Reading { tree, sem })
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("  every boy\twalks \n"), vec!["every", "boy", "walks"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_missing_sem() {
        let grammar: FeatureGrammar = "S -> 'hello'".parse().unwrap();
        let interpreter = Interpreter::new(&grammar);
        match interpreter.interpret("hello") {
            Err(InterpretError::MissingSem(tree)) => assert_eq!(tree, "(S hello)"),
            other => panic!("expected a missing semantics error, got {:?}", other),
        }
    }

    #[test]
    fn test_divergent_semantics() {
        let grammar: FeatureGrammar =
            r"S[sem=<(\x.x(x))(\x.x(x))>] -> 'loop'".parse().unwrap();
        let interpreter = Interpreter::new(&grammar);
        assert!(matches!(
            interpreter.interpret("loop"),
            Err(InterpretError::Logic {
                source: LogicError::Diverged(_),
                ..
            })
        ));
    }

    #[test]
    fn test_determiner_without_event_argument() {
        let grammar: FeatureGrammar = r"
S[sem=<exists e.?subj(e,?vp)>] -> NP[sem=?subj] VP[sem=?vp]
NP[sem=<?det(?nom)>] -> Det[sem=?det] N[sem=?nom]
Det[sem=<\P R.all x.(P(x) -> R(x))>] -> 'every'
N[sem=<boy>] -> 'boy'
VP[sem=<\e x.walk(e,x)>] -> 'walks'
"
        .parse()
        .unwrap();
        let interpreter = Interpreter::new(&grammar);
        match interpreter.interpret("every boy walks") {
            Err(InterpretError::Stuck { tree, .. }) => {
                assert_eq!(tree, "(S (NP (Det every) (N boy)) (VP walks))")
            }
            other => panic!("expected stuck semantics, got {:?}", other),
        }
    }
}
