//! An English fragment with Davidsonian event semantics, written as a feature grammar.
//!
//! The grammar text lives in `grammars/event.fcfg` and is embedded as [`EVENT_GRAMMAR`].
//! [`grammar`] parses it once; [`Interpreter`] turns sentences into closed formulas, and
//! [`validate`] checks a grammar for the well-formedness properties the composition relies on.

#[macro_use]
extern crate lazy_static;

pub mod interpret;
pub mod validate;

use chartparse::{FeatureGrammar, GrammarError};

pub use crate::interpret::{tokenize, InterpretError, Interpreter, Reading};
pub use crate::validate::{validate, Diagnostic, FeatureSchema, Severity};

pub static EVENT_GRAMMAR: &str = include_str!("../grammars/event.fcfg");

lazy_static! {
    static ref GRAMMAR: Result<FeatureGrammar, GrammarError> = EVENT_GRAMMAR.parse();
}

/// The embedded grammar, read on first use.
pub fn grammar() -> Result<&'static FeatureGrammar, GrammarError> {
    match &*GRAMMAR {
        Ok(grammar) => Ok(grammar),
        Err(e) => Err(e.clone()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chartparse::Category;

    #[test]
    fn test_embedded_grammar_loads() {
        let grammar = grammar().unwrap();
        assert_eq!(grammar.start(), &Category::new("S"));
        assert_eq!(grammar.productions_with_lhs("S").len(), 1);
        assert_eq!(grammar.productions_with_lhs("PP").len(), 3);
        assert_eq!(grammar.lexical_productions("an").len(), 1);
        assert!(grammar.productions().iter().all(|p| p.line > 0));
    }
}
