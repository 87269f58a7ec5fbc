use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

use itertools::Itertools;
use smallvec::SmallVec;

use crate::featstruct::{Bindings, Category};

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Terminal(String),
    NonTerminal(Category),
}

/// The part of a symbol the chart indexes on: a terminal's word, or a category's name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKey {
    Terminal(String),
    NonTerminal(String),
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::NonTerminal(nt) => write!(f, "NonTerminal::{}", nt),
            Symbol::Terminal(t) => write!(f, "Terminal::{{ \"{}\" }}", t),
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::NonTerminal(nt) => write!(f, "{}", nt),
            Symbol::Terminal(t) => write!(f, "'{}'", t),
        }
    }
}

impl Symbol {
    pub fn is_nonterminal(&self) -> bool {
        matches!(self, Symbol::NonTerminal(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn key(&self) -> SymbolKey {
        match self {
            Symbol::Terminal(t) => SymbolKey::Terminal(t.clone()),
            Symbol::NonTerminal(nt) => SymbolKey::NonTerminal(nt.name.clone()),
        }
    }

    pub fn category(&self) -> Option<&Category> {
        match self {
            Symbol::Terminal(_) => None,
            Symbol::NonTerminal(nt) => Some(nt),
        }
    }

    pub fn terminal(&self) -> Option<&str> {
        match self {
            Symbol::Terminal(t) => Some(t.as_str()),
            Symbol::NonTerminal(_) => None,
        }
    }

    pub(crate) fn variables(&self) -> Vec<String> {
        self.category().map(Category::variables).unwrap_or_default()
    }

    pub(crate) fn rename_variables<F: Fn(&str) -> Option<String>>(&self, rename: &F) -> Self {
        match self {
            Symbol::Terminal(_) => self.clone(),
            Symbol::NonTerminal(nt) => Symbol::NonTerminal(nt.rename_variables(rename)),
        }
    }

    pub(crate) fn substitute(&self, bindings: &Bindings) -> Self {
        match self {
            Symbol::Terminal(_) => self.clone(),
            Symbol::NonTerminal(nt) => Symbol::NonTerminal(nt.substitute(bindings)),
        }
    }
}

pub struct Production {
    pub lhs: Category,
    pub rhs: SmallVec<[Symbol; 6]>,
    /// 1-based line of the grammar text the production was read from, or 0.
    pub line: usize,
}

impl Clone for Production {
    fn clone(&self) -> Self {
        Production {
            lhs: self.lhs.clone(),
            rhs: self.rhs.clone(),
            line: self.line,
        }
    }
}

// The source line is not part of a production's identity.
impl PartialEq for Production {
    fn eq(&self, other: &Self) -> bool {
        self.lhs == other.lhs && self.rhs == other.rhs
    }
}

impl Eq for Production {}

impl Hash for Production {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lhs.hash(state);
        self.rhs.hash(state);
    }
}

impl Debug for Production {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Production({})", self)
    }
}

impl Production {
    pub fn new(lhs: Category, rhs: Vec<Symbol>) -> Self {
        Self {
            lhs,
            rhs: rhs.into(),
            line: 0,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    pub fn is_nonlexical(&self) -> bool {
        self.rhs.iter().all(Symbol::is_nonterminal)
    }

    pub fn is_lexical(&self) -> bool {
        !self.is_nonlexical()
    }

    /// The category's name when this production maps a single word to a category, e.g.
    /// `PropN[...] -> 'Angus'`.
    pub fn preterminal(&self) -> Option<&str> {
        match self.rhs.as_slice() {
            [Symbol::Terminal(_)] => Some(self.lhs.name.as_str()),
            _ => None,
        }
    }
}

impl Display for Production {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.lhs,
            self.rhs.iter().map(|x| x.to_string()).join(" ")
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::featstruct::FeatureValue;

    #[test]
    fn test_lexical_production() {
        let p = Production::new(
            Category::new("PropN").with_feature("num", FeatureValue::Atom("sg".into())),
            vec![Symbol::Terminal("Angus".into())],
        );
        assert!(p.is_lexical());
        assert_eq!(p.preterminal(), Some("PropN"));
        assert_eq!(p.to_string(), "PropN[num=sg] -> 'Angus'");
    }

    #[test]
    fn test_line_is_not_identity() {
        let p = Production::new(
            Category::new("S"),
            vec![
                Symbol::NonTerminal(Category::new("NP")),
                Symbol::NonTerminal(Category::new("VP")),
            ],
        );
        let q = p.clone().at_line(12);
        assert_eq!(p, q);
        assert!(p.is_nonlexical());
        assert_eq!(p.preterminal(), None);
        assert_eq!(p.rhs[1].key(), SymbolKey::NonTerminal("VP".into()));
    }
}
