use crate::edge::{Edge, EdgeI};
use crate::production::SymbolKey;

/// Edge properties to select on. Symbols are compared by [`SymbolKey`], so selection is by
/// category name and leaves unification to the caller.
#[derive(Clone, PartialEq, Eq, Hash, Default, Debug)]
pub struct Restrictions {
    pub(crate) start: Option<usize>,
    pub(crate) end: Option<usize>,
    pub(crate) lhs: Option<SymbolKey>,
    pub(crate) next_sym: Option<SymbolKey>,
    pub(crate) is_complete: Option<bool>,
}

/// Which fields of a [`Restrictions`] are set, as a bit set. Edges are indexed once per
/// combination of fields the rules select on.
#[derive(Debug, Hash, Copy, Clone, Eq, PartialEq)]
pub struct RestrictionKeys(u32);

const START: u32 = 1;
const END: u32 = 1 << 1;
const LHS: u32 = 1 << 2;
const NEXT_SYM: u32 = 1 << 3;
const COMPLETE: u32 = 1 << 4;

impl RestrictionKeys {
    fn has(&self, field: u32) -> bool {
        self.0 & field != 0
    }

    /// The restrictions `edge` satisfies on exactly these fields.
    pub(crate) fn read_edge(&self, edge: &Edge) -> Restrictions {
        Restrictions {
            start: self.has(START).then(|| edge.start()),
            end: self.has(END).then(|| edge.end()),
            lhs: self.has(LHS).then(|| edge.lhs().key()),
            next_sym: self
                .has(NEXT_SYM)
                .then(|| edge.next_sym().map(|s| s.key()))
                .flatten(),
            is_complete: self.has(COMPLETE).then(|| edge.is_complete()),
        }
    }
}

impl Restrictions {
    pub(crate) fn is_empty(&self) -> bool {
        self.keys().0 == 0
    }

    pub(crate) fn keys(&self) -> RestrictionKeys {
        let fields = [
            (self.start.is_some(), START),
            (self.end.is_some(), END),
            (self.lhs.is_some(), LHS),
            (self.next_sym.is_some(), NEXT_SYM),
            (self.is_complete.is_some(), COMPLETE),
        ];
        RestrictionKeys(
            fields
                .iter()
                .filter(|(set, _)| *set)
                .fold(0, |keys, (_, field)| keys | field),
        )
    }

    pub fn start(self, start: usize) -> Self {
        Restrictions {
            start: Some(start),
            ..self
        }
    }

    pub fn end(self, end: usize) -> Self {
        Restrictions {
            end: Some(end),
            ..self
        }
    }

    pub fn lhs(self, lhs: SymbolKey) -> Self {
        Restrictions {
            lhs: Some(lhs),
            ..self
        }
    }

    pub fn next_sym(self, next_sym: SymbolKey) -> Self {
        Restrictions {
            next_sym: Some(next_sym),
            ..self
        }
    }

    pub fn complete(self, is_complete: bool) -> Self {
        Restrictions {
            is_complete: Some(is_complete),
            ..self
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::edge::LeafEdge;
    use crate::production::Symbol;

    #[test]
    fn test_keys_round_trip_through_edges() {
        let restriction = Restrictions::default()
            .start(2)
            .lhs(SymbolKey::Terminal("walks".into()))
            .complete(true);
        let edge = Edge::_L(LeafEdge::new(Symbol::Terminal("walks".into()), 2));
        assert_eq!(restriction.keys().read_edge(&edge), restriction);
        assert!(!restriction.is_empty());
        assert!(Restrictions::default().is_empty());
    }
}
