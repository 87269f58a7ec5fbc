use std::collections::hash_map::DefaultHasher;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use fnv::FnvHashMap;
use smallvec::SmallVec;

use crate::featstruct::Bindings;
use crate::production::{Production, Symbol};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Span {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

pub(crate) trait EdgeI: Clone {
    fn span(&self) -> Span;

    fn start(&self) -> usize {
        self.span().start
    }

    fn end(&self) -> usize {
        self.span().end
    }

    fn length(&self) -> usize {
        self.span().end - self.span().start
    }

    fn lhs(&self) -> &Symbol;

    fn rhs(&self) -> &[Symbol];

    fn dot(&self) -> usize;

    fn next_sym(&self) -> Option<&Symbol>;

    fn is_complete(&self) -> bool;
}

/// A dotted production over a span of the input. Variables are always named canonically
/// (`?_0`, `?_1`, ... in order of appearance), so equal analyses compare equal.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TreeEdge {
    span: Span,
    dot: usize,
    lhs: Symbol,
    rhs: SmallVec<[Symbol; 6]>,
}

impl EdgeI for TreeEdge {
    fn span(&self) -> Span {
        self.span
    }

    fn lhs(&self) -> &Symbol {
        &self.lhs
    }

    fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }

    fn dot(&self) -> usize {
        self.dot
    }

    fn next_sym(&self) -> Option<&Symbol> {
        self.rhs.get(self.dot)
    }

    fn is_complete(&self) -> bool {
        self.dot == self.rhs.len()
    }
}

impl TreeEdge {
    pub(crate) fn from_production(production: &Production, index: usize) -> Self {
        TreeEdge {
            span: Span {
                start: index,
                end: index,
            },
            dot: 0,
            lhs: Symbol::NonTerminal(production.lhs.clone()),
            rhs: production.rhs.clone(),
        }
        .canonical()
    }

    fn variables(&self) -> Vec<String> {
        let mut vars: Vec<String> = Vec::new();
        let all = std::iter::once(&self.lhs)
            .chain(self.rhs.iter())
            .flat_map(Symbol::variables);
        for var in all {
            if !vars.contains(&var) {
                vars.push(var);
            }
        }
        vars
    }

    fn rename_variables<F: Fn(&str) -> Option<String>>(&self, rename: &F) -> Self {
        TreeEdge {
            span: self.span,
            dot: self.dot,
            lhs: self.lhs.rename_variables(rename),
            rhs: self.rhs.iter().map(|s| s.rename_variables(rename)).collect(),
        }
    }

    fn canonical(self) -> Self {
        let names: FnvHashMap<String, String> = self
            .variables()
            .into_iter()
            .enumerate()
            .map(|(i, var)| (var, format!("_{}", i)))
            .collect();
        self.rename_variables(&|var| names.get(var).cloned())
    }

    /// Moves the dot over `complete`, which must be a complete edge starting where this edge
    /// ends and whose left-hand side unifies with the next symbol. Bindings from the
    /// unification are applied to the whole new edge.
    pub(crate) fn combine<E: EdgeI>(&self, complete: &E) -> Option<Self> {
        if self.is_complete() || !complete.is_complete() || self.end() != complete.start() {
            return None;
        }
        let mut bindings = Bindings::default();
        match (self.next_sym()?, complete.lhs()) {
            (Symbol::Terminal(expected), Symbol::Terminal(found)) => {
                if expected != found {
                    return None;
                }
            }
            (Symbol::NonTerminal(expected), Symbol::NonTerminal(found)) => {
                // Both edges name their variables `?_0, ?_1, ...`; keep them apart.
                let found = found.rename_variables(&|var| Some(format!("{}r", var)));
                if !expected.unify(&found, &mut bindings) {
                    return None;
                }
            }
            _ => return None,
        }
        Some(self.move_dot_forward(complete.end(), &bindings))
    }

    fn move_dot_forward(&self, new_end: usize, bindings: &Bindings) -> Self {
        TreeEdge {
            span: Span {
                start: self.start(),
                end: new_end,
            },
            dot: self.dot + 1,
            lhs: self.lhs.substitute(bindings),
            rhs: self.rhs.iter().map(|s| s.substitute(bindings)).collect(),
        }
        .canonical()
    }
}

impl Display for TreeEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut arrow_string = self.lhs.to_string();
        arrow_string.push_str(" ->");
        for (i, val) in self.rhs.iter().enumerate() {
            if i == self.dot {
                arrow_string.push_str(&format!(" * {}", val));
            } else {
                arrow_string.push_str(&format!(" {}", val));
            }
        }

        if self.is_complete() {
            arrow_string.push_str(" *");
        }

        write!(f, "[{}:{}] {}", self.start(), self.end(), arrow_string)
    }
}

impl Debug for TreeEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Edge: {}]", self)
    }
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct LeafEdge {
    leaf: Symbol,
    index: usize,
}

impl LeafEdge {
    pub fn new(leaf: Symbol, index: usize) -> Self {
        Self { leaf, index }
    }
}

impl EdgeI for LeafEdge {
    fn span(&self) -> Span {
        Span {
            start: self.index,
            end: self.index + 1,
        }
    }

    fn lhs(&self) -> &Symbol {
        &self.leaf
    }

    fn rhs(&self) -> &[Symbol] {
        &[]
    }

    fn dot(&self) -> usize {
        0
    }

    fn next_sym(&self) -> Option<&Symbol> {
        None
    }

    fn is_complete(&self) -> bool {
        true
    }
}

impl Display for LeafEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.start(), self.end(), self.leaf)
    }
}

impl Debug for LeafEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Edge: {}]", self)
    }
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub enum Edge {
    _L(LeafEdge),
    _T(TreeEdge),
}

impl EdgeI for Edge {
    fn span(&self) -> Span {
        match self {
            Edge::_L(l) => l.span(),
            Edge::_T(t) => t.span(),
        }
    }

    fn lhs(&self) -> &Symbol {
        match self {
            Edge::_L(l) => l.lhs(),
            Edge::_T(t) => t.lhs(),
        }
    }

    fn rhs(&self) -> &[Symbol] {
        match self {
            Edge::_L(l) => l.rhs(),
            Edge::_T(t) => t.rhs(),
        }
    }

    fn dot(&self) -> usize {
        match self {
            Edge::_L(l) => l.dot(),
            Edge::_T(t) => t.dot(),
        }
    }

    fn next_sym(&self) -> Option<&Symbol> {
        match self {
            Edge::_L(l) => l.next_sym(),
            Edge::_T(t) => t.next_sym(),
        }
    }

    fn is_complete(&self) -> bool {
        match self {
            Edge::_L(l) => l.is_complete(),
            Edge::_T(t) => t.is_complete(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct EdgeWrapper {
    pub(crate) inner: Rc<Edge>,
    inner_hash: u64,
}

impl Hash for EdgeWrapper {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner_hash.hash(state);
    }
}

impl EdgeWrapper {
    pub(crate) fn is_leafedge(&self) -> bool {
        matches!(self.inner.as_ref(), Edge::_L(_))
    }

    pub(crate) fn start(&self) -> usize {
        self.inner.start()
    }

    pub(crate) fn end(&self) -> usize {
        self.inner.end()
    }

    pub(crate) fn lhs(&self) -> &Symbol {
        self.inner.lhs()
    }

    pub(crate) fn next_sym(&self) -> Option<&Symbol> {
        self.inner.next_sym()
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }

    /// See [`TreeEdge::combine`]. Leaf edges never have a dot to move.
    pub(crate) fn combine(&self, complete: &EdgeWrapper) -> Option<Self> {
        match self.inner.as_ref() {
            Edge::_L(_) => None,
            Edge::_T(t) => t.combine(complete.inner.as_ref()).map(Self::from),
        }
    }
}

impl From<TreeEdge> for EdgeWrapper {
    fn from(t: TreeEdge) -> Self {
        Self::wrap(Edge::_T(t))
    }
}

impl From<LeafEdge> for EdgeWrapper {
    fn from(l: LeafEdge) -> Self {
        Self::wrap(Edge::_L(l))
    }
}

impl EdgeWrapper {
    fn wrap(edge: Edge) -> Self {
        let inner = Rc::new(edge);
        let mut hasher = DefaultHasher::new();
        inner.hash(&mut hasher);
        let inner_hash = hasher.finish();
        Self { inner, inner_hash }
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::_L(l) => f.write_str(&l.to_string()),
            Edge::_T(t) => f.write_str(&t.to_string()),
        }
    }
}

impl Display for EdgeWrapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl Debug for EdgeWrapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Edge: {}]", self.inner)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::featstruct::{Category, FeatureValue};

    fn np_rule() -> Production {
        // NP[num=?n] -> Det[num=?n] N[num=?n]
        let n = || FeatureValue::Var("n".into());
        Production::new(
            Category::new("NP").with_feature("num", n()),
            vec![
                Symbol::NonTerminal(Category::new("Det").with_feature("num", n())),
                Symbol::NonTerminal(Category::new("N").with_feature("num", n())),
            ],
        )
    }

    fn lexical(cat: &str, num: &str, word: &str, index: usize) -> TreeEdge {
        let p = Production::new(
            Category::new(cat).with_feature("num", FeatureValue::Atom(num.into())),
            vec![Symbol::Terminal(word.into())],
        );
        let leaf = LeafEdge::new(Symbol::Terminal(word.into()), index);
        TreeEdge::from_production(&p, index).combine(&leaf).unwrap()
    }

    #[test]
    fn test_canonical_variables() {
        let edge = TreeEdge::from_production(&np_rule(), 0);
        assert_eq!(
            edge.to_string(),
            "[0:0] NP[num=?_0] -> * Det[num=?_0] N[num=?_0]"
        );
        assert_eq!(edge, TreeEdge::from_production(&np_rule(), 0));
    }

    #[test]
    fn test_combine_propagates_bindings() {
        let edge = TreeEdge::from_production(&np_rule(), 0);
        let det = lexical("Det", "sg", "every", 0);
        assert!(det.is_complete());

        let edge = edge.combine(&det).unwrap();
        assert_eq!(edge.to_string(), "[0:1] NP[num=sg] -> Det[num=sg] * N[num=sg]");

        assert!(edge.combine(&lexical("N", "pl", "boys", 1)).is_none());
        let complete = edge.combine(&lexical("N", "sg", "boy", 1)).unwrap();
        assert!(complete.is_complete());
        assert_eq!(complete.span(), Span { start: 0, end: 2 });
    }

    #[test]
    fn test_combine_requires_adjacency() {
        let edge = TreeEdge::from_production(&np_rule(), 0);
        assert!(edge.combine(&lexical("Det", "sg", "every", 1)).is_none());
    }

    #[test]
    fn test_wrapper_equality() {
        let a: EdgeWrapper = TreeEdge::from_production(&np_rule(), 3).into();
        let b: EdgeWrapper = TreeEdge::from_production(&np_rule(), 3).into();
        let c: EdgeWrapper = LeafEdge::new(Symbol::Terminal("boy".into()), 3).into();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(c.is_leafedge());
        assert!(c.combine(&a).is_none());
    }
}
