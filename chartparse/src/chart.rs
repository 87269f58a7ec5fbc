use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use fnv::FnvHashMap;
use indexmap::IndexSet;
use unicode_width::UnicodeWidthStr;

use crate::edge::{EdgeI, EdgeWrapper};
use crate::featstruct::{Bindings, Category};
use crate::production::SymbolKey;
use crate::select::{RestrictionKeys, Restrictions};
use crate::tree::Tree;

type EdgeList = Rc<Vec<EdgeWrapper>>;
type TreeMemo = HashMap<(EdgeWrapper, Option<Category>), Vec<Tree>>;

/// Renames the variables of a category passed from a parent edge to a child so they cannot
/// clash with the child edge's own `?_0, ?_1, ...`.
fn handed_down(category: &Category) -> Category {
    let vars = category.variables();
    category.rename_variables(&|var| {
        vars.iter()
            .position(|v| v == var)
            .map(|i| format!("p{}", i))
    })
}

/// The left-hand category of a complete tree edge and the categories of its right-hand side,
/// after unifying the left-hand side with `expected`. The label also takes on any features of
/// `expected` the edge does not mention. Terminals have no category.
fn refine(
    edge: &EdgeWrapper,
    expected: Option<&Category>,
) -> Option<(Category, Vec<Option<Category>>)> {
    let lhs = edge.lhs().category()?;
    let rhs = edge.inner.rhs();
    let mut bindings = Bindings::default();
    let expected = match expected {
        Some(expected) if lhs.unify(expected, &mut bindings) => expected,
        _ => {
            let rhs = rhs.iter().map(|s| s.category().cloned()).collect();
            return Some((lhs.clone(), rhs));
        }
    };

    let mut label = lhs.substitute(&bindings);
    for (name, value) in expected.substitute(&bindings).features {
        label.features.entry(name).or_insert(value);
    }
    let rhs = rhs
        .iter()
        .map(|s| s.category().map(|c| handed_down(&c.substitute(&bindings))))
        .collect();
    Some((label, rhs))
}

pub struct Chart<'a> {
    tokens: &'a [String],
    edges: EdgeList,
    edge_to_cpl: FnvHashMap<EdgeWrapper, IndexSet<EdgeList>>,
    indexes: RefCell<FnvHashMap<RestrictionKeys, FnvHashMap<Restrictions, EdgeList>>>,
}

impl<'a> Chart<'a> {
    pub(crate) fn new(tokens: &'a [String]) -> Self {
        Chart {
            tokens,
            edges: Default::default(),
            edge_to_cpl: Default::default(),
            indexes: Default::default(),
        }
    }

    pub fn num_leaves(&self) -> usize {
        self.tokens.len()
    }

    fn leaf(&self, index: usize) -> &str {
        &self.tokens[index]
    }

    pub(crate) fn leaves(&self) -> &'a [String] {
        self.tokens
    }

    pub(crate) fn edges(&self) -> EdgeList {
        self.edges.clone()
    }

    pub fn num_edges(&self) -> usize {
        self.edge_to_cpl.len()
    }

    /// Edges matching every restriction that is set, in insertion order.
    pub(crate) fn select(&self, restriction: Restrictions) -> Option<EdgeList> {
        if restriction.is_empty() {
            return Some(self.edges.clone());
        }

        let keys = restriction.keys();
        if !self.indexes.borrow().contains_key(&keys) {
            self.add_index(keys);
        }

        self.indexes
            .borrow()
            .get(&keys)
            .and_then(|index| index.get(&restriction))
            .cloned()
    }

    fn add_index(&self, keys: RestrictionKeys) {
        let mut indexes = self.indexes.borrow_mut();
        let index = indexes.entry(keys).or_default();

        for edge in self.edges.iter() {
            let index_key = keys.read_edge(&edge.inner);
            Rc::make_mut(index.entry(index_key).or_default()).push(edge.clone());
        }
    }

    fn register_with_indexes(&self, edge: &EdgeWrapper) {
        let mut indexes = self.indexes.borrow_mut();
        for (keys, values) in indexes.iter_mut() {
            let index_key = keys.read_edge(&edge.inner);
            Rc::make_mut(values.entry(index_key).or_default()).push(edge.clone());
        }
    }

    fn append_edge(&mut self, edge: EdgeWrapper) {
        Rc::make_mut(&mut self.edges).push(edge)
    }

    fn child_pointer_lists(&self, edge: &EdgeWrapper) -> Vec<EdgeList> {
        self.edge_to_cpl
            .get(edge)
            .map(|x| x.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn insert_with_backpointer(
        &mut self,
        new_edge: EdgeWrapper,
        previous_edge: &EdgeWrapper,
        child_edge: &EdgeWrapper,
    ) -> bool {
        let mut cpls = self.child_pointer_lists(previous_edge);
        cpls.iter_mut()
            .for_each(|v| Rc::make_mut(v).push(child_edge.clone()));
        self.insert_rc(new_edge, cpls)
    }

    pub(crate) fn insert(&mut self, edge: EdgeWrapper, new_cpls: Vec<Vec<EdgeWrapper>>) -> bool {
        self.insert_rc(edge, new_cpls.into_iter().map(Rc::new).collect())
    }

    /// Adds `edge` with the given child pointer lists. Returns true if the edge or any of the
    /// lists is new.
    pub(crate) fn insert_rc(&mut self, edge: EdgeWrapper, new_cpls: Vec<EdgeList>) -> bool {
        let mut chart_was_modified = false;
        if !self.edge_to_cpl.contains_key(&edge) {
            self.append_edge(edge.clone());
            self.register_with_indexes(&edge);
            chart_was_modified = true;
        }

        let cpls = self.edge_to_cpl.entry(edge).or_default();
        for cpl in new_cpls {
            chart_was_modified |= cpls.insert(cpl);
        }

        chart_was_modified
    }

    /// Complete edges spanning the whole input whose left-hand side unifies with `root`.
    fn root_edges(&self, root: &Category) -> Vec<EdgeWrapper> {
        let edges = match self.select(
            Restrictions::default()
                .start(0)
                .end(self.num_leaves())
                .lhs(SymbolKey::NonTerminal(root.name.clone()))
                .complete(true),
        ) {
            None => return vec![],
            Some(e) => e,
        };
        let root = root.rename_variables(&|var| Some(format!("{}root", var)));
        edges
            .iter()
            .filter(|edge| {
                edge.lhs()
                    .category()
                    .map_or(false, |lhs| root.unify(lhs, &mut Bindings::default()))
            })
            .cloned()
            .collect()
    }

    pub fn parses(&self, root: &Category) -> Vec<Tree> {
        let expected = handed_down(root);
        let mut memo = HashMap::new();
        let mut trees = Vec::new();
        for edge in self.root_edges(root) {
            trees.extend(self.tree_helper(&edge, Some(&expected), &mut memo, &mut HashSet::new()));
        }
        trees
    }

    pub(crate) fn trees(&self, edge: &EdgeWrapper) -> Vec<Tree> {
        self.tree_helper(edge, None, &mut HashMap::new(), &mut HashSet::new())
    }

    /// Trees for `edge`. `expected` is the parent's view of the edge's category: features the
    /// parent rule bound are carried down into the labels of this subtree.
    fn tree_helper(
        &self,
        edge: &EdgeWrapper,
        expected: Option<&Category>,
        memo: &mut TreeMemo,
        in_progress: &mut HashSet<EdgeWrapper>,
    ) -> Vec<Tree> {
        if !edge.is_complete() {
            return Vec::new();
        }

        if edge.is_leafedge() {
            return vec![Tree::from_terminal(self.leaf(edge.start()).to_string())];
        }

        let key = (edge.clone(), expected.cloned());
        if let Some(trees) = memo.get(&key) {
            return trees.clone();
        }

        // Guards against unary cycles.
        if !in_progress.insert(edge.clone()) {
            return Vec::new();
        }

        let (label, rhs) = match refine(edge, expected) {
            Some(refined) => refined,
            None => {
                in_progress.remove(edge);
                return Vec::new();
            }
        };
        let mut trees = Vec::new();
        for cpl in self.child_pointer_lists(edge) {
            let child_choices: Vec<_> = cpl
                .iter()
                .zip(rhs.iter())
                .map(|(cp, expected)| self.tree_helper(cp, expected.as_ref(), memo, in_progress))
                .collect();
            let child_refs: Vec<_> = child_choices.iter().map(|x| x.as_slice()).collect();
            for children in cartesian_product(&child_refs) {
                trees.push(Tree::from_category(label.clone(), children));
            }
        }

        in_progress.remove(edge);
        memo.insert(key, trees.clone());
        trees
    }

    fn default_width(&self) -> usize {
        let widest = self
            .tokens
            .iter()
            .map(|t| UnicodeWidthStr::width(t.as_str()))
            .max()
            .unwrap_or(0);
        (50 / (self.num_leaves() + 1)).max(widest + 1).max(2)
    }

    /// One line of the chart diagram, e.g. `|[-----]     .| [0:1] PropN[...] -> 'Angus' *`.
    pub fn pretty_format_edge(&self, edge: &EdgeWrapper, width: Option<usize>) -> String {
        let width = width.unwrap_or_else(|| self.default_width()).max(2);

        let (start, end) = (edge.start(), edge.end());

        let mut output = format!("|{}", format!(".{}", " ".repeat(width - 1)).repeat(start));
        if start == end {
            if edge.is_complete() {
                output.push('#');
            } else {
                output.push('>');
            }
        } else if edge.is_complete() && start == 0 && end == self.num_leaves() {
            output.push_str(&format!(
                "[{}]",
                "=".repeat(width * (end - start - 1) + (width - 1))
            ));
        } else if edge.is_complete() {
            output.push_str(&format!(
                "[{}]",
                "-".repeat(width * (end - start - 1) + (width - 1))
            ));
        } else {
            output.push_str(&format!(
                "[{}>",
                "-".repeat(width * (end - start - 1) + (width - 1))
            ));
        }
        output += &format!("{}.", " ".repeat(width - 1)).repeat(self.num_leaves() - end);
        output.push_str("| ");
        output.push_str(&edge.to_string());

        output
    }

    /// The header line naming each token above its column.
    pub fn pretty_format_leaves(&self, width: Option<usize>) -> String {
        let width = width.unwrap_or_else(|| self.default_width()).max(2);
        let mut output = String::from("|");
        for token in self.tokens {
            let shown: String = token.chars().take(width - 1).collect();
            let pad = width.saturating_sub(UnicodeWidthStr::width(shown.as_str()) + 1);
            output.push_str(&shown);
            output.push_str(&" ".repeat(pad));
            output.push('.');
        }
        output.push('|');
        output
    }
}

pub fn partial_cartesian<T: Clone>(a: Vec<Vec<T>>, b: &[T]) -> Vec<Vec<T>> {
    a.into_iter()
        .flat_map(|xs| {
            b.iter()
                .cloned()
                .map(|y| {
                    let mut vec = xs.clone();
                    vec.push(y);
                    vec
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn cartesian_product<T: Clone>(lists: &[&[T]]) -> Vec<Vec<T>> {
    match lists.split_first() {
        Some((first, rest)) => {
            let init: Vec<Vec<T>> = first.iter().cloned().map(|n| vec![n]).collect();

            rest.iter()
                .cloned()
                .fold(init, |vec, list| partial_cartesian(vec, list))
        }
        None => {
            vec![vec![]]
        }
    }
}
