use std::fmt::{Display, Formatter};
use std::ops::Index;

use itertools::Itertools;
use logic::Expr;

use crate::featstruct::Category;

#[derive(Clone, Debug, PartialEq)]
pub enum Tree {
    Terminal(String),
    Branch(Category, Vec<Tree>),
}

impl Display for Tree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Tree::Terminal(t) => f.write_str(t),
            Tree::Branch(nt, children) => {
                let next_trees = children.iter().map(|x| x.to_string()).join(" ");
                write!(f, "({} {})", nt, next_trees)
            }
        }
    }
}

impl Tree {
    pub(crate) fn from_terminal(leaf: String) -> Self {
        Tree::Terminal(leaf)
    }

    pub(crate) fn from_category(lhs: Category, children: Vec<Tree>) -> Self {
        Tree::Branch(lhs, children)
    }

    pub fn label(&self) -> Option<&Category> {
        match self {
            Tree::Terminal(_) => None,
            Tree::Branch(nt, _) => Some(nt),
        }
    }

    pub fn children(&self) -> &[Tree] {
        match self {
            Tree::Terminal(_) => &[],
            Tree::Branch(_, children) => children,
        }
    }

    /// The semantic value of the root, unreduced.
    pub fn sem(&self) -> Option<&Expr> {
        self.label().and_then(Category::sem)
    }

    pub fn leaves(&self) -> Vec<&str> {
        match self {
            Tree::Terminal(t) => vec![t.as_str()],
            Tree::Branch(_, children) => children.iter().flat_map(Tree::leaves).collect(),
        }
    }

    /// The tree with category names only, e.g. `(S (NP (PropN Angus)) (VP (IV walks)))`.
    pub fn skeleton(&self) -> String {
        match self {
            Tree::Terminal(t) => t.clone(),
            Tree::Branch(nt, children) => format!(
                "({} {})",
                nt.name,
                children.iter().map(Tree::skeleton).join(" ")
            ),
        }
    }

    /// Multi-line rendering with one node per line, children indented under their parent.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.pretty_into(0, &mut out);
        out
    }

    fn pretty_into(&self, depth: usize, out: &mut String) {
        out.push_str(&"  ".repeat(depth));
        match self {
            Tree::Terminal(t) => {
                out.push_str(t);
                out.push('\n');
            }
            Tree::Branch(nt, children) => {
                out.push_str(&nt.to_string());
                out.push('\n');
                for child in children {
                    child.pretty_into(depth + 1, out);
                }
            }
        }
    }

}

impl Index<&[usize]> for Tree {
    type Output = Tree;

    fn index(&self, index: &[usize]) -> &Self::Output {
        if index.is_empty() {
            return self;
        }

        match self {
            Tree::Terminal(_) => panic!("Invalid index {:?} for Terminal", index),
            Tree::Branch(_, branch) => branch[index[0]].index(&index[1..]),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Tree {
        Tree::from_category(
            Category::new("S"),
            vec![
                Tree::from_category(
                    Category::new("NP"),
                    vec![Tree::from_category(
                        Category::new("PropN"),
                        vec![Tree::from_terminal("Angus".into())],
                    )],
                ),
                Tree::from_category(
                    Category::new("VP"),
                    vec![Tree::from_category(
                        Category::new("IV"),
                        vec![Tree::from_terminal("walks".into())],
                    )],
                ),
            ],
        )
    }

    #[test]
    fn test_leaves_and_skeleton() {
        let tree = sample();
        assert_eq!(tree.leaves(), vec!["Angus", "walks"]);
        assert_eq!(tree.skeleton(), "(S (NP (PropN Angus)) (VP (IV walks)))");
        assert_eq!(tree.to_string(), tree.skeleton());
        assert_eq!(tree.sem(), None);
    }

    #[test]
    fn test_index() {
        let tree = sample();
        let iv = &tree[&[1, 0][..]];
        assert_eq!(iv.label().map(|c| c.name.as_str()), Some("IV"));
        assert_eq!(tree[&[1, 0, 0][..]], Tree::Terminal("walks".into()));
        assert_eq!(tree.label().map(|c| c.name.as_str()), Some("S"));
        assert_eq!(tree.children().len(), 2);
    }

    #[test]
    fn test_pretty() {
        let tree = sample();
        assert_eq!(
            tree.pretty(),
            "S\n  NP\n    PropN\n      Angus\n  VP\n    IV\n      walks\n"
        );
    }
}
