//! Lambda-calculus terms over first-order formulas, as used by the `sem` feature of a feature
//! grammar.
//!
//! Terms are written with `\x.body` binders, `exists x.body` and `all x.body` quantifiers,
//! predicate application `P(a,b)` and the connectives `-`, `&`, `|`, `->`, `<->`, `=` and `!=`.
//! Placeholders written `?name` are left for feature unification to fill in.
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use itertools::Itertools;

mod error;
mod parser;
mod reduce;

pub use error::LogicError;
pub use parser::parse;
pub use reduce::DEFAULT_REDUCTION_BUDGET;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Any name: a bound or free variable, or a constant such as `angus` or `walk`.
    Var(String),
    /// A `?name` placeholder, filled in by feature unification.
    FeatVar(String),
    App(Box<Expr>, Box<Expr>),
    Lambda(String, Box<Expr>),
    Exists(String, Box<Expr>),
    All(String, Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Imp(Box<Expr>, Box<Expr>),
    Iff(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VarKind {
    /// `e`, `e1`, `e27`, ...
    Event,
    /// A single lowercase letter other than `e`, optionally followed by digits.
    Individual,
    /// A single uppercase letter, optionally followed by digits.
    Function,
    Constant,
}

impl VarKind {
    pub fn of(name: &str) -> VarKind {
        let mut chars = name.chars();
        let first = match chars.next() {
            Some(c) => c,
            None => return VarKind::Constant,
        };
        if !chars.all(|c| c.is_ascii_digit()) {
            return VarKind::Constant;
        }
        match first {
            'e' => VarKind::Event,
            c if c.is_ascii_lowercase() => VarKind::Individual,
            c if c.is_ascii_uppercase() => VarKind::Function,
            _ => VarKind::Constant,
        }
    }

    pub(crate) fn fresh_prefix(&self) -> &'static str {
        match self {
            VarKind::Event => "e",
            VarKind::Function => "F",
            VarKind::Individual | VarKind::Constant => "z",
        }
    }
}

impl Expr {
    pub fn var<S: Into<String>>(name: S) -> Self {
        Expr::Var(name.into())
    }

    pub fn feat_var<S: Into<String>>(name: S) -> Self {
        Expr::FeatVar(name.into())
    }

    /// Applies `fun` to each of `args` in turn, so `app(P, [a, b])` is `P(a,b)`.
    pub fn app<I: IntoIterator<Item = Expr>>(fun: Expr, args: I) -> Self {
        args.into_iter()
            .fold(fun, |f, arg| Expr::App(Box::new(f), Box::new(arg)))
    }

    /// Builds `\v1 v2 ... .body`.
    pub fn lambda<S: Into<String>, I: IntoIterator<Item = S>>(vars: I, body: Expr) -> Self {
        let vars: Vec<String> = vars.into_iter().map(Into::into).collect();
        vars.into_iter()
            .rev()
            .fold(body, |body, v| Expr::Lambda(v, Box::new(body)))
    }

    pub fn is_binder(&self) -> bool {
        matches!(self, Expr::Lambda(..) | Expr::Exists(..) | Expr::All(..))
    }

    /// Splits an application into its head and arguments: `P(a,b)` gives `(P, [a, b])`.
    pub fn uncurry(&self) -> (&Expr, Vec<&Expr>) {
        let mut args = Vec::new();
        let mut head = self;
        while let Expr::App(f, a) = head {
            args.push(a.as_ref());
            head = f.as_ref();
        }
        args.reverse();
        (head, args)
    }

    /// Number of leading lambda binders.
    pub fn lambda_arity(&self) -> usize {
        let mut arity = 0;
        let mut expr = self;
        while let Expr::Lambda(_, body) = expr {
            arity += 1;
            expr = body.as_ref();
        }
        arity
    }

    /// The largest number of arguments the placeholder `?name` is applied to, or 0 if it never
    /// heads an application.
    pub fn placeholder_application_arity(&self, name: &str) -> usize {
        let mut max = 0;
        self.visit(&mut |e| {
            if let Expr::App(..) = e {
                if let (Expr::FeatVar(n), args) = e.uncurry() {
                    if n == name {
                        max = max.max(args.len());
                    }
                }
            }
        });
        max
    }

    /// Whether some application is headed by a term other than a name, such as a quantified
    /// formula. Applications left over after beta reduction have such heads.
    pub fn has_stuck_application(&self) -> bool {
        let mut stuck = false;
        self.visit(&mut |e| {
            if let Expr::App(..) = e {
                stuck |= !matches!(e.uncurry().0, Expr::Var(_) | Expr::FeatVar(_));
            }
        });
        stuck
    }

    pub(crate) fn visit<F: FnMut(&Expr)>(&self, f: &mut F) {
        f(self);
        match self {
            Expr::Var(_) | Expr::FeatVar(_) => {}
            Expr::Lambda(_, b) | Expr::Exists(_, b) | Expr::All(_, b) | Expr::Not(b) => b.visit(f),
            Expr::App(l, r)
            | Expr::And(l, r)
            | Expr::Or(l, r)
            | Expr::Imp(l, r)
            | Expr::Iff(l, r)
            | Expr::Eq(l, r) => {
                l.visit(f);
                r.visit(f);
            }
        }
    }

    /// Names of the `?name` placeholders in this term, in order of first appearance.
    pub fn feature_variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.visit(&mut |e| {
            if let Expr::FeatVar(n) = e {
                if !names.contains(n) {
                    names.push(n.clone());
                }
            }
        });
        names
    }

    /// Replaces placeholders for which `lookup` returns a term. The replacement is inserted as is;
    /// placeholders inside it are not looked up again.
    pub fn substitute_features<F: Fn(&str) -> Option<Expr>>(&self, lookup: &F) -> Expr {
        self.map_leaves(&|e| match e {
            Expr::FeatVar(n) => lookup(n),
            _ => None,
        })
    }

    /// Renames placeholders, leaving unmapped ones untouched.
    pub fn rename_features<F: Fn(&str) -> Option<String>>(&self, rename: &F) -> Expr {
        self.map_leaves(&|e| match e {
            Expr::FeatVar(n) => rename(n).map(Expr::FeatVar),
            _ => None,
        })
    }

    fn map_leaves<F: Fn(&Expr) -> Option<Expr>>(&self, f: &F) -> Expr {
        let boxed = |e: &Expr| Box::new(e.map_leaves(f));
        match self {
            Expr::Var(_) | Expr::FeatVar(_) => f(self).unwrap_or_else(|| self.clone()),
            Expr::App(l, r) => Expr::App(boxed(l), boxed(r)),
            Expr::Lambda(v, b) => Expr::Lambda(v.clone(), boxed(b)),
            Expr::Exists(v, b) => Expr::Exists(v.clone(), boxed(b)),
            Expr::All(v, b) => Expr::All(v.clone(), boxed(b)),
            Expr::Not(b) => Expr::Not(boxed(b)),
            Expr::And(l, r) => Expr::And(boxed(l), boxed(r)),
            Expr::Or(l, r) => Expr::Or(boxed(l), boxed(r)),
            Expr::Imp(l, r) => Expr::Imp(boxed(l), boxed(r)),
            Expr::Iff(l, r) => Expr::Iff(boxed(l), boxed(r)),
            Expr::Eq(l, r) => Expr::Eq(boxed(l), boxed(r)),
        }
    }

    /// Operands of a chain of `&` (or `|`) as a flat list, left to right.
    pub(crate) fn flatten_chain(&self) -> Vec<&Expr> {
        fn go<'a>(e: &'a Expr, is_and: bool, out: &mut Vec<&'a Expr>) {
            match (e, is_and) {
                (Expr::And(l, r), true) | (Expr::Or(l, r), false) => {
                    go(l, is_and, out);
                    go(r, is_and, out);
                }
                _ => out.push(e),
            }
        }
        let mut out = Vec::new();
        match self {
            Expr::And(..) => go(self, true, &mut out),
            Expr::Or(..) => go(self, false, &mut out),
            _ => out.push(self),
        }
        out
    }
}

impl FromStr for Expr {
    type Err = LogicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

struct Operand<'a>(&'a Expr);

impl Display for Operand<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // A binder as an operand would otherwise swallow whatever follows it.
        if self.0.is_binder() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Var(name) => f.write_str(name),
            Expr::FeatVar(name) => write!(f, "?{}", name),
            Expr::App(..) => {
                let (head, args) = self.uncurry();
                let args = args.iter().map(|a| a.to_string()).join(",");
                match head {
                    Expr::Var(_) | Expr::FeatVar(_) => write!(f, "{}({})", head, args),
                    _ => write!(f, "({})({})", head, args),
                }
            }
            Expr::Lambda(..) => {
                let mut vars = Vec::new();
                let mut body = self;
                while let Expr::Lambda(v, b) = body {
                    vars.push(v.as_str());
                    body = b.as_ref();
                }
                write!(f, "\\{}.{}", vars.join(" "), body)
            }
            Expr::Exists(v, body) => write!(f, "exists {}.{}", v, body),
            Expr::All(v, body) => write!(f, "all {}.{}", v, body),
            Expr::Not(e) => write!(f, "-{}", Operand(e)),
            Expr::And(..) | Expr::Or(..) => {
                let op = if matches!(self, Expr::And(..)) { " & " } else { " | " };
                let operands = self.flatten_chain();
                let last = operands.len() - 1;
                let body = operands
                    .iter()
                    .enumerate()
                    .map(|(i, e)| {
                        if i == last {
                            e.to_string()
                        } else {
                            Operand(e).to_string()
                        }
                    })
                    .join(op);
                write!(f, "({})", body)
            }
            Expr::Imp(l, r) => write!(f, "({} -> {})", Operand(l), r),
            Expr::Iff(l, r) => write!(f, "({} <-> {})", Operand(l), r),
            Expr::Eq(l, r) => write!(f, "({} = {})", Operand(l), r),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_var_kind() {
        assert_eq!(VarKind::of("e"), VarKind::Event);
        assert_eq!(VarKind::of("e12"), VarKind::Event);
        assert_eq!(VarKind::of("x"), VarKind::Individual);
        assert_eq!(VarKind::of("z3"), VarKind::Individual);
        assert_eq!(VarKind::of("R"), VarKind::Function);
        assert_eq!(VarKind::of("angus"), VarKind::Constant);
        assert_eq!(VarKind::of("x_1"), VarKind::Constant);
    }

    #[test]
    fn test_display_flattens_conjunctions() {
        let e = Expr::And(
            Box::new(Expr::app(Expr::var("girl"), [Expr::var("y")])),
            Box::new(Expr::And(
                Box::new(Expr::app(Expr::var("chase"), [Expr::var("e")])),
                Box::new(Expr::app(
                    Expr::var("agent"),
                    [Expr::var("e"), Expr::var("x")],
                )),
            )),
        );
        assert_eq!(e.to_string(), "(girl(y) & chase(e) & agent(e,x))");
    }

    #[test]
    fn test_display_lambda_and_application() {
        let e = Expr::lambda(
            ["e", "R"],
            Expr::app(Expr::var("R"), [Expr::var("e"), Expr::var("angus")]),
        );
        assert_eq!(e.to_string(), "\\e R.R(e,angus)");
        assert_eq!(e.lambda_arity(), 2);

        let applied = Expr::app(e, [Expr::var("e")]);
        assert_eq!(applied.to_string(), "(\\e R.R(e,angus))(e)");
    }

    #[test]
    fn test_placeholders() {
        let e = Expr::Exists(
            "e".into(),
            Box::new(Expr::app(
                Expr::feat_var("subj"),
                [Expr::var("e"), Expr::feat_var("vp")],
            )),
        );
        assert_eq!(e.to_string(), "exists e.?subj(e,?vp)");
        assert_eq!(e.feature_variables(), vec!["subj", "vp"]);
        assert_eq!(e.placeholder_application_arity("subj"), 2);
        assert_eq!(e.placeholder_application_arity("vp"), 0);

        let filled = e.substitute_features(&|name| match name {
            "vp" => Some(Expr::var("walk")),
            _ => None,
        });
        assert_eq!(filled.to_string(), "exists e.?subj(e,walk)");
    }

    #[test]
    fn test_stuck_application() {
        let every_boy = Expr::All(
            "x".into(),
            Box::new(Expr::app(Expr::var("boy"), [Expr::var("x")])),
        );
        assert!(!every_boy.has_stuck_application());
        let stuck = Expr::app(every_boy, [Expr::var("walk")]);
        assert!(stuck.has_stuck_application());
        let event = Expr::app(Expr::var("agent"), [Expr::var("e"), Expr::var("x")]);
        assert!(!event.has_stuck_application());
    }

    #[test]
    fn test_binder_operand_is_parenthesised() {
        let e = Expr::And(
            Box::new(Expr::Exists(
                "x".into(),
                Box::new(Expr::app(Expr::var("P"), [Expr::var("x")])),
            )),
            Box::new(Expr::var("q")),
        );
        assert_eq!(e.to_string(), "((exists x.P(x)) & q)");
    }
}
