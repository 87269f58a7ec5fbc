use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use fnv::FnvHashMap;
use itertools::Itertools;
use logic::Expr;

/// The value of a single feature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeatureValue {
    Atom(String),
    Bool(bool),
    /// A variable shared between the categories of one rule, stored without its leading `?`.
    Var(String),
    Sem(Expr),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Atom,
    Bool,
    Sem,
}

impl Display for FeatureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKind::Atom => f.write_str("atom"),
            FeatureKind::Bool => f.write_str("boolean"),
            FeatureKind::Sem => f.write_str("semantic"),
        }
    }
}

impl FeatureValue {
    /// The kind of value, or `None` for an unbound variable.
    pub fn kind(&self) -> Option<FeatureKind> {
        match self {
            FeatureValue::Atom(_) => Some(FeatureKind::Atom),
            FeatureValue::Bool(_) => Some(FeatureKind::Bool),
            FeatureValue::Sem(_) => Some(FeatureKind::Sem),
            FeatureValue::Var(_) => None,
        }
    }

    fn variables(&self) -> Vec<String> {
        match self {
            FeatureValue::Var(v) => vec![v.clone()],
            FeatureValue::Sem(e) => e.feature_variables(),
            FeatureValue::Atom(_) | FeatureValue::Bool(_) => vec![],
        }
    }

    fn rename_variables<F: Fn(&str) -> Option<String>>(&self, rename: &F) -> Self {
        match self {
            FeatureValue::Var(v) => FeatureValue::Var(rename(v).unwrap_or_else(|| v.clone())),
            FeatureValue::Sem(e) => FeatureValue::Sem(e.rename_features(rename)),
            FeatureValue::Atom(_) | FeatureValue::Bool(_) => self.clone(),
        }
    }

    /// This value as a term, for use inside a semantic value.
    fn into_expr(self) -> Expr {
        match self {
            FeatureValue::Sem(e) => e,
            FeatureValue::Var(v) => Expr::FeatVar(v),
            FeatureValue::Atom(a) => Expr::Var(a),
            FeatureValue::Bool(b) => Expr::Var(b.to_string()),
        }
    }
}

impl Display for FeatureValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureValue::Atom(a) => f.write_str(a),
            FeatureValue::Bool(b) => f.write_str(if *b { "+" } else { "-" }),
            FeatureValue::Var(v) => write!(f, "?{}", v),
            FeatureValue::Sem(e) => write!(f, "<{}>", e),
        }
    }
}

/// Variable bindings produced by unification.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    map: FnvHashMap<String, FeatureValue>,
}

impl Bindings {
    pub fn get(&self, var: &str) -> Option<&FeatureValue> {
        self.map.get(var)
    }

    /// Follows variable bindings, including `?name` placeholders inside semantic values.
    pub fn resolve(&self, value: &FeatureValue) -> FeatureValue {
        match value {
            FeatureValue::Var(v) => match self.map.get(v) {
                Some(bound) => self.resolve(bound),
                None => value.clone(),
            },
            FeatureValue::Sem(e) => FeatureValue::Sem(self.resolve_expr(e)),
            FeatureValue::Atom(_) | FeatureValue::Bool(_) => value.clone(),
        }
    }

    fn resolve_expr(&self, expr: &Expr) -> Expr {
        expr.substitute_features(&|name| {
            self.map
                .get(name)
                .map(|bound| self.resolve(bound).into_expr())
        })
    }

    fn bind(&mut self, var: &str, value: FeatureValue) -> bool {
        if self.resolve(&value).variables().iter().any(|v| v == var) {
            return false;
        }
        self.map.insert(var.to_string(), value);
        true
    }
}

fn unify_values(left: &FeatureValue, right: &FeatureValue, bindings: &mut Bindings) -> bool {
    let left = bindings.resolve(left);
    let right = bindings.resolve(right);
    match (&left, &right) {
        (FeatureValue::Var(a), FeatureValue::Var(b)) if a == b => true,
        (FeatureValue::Var(a), _) => bindings.bind(a, right.clone()),
        (_, FeatureValue::Var(b)) => bindings.bind(b, left.clone()),
        (FeatureValue::Atom(a), FeatureValue::Atom(b)) => a == b,
        (FeatureValue::Bool(a), FeatureValue::Bool(b)) => a == b,
        (FeatureValue::Sem(a), FeatureValue::Sem(b)) => a.alpha_eq(b),
        _ => false,
    }
}

/// A grammatical category: a name such as `NP` plus its features.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Category {
    pub name: String,
    pub features: BTreeMap<String, FeatureValue>,
}

impl Category {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Category {
            name: name.into(),
            features: BTreeMap::new(),
        }
    }

    pub fn with_feature<S: Into<String>>(mut self, name: S, value: FeatureValue) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    pub fn get(&self, feature: &str) -> Option<&FeatureValue> {
        self.features.get(feature)
    }

    /// The semantic value, if the `sem` feature holds a term.
    pub fn sem(&self) -> Option<&Expr> {
        self.features
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("sem"))
            .and_then(|(_, value)| match value {
                FeatureValue::Sem(e) => Some(e),
                _ => None,
            })
    }

    /// The raw `sem` feature, whatever its kind.
    pub fn sem_feature(&self) -> Option<&FeatureValue> {
        self.features
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("sem"))
            .map(|(_, value)| value)
    }

    /// Unifies with `other`, extending `bindings`. Names must match; features present on only
    /// one side never cause failure. On failure `bindings` may hold partial results and should
    /// be discarded.
    pub fn unify(&self, other: &Category, bindings: &mut Bindings) -> bool {
        if self.name != other.name {
            return false;
        }
        self.features.iter().all(|(name, left)| match other.features.get(name) {
            Some(right) => unify_values(left, right, bindings),
            None => true,
        })
    }

    pub fn substitute(&self, bindings: &Bindings) -> Category {
        Category {
            name: self.name.clone(),
            features: self
                .features
                .iter()
                .map(|(name, value)| (name.clone(), bindings.resolve(value)))
                .collect(),
        }
    }

    /// Variables in order of first appearance.
    pub fn variables(&self) -> Vec<String> {
        let mut vars: Vec<String> = Vec::new();
        for var in self.features.values().flat_map(FeatureValue::variables) {
            if !vars.contains(&var) {
                vars.push(var);
            }
        }
        vars
    }

    pub fn rename_variables<F: Fn(&str) -> Option<String>>(&self, rename: &F) -> Category {
        Category {
            name: self.name.clone(),
            features: self
                .features
                .iter()
                .map(|(name, value)| (name.clone(), value.rename_variables(rename)))
                .collect(),
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if self.features.is_empty() {
            return Ok(());
        }
        let features = self
            .features
            .iter()
            .map(|(name, value)| match value {
                FeatureValue::Bool(_) => format!("{}{}", value, name),
                _ => format!("{}={}", name, value),
            })
            .join(",");
        write!(f, "[{}]", features)
    }
}
