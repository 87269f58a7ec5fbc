use std::collections::BTreeSet;

use crate::{Expr, LogicError, VarKind};

/// Upper bound on beta-reduction steps taken by [`Expr::simplify`].
pub const DEFAULT_REDUCTION_BUDGET: usize = 10_000;

fn rebind(binder: &Expr, var: String, body: Expr) -> Expr {
    let body = Box::new(body);
    match binder {
        Expr::Exists(..) => Expr::Exists(var, body),
        Expr::All(..) => Expr::All(var, body),
        _ => Expr::Lambda(var, body),
    }
}

fn fresh_variable(kind: VarKind, avoid: &BTreeSet<String>) -> String {
    let prefix = kind.fresh_prefix();
    (1..)
        .map(|n| format!("{}{}", prefix, n))
        .find(|name| !avoid.contains(name))
        .unwrap_or_else(|| prefix.to_string())
}

impl Expr {
    /// Names occurring free. Constants count as free names.
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut free = BTreeSet::new();
        self.collect_free(&mut Vec::new(), &mut free);
        free
    }

    fn collect_free<'a>(&'a self, bound: &mut Vec<&'a str>, free: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                if !bound.contains(&name.as_str()) {
                    free.insert(name.clone());
                }
            }
            Expr::FeatVar(_) => {}
            Expr::Lambda(v, b) | Expr::Exists(v, b) | Expr::All(v, b) => {
                bound.push(v);
                b.collect_free(bound, free);
                bound.pop();
            }
            Expr::Not(b) => b.collect_free(bound, free),
            Expr::App(l, r)
            | Expr::And(l, r)
            | Expr::Or(l, r)
            | Expr::Imp(l, r)
            | Expr::Iff(l, r)
            | Expr::Eq(l, r) => {
                l.collect_free(bound, free);
                r.collect_free(bound, free);
            }
        }
    }

    /// Every name in the term, bound or free.
    pub fn names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.visit(&mut |e| match e {
            Expr::Var(n) | Expr::Lambda(n, _) | Expr::Exists(n, _) | Expr::All(n, _) => {
                names.insert(n.clone());
            }
            _ => {}
        });
        names
    }

    /// Capture-avoiding substitution of `value` for the free occurrences of `var`.
    ///
    /// A binder that would capture a free name of `value` is renamed to a fresh variable of the
    /// same kind.
    pub fn substitute(&self, var: &str, value: &Expr) -> Expr {
        self.substitute_with(var, value, &value.free_variables())
    }

    fn substitute_with(&self, var: &str, value: &Expr, value_free: &BTreeSet<String>) -> Expr {
        let sub = |e: &Expr| Box::new(e.substitute_with(var, value, value_free));
        match self {
            Expr::Var(name) if name == var => value.clone(),
            Expr::Var(_) | Expr::FeatVar(_) => self.clone(),
            Expr::Lambda(v, body) | Expr::Exists(v, body) | Expr::All(v, body) => {
                if v == var || !body.free_variables().contains(var) {
                    return self.clone();
                }
                if value_free.contains(v) {
                    let mut avoid = body.names();
                    avoid.extend(value_free.iter().cloned());
                    avoid.insert(var.to_string());
                    let fresh = fresh_variable(VarKind::of(v), &avoid);
                    let renamed = body.substitute(v, &Expr::Var(fresh.clone()));
                    rebind(self, fresh, renamed.substitute_with(var, value, value_free))
                } else {
                    rebind(self, v.clone(), body.substitute_with(var, value, value_free))
                }
            }
            Expr::App(l, r) => Expr::App(sub(l), sub(r)),
            Expr::Not(b) => Expr::Not(sub(b)),
            Expr::And(l, r) => Expr::And(sub(l), sub(r)),
            Expr::Or(l, r) => Expr::Or(sub(l), sub(r)),
            Expr::Imp(l, r) => Expr::Imp(sub(l), sub(r)),
            Expr::Iff(l, r) => Expr::Iff(sub(l), sub(r)),
            Expr::Eq(l, r) => Expr::Eq(sub(l), sub(r)),
        }
    }

    /// Performs the leftmost-outermost beta reduction, if there is a redex.
    pub fn beta_reduce_step(&self) -> Option<Expr> {
        match self {
            Expr::App(f, arg) => {
                if let Expr::Lambda(v, body) = f.as_ref() {
                    return Some(body.substitute(v, arg));
                }
                if let Some(f) = f.beta_reduce_step() {
                    return Some(Expr::App(Box::new(f), arg.clone()));
                }
                arg.beta_reduce_step()
                    .map(|arg| Expr::App(f.clone(), Box::new(arg)))
            }
            Expr::Var(_) | Expr::FeatVar(_) => None,
            Expr::Lambda(v, b) | Expr::Exists(v, b) | Expr::All(v, b) => b
                .beta_reduce_step()
                .map(|b| rebind(self, v.clone(), b)),
            Expr::Not(b) => b.beta_reduce_step().map(|b| Expr::Not(Box::new(b))),
            Expr::And(l, r)
            | Expr::Or(l, r)
            | Expr::Imp(l, r)
            | Expr::Iff(l, r)
            | Expr::Eq(l, r) => {
                let rebuild = |l: Box<Expr>, r: Box<Expr>| match self {
                    Expr::And(..) => Expr::And(l, r),
                    Expr::Or(..) => Expr::Or(l, r),
                    Expr::Imp(..) => Expr::Imp(l, r),
                    Expr::Iff(..) => Expr::Iff(l, r),
                    _ => Expr::Eq(l, r),
                };
                if let Some(l) = l.beta_reduce_step() {
                    return Some(rebuild(Box::new(l), r.clone()));
                }
                r.beta_reduce_step()
                    .map(|r| rebuild(l.clone(), Box::new(r)))
            }
        }
    }

    /// Beta-reduces to normal form.
    pub fn simplify(&self) -> Result<Expr, LogicError> {
        self.simplify_within(DEFAULT_REDUCTION_BUDGET)
    }

    pub fn simplify_within(&self, budget: usize) -> Result<Expr, LogicError> {
        let mut expr = self.clone();
        for _ in 0..budget {
            match expr.beta_reduce_step() {
                Some(next) => expr = next,
                None => return Ok(expr),
            }
        }
        if expr.beta_reduce_step().is_none() {
            return Ok(expr);
        }
        log::warn!("giving up on reducing {} after {} steps", self, budget);
        Err(LogicError::Diverged(budget))
    }

    /// Equality up to renaming of bound variables and regrouping of `&` and `|` chains.
    pub fn alpha_eq(&self, other: &Expr) -> bool {
        alpha_eq_in(self, other, &mut Vec::new(), &mut Vec::new())
    }
}

fn binding_depth(env: &[&str], name: &str) -> Option<usize> {
    env.iter().rev().position(|v| *v == name)
}

fn alpha_eq_in<'a>(
    a: &'a Expr,
    b: &'a Expr,
    env_a: &mut Vec<&'a str>,
    env_b: &mut Vec<&'a str>,
) -> bool {
    match (a, b) {
        (Expr::Var(x), Expr::Var(y)) => {
            match (binding_depth(env_a, x), binding_depth(env_b, y)) {
                (Some(i), Some(j)) => i == j,
                (None, None) => x == y,
                _ => false,
            }
        }
        (Expr::FeatVar(x), Expr::FeatVar(y)) => x == y,
        (Expr::Lambda(x, l), Expr::Lambda(y, r))
        | (Expr::Exists(x, l), Expr::Exists(y, r))
        | (Expr::All(x, l), Expr::All(y, r)) => {
            env_a.push(x);
            env_b.push(y);
            let eq = alpha_eq_in(l, r, env_a, env_b);
            env_a.pop();
            env_b.pop();
            eq
        }
        (Expr::Not(l), Expr::Not(r)) => alpha_eq_in(l, r, env_a, env_b),
        (Expr::And(..), Expr::And(..)) | (Expr::Or(..), Expr::Or(..)) => {
            let left = a.flatten_chain();
            let right = b.flatten_chain();
            left.len() == right.len()
                && left
                    .into_iter()
                    .zip(right)
                    .all(|(l, r)| alpha_eq_in(l, r, env_a, env_b))
        }
        (Expr::App(l1, r1), Expr::App(l2, r2))
        | (Expr::Imp(l1, r1), Expr::Imp(l2, r2))
        | (Expr::Iff(l1, r1), Expr::Iff(l2, r2))
        | (Expr::Eq(l1, r1), Expr::Eq(l2, r2)) => {
            alpha_eq_in(l1, l2, env_a, env_b) && alpha_eq_in(r1, r2, env_a, env_b)
        }
        _ => false,
    }
}
