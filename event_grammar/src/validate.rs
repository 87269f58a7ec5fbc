use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::{Display, Formatter};

use chartparse::{Category, FeatureGrammar, FeatureKind, FeatureValue, Production, Symbol};
use itertools::Itertools;
use logic::Expr;
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Grammar line of the offending production, or 0 for problems with the grammar as a whole.
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    fn error<S: Into<String>>(line: usize, message: S) -> Self {
        Diagnostic {
            severity: Severity::Error,
            line,
            message: message.into(),
        }
    }

    fn warning<S: Into<String>>(line: usize, message: S) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            line,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.severity, self.message)
    }
}

/// The features a grammar may use and the kind of value each holds.
#[derive(Clone, Debug, Default)]
pub struct FeatureSchema {
    kinds: BTreeMap<String, FeatureKind>,
    strict: bool,
}

impl FeatureSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// The features of the embedded event grammar.
    pub fn event_grammar() -> Self {
        FeatureSchema::new()
            .with("loc", FeatureKind::Bool)
            .with("to", FeatureKind::Bool)
            .with("num", FeatureKind::Atom)
            .with("tns", FeatureKind::Atom)
            .with("sem", FeatureKind::Sem)
    }

    pub fn with<S: Into<String>>(mut self, feature: S, kind: FeatureKind) -> Self {
        self.kinds.insert(feature.into(), kind);
        self
    }

    /// In strict mode features outside the schema are errors rather than warnings.
    pub fn strict(self, strict: bool) -> Self {
        FeatureSchema { strict, ..self }
    }

    pub fn kind(&self, feature: &str) -> Option<FeatureKind> {
        self.kinds.get(feature).copied()
    }
}

fn categories(production: &Production) -> impl Iterator<Item = &Category> {
    std::iter::once(&production.lhs).chain(production.rhs.iter().filter_map(Symbol::category))
}

fn daughters(production: &Production) -> impl Iterator<Item = &Category> {
    production.rhs.iter().filter_map(Symbol::category)
}

/// The variables a left-hand `sem` draws on: a plain `?var`, or the placeholders of a template.
fn sem_variables(category: &Category) -> Vec<String> {
    match category.sem_feature() {
        Some(FeatureValue::Var(v)) => vec![v.clone()],
        Some(FeatureValue::Sem(e)) => e.feature_variables(),
        _ => vec![],
    }
}

fn check_sem_bindings(production: &Production, out: &mut Vec<Diagnostic>) {
    let lhs = &production.lhs;
    for var in sem_variables(lhs) {
        let binders = daughters(production)
            .filter(|d| matches!(d.sem_feature(), Some(FeatureValue::Var(v)) if *v == var))
            .count();
        match binders {
            0 => out.push(Diagnostic::error(
                production.line,
                format!(
                    "?{} in the semantics of {} is not the semantics of any daughter",
                    var, lhs.name
                ),
            )),
            1 => {}
            n => out.push(Diagnostic::error(
                production.line,
                format!(
                    "?{} in the semantics of {} is bound by {} daughters",
                    var, lhs.name, n
                ),
            )),
        }
    }
}

/// Lexical categories are compared per subcategory: entries with different boolean flags
/// (such as `P[+to]` and `P[-to]`) may take different numbers of arguments.
fn subcategory(category: &Category) -> String {
    let flags = category
        .features
        .iter()
        .filter_map(|(name, value)| match value {
            FeatureValue::Bool(b) => Some(format!("{}{}", if *b { '+' } else { '-' }, name)),
            _ => None,
        })
        .join(",");
    if flags.is_empty() {
        category.name.clone()
    } else {
        format!("{}[{}]", category.name, flags)
    }
}

struct LexicalEntry<'a> {
    word: &'a str,
    line: usize,
    arity: usize,
}

/// Whether a daughter can be built by a production with left-hand side `lhs`: the names agree and
/// no feature has differing fixed values on the two sides.
fn compatible(daughter: &Category, lhs: &Category) -> bool {
    daughter.name == lhs.name
        && daughter
            .features
            .iter()
            .all(|(name, value)| match (value, lhs.get(name)) {
                (FeatureValue::Atom(_), Some(other @ FeatureValue::Atom(_)))
                | (FeatureValue::Bool(_), Some(other @ FeatureValue::Bool(_))) => value == other,
                _ => true,
            })
}

/// Number of arguments `mother` applies the semantics of `daughter` to, when the semantics of
/// `mother` is itself applied to `mother_applied` arguments.
fn passed_to(mother: &Production, daughter: &Category, mother_applied: usize) -> usize {
    let var = match daughter.sem_feature() {
        Some(FeatureValue::Var(v)) => v,
        _ => return 0,
    };
    match mother.lhs.sem_feature() {
        Some(FeatureValue::Var(v)) if v == var => mother_applied,
        Some(FeatureValue::Sem(template)) => {
            let applied = template.placeholder_application_arity(var);
            match template.uncurry() {
                (Expr::FeatVar(head), args) if head == var => {
                    applied.max(args.len() + mother_applied)
                }
                _ => applied,
            }
        }
        _ => 0,
    }
}

/// How many arguments phrase rules apply the semantics built by each production to. A daughter
/// heading its mother's semantics also receives the mother's arguments, so the counts are
/// propagated until they settle.
fn applied_arities(grammar: &FeatureGrammar) -> Vec<usize> {
    let productions = grammar.productions();
    let mut applied = vec![0; productions.len()];
    // Recursive rules can grow a count forever; stop once every production had its turn.
    for _ in 0..=productions.len() {
        let mut changed = false;
        for (i, production) in productions.iter().enumerate() {
            let lhs = &production.lhs;
            let needed = productions
                .iter()
                .zip(&applied)
                .flat_map(move |(mother, &mother_applied)| {
                    daughters(mother)
                        .filter(move |d| compatible(d, lhs))
                        .map(move |d| passed_to(mother, d, mother_applied))
                })
                .max()
                .unwrap_or(0);
            if needed != applied[i] {
                applied[i] = needed;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    applied
}

fn check_lexicon(grammar: &FeatureGrammar, out: &mut Vec<Diagnostic>) {
    let applied = applied_arities(grammar);

    let mut groups: BTreeMap<String, Vec<LexicalEntry>> = BTreeMap::new();
    for (production, &required) in grammar.productions().iter().zip(&applied) {
        let word = match production.rhs.as_slice() {
            [Symbol::Terminal(word)] => word.as_str(),
            _ => continue,
        };
        let sem = match production.lhs.sem() {
            Some(sem) if sem.feature_variables().is_empty() => sem,
            _ => {
                out.push(Diagnostic::error(
                    production.line,
                    format!(
                        "lexical entry {} -> '{}' has no concrete semantics",
                        production.lhs.name, word
                    ),
                ));
                continue;
            }
        };

        let arity = sem.lambda_arity();
        if arity < required {
            out.push(Diagnostic::error(
                production.line,
                format!(
                    "'{}' takes {} arguments but phrase rules apply {} semantics to {}",
                    word, arity, production.lhs.name, required
                ),
            ));
        }
        groups
            .entry(subcategory(&production.lhs))
            .or_default()
            .push(LexicalEntry {
                word,
                line: production.line,
                arity,
            });
    }

    for (category, entries) in groups {
        let counts = entries.iter().map(|e| e.arity).counts();
        // Most common arity, earliest entry winning ties.
        let usual = match entries.iter().max_by_key(|e| {
            (counts[&e.arity], std::cmp::Reverse(e.line))
        }) {
            Some(entry) => entry.arity,
            None => continue,
        };
        for entry in entries.iter().filter(|e| e.arity != usual) {
            out.push(Diagnostic::error(
                entry.line,
                format!(
                    "'{}' takes {} arguments but other {} entries take {}",
                    entry.word, entry.arity, category, usual
                ),
            ));
        }
    }
}

fn check_feature_kinds(grammar: &FeatureGrammar, out: &mut Vec<Diagnostic>) {
    let mut kinds: BTreeMap<&str, Vec<(FeatureKind, usize)>> = BTreeMap::new();
    for production in grammar.productions() {
        for category in categories(production) {
            for (name, value) in &category.features {
                if let Some(kind) = value.kind() {
                    let seen = kinds.entry(name.as_str()).or_default();
                    if !seen.iter().any(|(k, _)| *k == kind) {
                        seen.push((kind, production.line));
                    }
                }
            }
        }
    }

    for (name, seen) in kinds {
        if let [(first, first_line), rest @ ..] = seen.as_slice() {
            for (kind, line) in rest {
                out.push(Diagnostic::error(
                    *line,
                    format!(
                        "feature '{}' holds {} values here but {} values on line {}",
                        name, kind, first, first_line
                    ),
                ));
            }
        }
    }
}

fn check_declared_features(grammar: &FeatureGrammar, out: &mut Vec<Diagnostic>) {
    let mut declared: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for production in grammar.productions() {
        declared
            .entry(production.lhs.name.as_str())
            .or_default()
            .extend(production.lhs.features.keys().map(String::as_str));
    }

    for production in grammar.productions() {
        for daughter in daughters(production) {
            let known = match declared.get(daughter.name.as_str()) {
                Some(known) => known,
                None => {
                    out.push(Diagnostic::error(
                        production.line,
                        format!("no production has {} on its left-hand side", daughter.name),
                    ));
                    continue;
                }
            };
            for feature in daughter.features.keys() {
                if !known.contains(feature.as_str()) {
                    out.push(Diagnostic::warning(
                        production.line,
                        format!(
                            "{} is constrained on '{}', which no {} production specifies",
                            daughter.name, feature, daughter.name
                        ),
                    ));
                }
            }
        }
    }
}

fn check_schema(grammar: &FeatureGrammar, schema: &FeatureSchema, out: &mut Vec<Diagnostic>) {
    let mut reported: HashSet<(&str, Option<FeatureKind>)> = HashSet::new();
    for production in grammar.productions() {
        for category in categories(production) {
            for (name, value) in &category.features {
                match schema.kind(name) {
                    None => {
                        if reported.insert((name.as_str(), None)) {
                            let message = format!("feature '{}' is not in the schema", name);
                            out.push(if schema.strict {
                                Diagnostic::error(production.line, message)
                            } else {
                                Diagnostic::warning(production.line, message)
                            });
                        }
                    }
                    Some(expected) => match value.kind() {
                        Some(kind) if kind != expected => {
                            if reported.insert((name.as_str(), Some(kind))) {
                                out.push(Diagnostic::error(
                                    production.line,
                                    format!(
                                        "feature '{}' should hold {} values, not {} values",
                                        name, expected, kind
                                    ),
                                ));
                            }
                        }
                        _ => {}
                    },
                }
            }
        }
    }
}

/// Checks that `grammar` composes semantics soundly.
///
/// Every variable in a left-hand `sem` must be the `sem` of exactly one daughter, lexical
/// entries must carry concrete semantics whose arity fits the phrase rules, and every feature
/// must hold one kind of value throughout. With a schema, features are also checked against it.
/// Diagnostics are ordered by line.
pub fn validate(grammar: &FeatureGrammar, schema: Option<&FeatureSchema>) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    if grammar.productions_with_lhs(&grammar.start().name).is_empty() {
        out.push(Diagnostic::error(
            0,
            format!("no production has the start category {} on its left-hand side", grammar.start().name),
        ));
    }

    for production in grammar.productions() {
        check_sem_bindings(production, &mut out);
    }
    check_lexicon(grammar, &mut out);
    check_feature_kinds(grammar, &mut out);
    check_declared_features(grammar, &mut out);
    if let Some(schema) = schema {
        check_schema(grammar, schema, &mut out);
    }

    out.sort_by_key(|d| (d.line, std::cmp::Reverse(d.severity)));
    log::debug!(
        "validation found {} errors and {} warnings",
        out.iter().filter(|d| d.is_error()).count(),
        out.iter().filter(|d| !d.is_error()).count()
    );
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn check(text: &str) -> Vec<Diagnostic> {
        validate(&text.parse().unwrap(), None)
    }

    fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
        diagnostics.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_embedded_grammar_is_clean() {
        let grammar = crate::grammar().unwrap();
        let schema = FeatureSchema::event_grammar().strict(true);
        assert_eq!(messages(&validate(grammar, Some(&schema))), Vec::<String>::new());
    }

    #[test]
    fn test_unbound_and_ambiguous_sem() {
        let diagnostics = check(
            r"S[sem=<?subj(?vp)>] -> NP[sem=?subj] VP[sem=?subj]
NP[sem=<\e R.R(e,angus)>] -> 'Angus'
VP[sem=<\e x.walk(e,x)>] -> 'walks'",
        );
        assert_eq!(
            messages(&diagnostics),
            vec![
                "line 1: error: ?subj in the semantics of S is bound by 2 daughters",
                "line 1: error: ?vp in the semantics of S is not the semantics of any daughter",
            ]
        );
    }

    #[test]
    fn test_lexical_semantics() {
        let diagnostics = check(
            r"S[sem=<?np(?vp)>] -> NP[sem=?np] VP[sem=?vp]
NP[sem=<\P.P(angus)>] -> 'Angus'
NP[sem=?x] -> 'Cyril'
NP[sem=<pat>] -> 'Pat'
VP[sem=<\x.walk(x)>] -> 'walks'",
        );
        assert_eq!(
            messages(&diagnostics),
            vec![
                "line 3: error: ?x in the semantics of NP is not the semantics of any daughter",
                "line 3: error: lexical entry NP -> 'Cyril' has no concrete semantics",
                "line 4: error: 'Pat' takes 0 arguments but phrase rules apply NP semantics to 1",
                "line 4: error: 'Pat' takes 0 arguments but other NP entries take 1",
            ]
        );
    }

    #[test]
    fn test_subcategories_may_differ() {
        let diagnostics = check(
            r"PP[sem=<?p(?np)>] -> P[sem=?p] NP[sem=?np]
P[+to,sem=<\X.X>] -> 'to'
P[-to,sem=<\X P e x.(P(e,x) & X(e,\e1 y.with(e1,y)))>] -> 'with'
NP[sem=<\e R.R(e,pat)>] -> 'Pat'",
        );
        assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    }

    #[test]
    fn test_requirements_propagate_to_heads() {
        let diagnostics = check(
            r"S[sem=<exists e.?subj(e,?vp)>] -> NP[sem=?subj] VP[sem=?vp]
NP[sem=<?det(?nom)>] -> Det[sem=?det] N[sem=?nom]
Det[sem=<\P R.all x.(P(x) -> R(x))>] -> 'every'
Det[sem=<\P R.exists x.(P(x) & R(x))>] -> 'a'
N[sem=<boy>] -> 'boy'
VP[sem=<\e x.walk(e,x)>] -> 'walks'",
        );
        assert_eq!(
            messages(&diagnostics),
            vec![
                "line 3: error: 'every' takes 2 arguments but phrase rules apply Det semantics to 3",
                "line 4: error: 'a' takes 2 arguments but phrase rules apply Det semantics to 3",
            ]
        );

        let fixed = check(
            r"S[sem=<exists e.?subj(e,?vp)>] -> NP[sem=?subj] VP[sem=?vp]
NP[sem=<?det(?nom)>] -> Det[sem=?det] N[sem=?nom]
Det[sem=<\P e R.all x.(P(x) -> R(e,x))>] -> 'every'
N[sem=<boy>] -> 'boy'
VP[sem=<\e x.walk(e,x)>] -> 'walks'",
        );
        assert!(fixed.is_empty(), "{:?}", messages(&fixed));
    }

    #[test]
    fn test_requirements_follow_subcategories() {
        let diagnostics = check(
            r"PP[+loc,sem=<?p(?np,here)>] -> P[+loc,sem=?p] NP[sem=?np]
PP[-loc,sem=<?p(?np)>] -> P[-loc,sem=?p] NP[sem=?np]
P[+loc,sem=<\X y.X(y)>] -> 'in'
P[-loc,sem=<\X.X>] -> 'to'
NP[sem=<pat>] -> 'Pat'",
        );
        assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    }

    #[test]
    fn test_feature_kinds() {
        let diagnostics = check(
            r"S -> NP[+num] VP[num=sg]
NP[num=sg,sem=<a>] -> 'a'
VP[num=?n,sem=<\x.b(x)>] -> 'b'",
        );
        assert_eq!(
            messages(&diagnostics),
            vec!["line 1: error: feature 'num' holds atom values here but boolean values on line 1"]
        );
    }

    #[test]
    fn test_undeclared_features() {
        let diagnostics = check(
            r"S -> NP[case=nom] VP
NP[sem=<a>] -> 'a'
VP[sem=<b>] -> 'b'
S -> Adv",
        );
        assert_eq!(
            messages(&diagnostics),
            vec![
                "line 1: warning: NP is constrained on 'case', which no NP production specifies",
                "line 4: error: no production has Adv on its left-hand side",
            ]
        );
    }

    #[test]
    fn test_schema() {
        let grammar: FeatureGrammar = r"S -> NP[case=nom,+num]
NP[case=nom,num=sg,sem=<a>] -> 'a'"
            .parse()
            .unwrap();
        let schema = FeatureSchema::new()
            .with("num", FeatureKind::Atom)
            .with("sem", FeatureKind::Sem);

        let permissive = validate(&grammar, Some(&schema));
        assert_eq!(
            messages(&permissive),
            vec![
                "line 1: error: feature 'num' should hold atom values, not boolean values",
                "line 1: warning: feature 'case' is not in the schema",
                "line 2: error: feature 'num' holds atom values here but boolean values on line 1",
            ]
        );

        let strict = validate(&grammar, Some(&schema.strict(true)));
        assert!(strict
            .iter()
            .any(|d| d.is_error() && d.message == "feature 'case' is not in the schema"));
    }
}
