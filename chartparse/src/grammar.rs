use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use fnv::FnvHashMap;

use crate::error::{GrammarError, ParseError};
use crate::featstruct::{Category, FeatureValue};
use crate::production::{Production, Symbol, SymbolKey};

type ReadResult<'a, T> = Result<(T, &'a str), String>;

/// The first character of `s` and everything after it.
fn first_char(s: &str) -> Option<(char, &str)> {
    let c = s.chars().next()?;
    Some((c, &s[c.len_utf8()..]))
}

#[derive(Clone, Debug)]
pub struct FeatureGrammar {
    start: Category,
    productions: Vec<Arc<Production>>,
    lhs_index: FnvHashMap<String, Vec<Arc<Production>>>,
    rhs_index: FnvHashMap<SymbolKey, Vec<Arc<Production>>>,
    empty_productions: Vec<Arc<Production>>,
    lexical_index: FnvHashMap<String, Vec<Arc<Production>>>,
}

impl FeatureGrammar {
    pub fn new(start: Category, productions: Vec<Production>) -> Result<Self, GrammarError> {
        if productions.is_empty() {
            return Err(GrammarError::Empty);
        }

        let productions: Vec<Arc<Production>> = productions.into_iter().map(Arc::new).collect();
        let mut lhs_index: FnvHashMap<String, Vec<Arc<Production>>> = FnvHashMap::default();
        let mut rhs_index: FnvHashMap<SymbolKey, Vec<Arc<Production>>> = FnvHashMap::default();
        let mut lexical_index: FnvHashMap<String, Vec<Arc<Production>>> = FnvHashMap::default();
        let mut empty_productions = Vec::new();

        for prod in productions.iter() {
            lhs_index
                .entry(prod.lhs.name.clone())
                .or_default()
                .push(prod.clone());

            match prod.rhs.first() {
                Some(first) => rhs_index.entry(first.key()).or_default().push(prod.clone()),
                None => empty_productions.push(prod.clone()),
            }

            let words: BTreeSet<&str> = prod.rhs.iter().filter_map(Symbol::terminal).collect();
            for word in words {
                lexical_index
                    .entry(word.to_string())
                    .or_default()
                    .push(prod.clone());
            }
        }

        log::debug!(
            "read grammar with start {}: {} productions ({} lexical, {} empty), {} categories, {} words",
            start,
            productions.len(),
            productions.iter().filter(|p| p.is_lexical()).count(),
            empty_productions.len(),
            lhs_index.len(),
            lexical_index.len(),
        );

        Ok(FeatureGrammar {
            start,
            productions,
            lhs_index,
            rhs_index,
            empty_productions,
            lexical_index,
        })
    }

    pub fn start(&self) -> &Category {
        &self.start
    }

    pub fn productions(&self) -> &[Arc<Production>] {
        &self.productions
    }

    pub fn productions_with_lhs(&self, name: &str) -> &[Arc<Production>] {
        self.lhs_index.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Productions whose right-hand side starts with a symbol of the given key.
    pub fn productions_with_first(&self, key: &SymbolKey) -> &[Arc<Production>] {
        self.rhs_index.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn empty_productions(&self) -> &[Arc<Production>] {
        &self.empty_productions
    }

    pub fn lexical_productions(&self, word: &str) -> &[Arc<Production>] {
        self.lexical_index.get(word).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fails with every token, in order and without repeats, that no production mentions.
    pub fn check_coverage(&self, tokens: &[String]) -> Result<(), ParseError> {
        let mut missing: Vec<String> = Vec::new();
        for token in tokens {
            if !self.lexical_index.contains_key(token) && !missing.contains(token) {
                missing.push(token.clone());
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ParseError::Coverage(missing))
        }
    }
}

impl FromStr for FeatureGrammar {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        read_grammar(s)
    }
}

impl Display for FeatureGrammar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "% start {}", self.start)?;
        for production in &self.productions {
            writeln!(f, "{}", production)?;
        }
        Ok(())
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Reads a category name, returning the name and the rest of the string.
fn standard_nonterm_parser(s: &str) -> ReadResult<String> {
    let mut index = 0;
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '/' || c.is_alphanumeric() => index += c.len_utf8(),
        Some(c) => return Err(format!("unexpected '{}' where a category was expected", c)),
        None => return Err("expected a category, found end of line".to_string()),
    }

    for c in chars {
        match c {
            '/' | '^' | '_' => index += c.len_utf8(),
            // A dash only belongs to the name if it does not start an arrow.
            '-' if !s[index..].starts_with("->") => index += c.len_utf8(),
            x if x.is_alphanumeric() => index += c.len_utf8(),
            _ => break,
        }
    }

    let (name, rest) = s.split_at(index);
    Ok((name.to_string(), rest))
}

/// Reads a feature or atom name made of letters, digits and underscores.
fn read_name(s: &str) -> ReadResult<String> {
    let end = s
        .char_indices()
        .find(|(_, c)| !is_name_char(*c))
        .map(|(i, _)| i)
        .unwrap_or_else(|| s.len());
    if end == 0 {
        return match s.chars().next() {
            Some(c) => Err(format!("unexpected '{}' where a name was expected", c)),
            None => Err("expected a name, found end of line".to_string()),
        };
    }
    let (name, rest) = s.split_at(end);
    Ok((name.to_string(), rest))
}

/// Reads the body of a `<...>` value. `s` starts just after the opening bracket. The closing
/// bracket is the first `>` that is not part of `->` or `<->`.
fn read_sem(s: &str) -> ReadResult<FeatureValue> {
    let mut previous = None;
    let close = s.char_indices().find(|(_, c)| {
        let found = *c == '>' && previous != Some('-');
        previous = Some(*c);
        found
    });
    let (body, rest) = match close {
        Some((i, _)) => (&s[..i], &s[i + 1..]),
        None => return Err("unterminated semantic value, expected '>'".to_string()),
    };

    let body = body.trim();
    if let Some(var) = body.strip_prefix('?') {
        if !var.is_empty() && var.chars().all(is_name_char) {
            return Ok((FeatureValue::Var(var.to_string()), rest));
        }
    }

    let expr = logic::parse(body).map_err(|e| format!("in semantic value <{}>: {}", body, e))?;
    Ok((FeatureValue::Sem(expr), rest))
}

fn read_quoted(s: &str) -> ReadResult<String> {
    let (quote, line) = first_char(s)
        .ok_or_else(|| "expected a quoted string, found end of line".to_string())?;

    if quote != '\'' && quote != '"' {
        return Err("quoted string did not start with a quote".to_string());
    }

    match line.split_once(quote) {
        Some((in_quotes, rest)) => Ok((in_quotes.to_string(), rest)),
        None => Err("no terminating quote found".to_string()),
    }
}

fn read_value(s: &str) -> ReadResult<FeatureValue> {
    match first_char(s) {
        Some(('?', rest)) => {
            let (name, rest) = read_name(rest)?;
            Ok((FeatureValue::Var(name), rest))
        }
        Some(('<', rest)) => read_sem(rest),
        Some(('\'', _)) | Some(('"', _)) => {
            let (atom, rest) = read_quoted(s)?;
            Ok((FeatureValue::Atom(atom), rest))
        }
        Some(_) => {
            let (atom, rest) = read_name(s)?;
            Ok((FeatureValue::Atom(atom), rest))
        }
        None => Err("expected a feature value, found end of line".to_string()),
    }
}

/// Reads `[f=v,+g,-h]`. `s` starts just after the opening bracket.
fn read_features<'a>(mut s: &'a str, category: &mut Category) -> Result<&'a str, String> {
    loop {
        s = s.trim_start();
        if let Some(rest) = s.strip_prefix(']') {
            return Ok(rest);
        }

        let (name, value, rest) = match first_char(s) {
            Some(('+', rest)) | Some(('-', rest)) => {
                let (name, rest) = read_name(rest)?;
                (name, FeatureValue::Bool(s.starts_with('+')), rest)
            }
            _ => {
                let (name, rest) = read_name(s)?;
                let rest = rest
                    .trim_start()
                    .strip_prefix('=')
                    .ok_or_else(|| format!("expected '=' after feature '{}'", name))?;
                let (value, rest) = read_value(rest.trim_start())?;
                (name, value, rest)
            }
        };

        if category.features.insert(name.clone(), value).is_some() {
            return Err(format!(
                "feature '{}' specified twice on {}",
                name, category.name
            ));
        }

        s = rest.trim_start();
        match first_char(s) {
            Some((',', rest)) => s = rest,
            Some((']', _)) => {}
            Some((c, _)) => return Err(format!("expected ',' or ']' but found '{}'", c)),
            None => return Err("unterminated feature list, expected ']'".to_string()),
        }
    }
}

/// Reads a category such as `NP[num=?n,sem=<?det(?nom)>]`.
pub fn read_category(s: &str) -> ReadResult<Category> {
    let (name, rest) = standard_nonterm_parser(s)?;
    let mut category = Category::new(name);
    match rest.strip_prefix('[') {
        Some(features) => {
            let rest = read_features(features, &mut category)?;
            Ok((category, rest))
        }
        None => Ok((category, rest)),
    }
}

fn eat_disjunction(line: &str) -> Option<&str> {
    line.strip_prefix('|')
}

fn eat_arrow(line: &str) -> Option<&str> {
    line.strip_prefix("->")
}

/// Reads one rule line, which may hold several `|`-separated alternatives.
pub fn read_production(line: &str) -> Result<Vec<Production>, String> {
    let (lhs, mut rest) = read_category(line)?;
    rest = rest.trim_start();
    rest = eat_arrow(rest).ok_or_else(|| format!("expected '->' after {}", lhs))?;
    rest = rest.trim_start();

    let mut productions: Vec<Production> = vec![];
    let mut rhs: Vec<Symbol> = vec![];

    while let Some(c) = rest.chars().next() {
        match c {
            '\'' | '"' => {
                let (t, rest_) = read_quoted(rest)?;
                rhs.push(Symbol::Terminal(t));
                rest = rest_;
            }
            '|' => {
                rest = eat_disjunction(rest).unwrap_or(rest);
                productions.push(Production::new(lhs.clone(), std::mem::take(&mut rhs)));
            }
            _ => {
                let (nt, rest_) = read_category(rest)?;
                rhs.push(Symbol::NonTerminal(nt));
                rest = rest_;
            }
        }

        rest = rest.trim_start();
    }

    productions.push(Production::new(lhs, rhs));
    Ok(productions)
}

fn read_directive(line: &str, line_no: usize) -> Result<Category, GrammarError> {
    let directive = line.trim_start_matches('%').trim();
    let (name, rest) = directive
        .split_once(char::is_whitespace)
        .unwrap_or((directive, ""));
    match name {
        "start" => {
            let (start, rest) = read_category(rest.trim()).map_err(|msg| GrammarError::Syntax {
                line: line_no,
                msg,
            })?;
            if !rest.trim().is_empty() {
                return Err(GrammarError::Syntax {
                    line: line_no,
                    msg: format!("unexpected '{}' after start category", rest.trim()),
                });
            }
            Ok(start)
        }
        _ => Err(GrammarError::UnknownDirective {
            line: line_no,
            directive: name.to_string(),
        }),
    }
}

pub fn read_grammar(input: &str) -> Result<FeatureGrammar, GrammarError> {
    let mut start = None;
    let mut productions = Vec::new();
    let mut continued_line = String::new();
    let mut first_line = 0;

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        if continued_line.is_empty() {
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            first_line = line_no;
        }

        if let Some(head) = trimmed.strip_suffix('\\') {
            continued_line += head.trim_end();
            continued_line += " ";
            continue;
        }
        continued_line += trimmed;

        if continued_line.starts_with('%') {
            start = Some(read_directive(&continued_line, first_line)?);
        } else {
            let read = read_production(&continued_line).map_err(|msg| GrammarError::Syntax {
                line: first_line,
                msg,
            })?;
            productions.extend(read.into_iter().map(|p| p.at_line(first_line)));
        }
        continued_line.clear();
    }

    if !continued_line.is_empty() {
        return Err(GrammarError::Syntax {
            line: first_line,
            msg: "line continuation at end of input".to_string(),
        });
    }

    let start = match (start, productions.first()) {
        (Some(start), _) => start,
        (None, Some(first)) => Category::new(first.lhs.name.clone()),
        (None, None) => return Err(GrammarError::Empty),
    };
    FeatureGrammar::new(start, productions)
}

#[cfg(test)]
mod test {
    use super::*;
    use logic::Expr;

    #[test]
    fn test_standard_nonterm() {
        assert_eq!(
            standard_nonterm_parser("HELLO_WORLD -> ..."),
            Ok(("HELLO_WORLD".to_string(), " -> ..."))
        );
        assert_eq!(
            standard_nonterm_parser("S->NP"),
            Ok(("S".to_string(), "->NP"))
        );
        assert!(standard_nonterm_parser("[num=sg]").is_err());
    }

    #[test]
    fn test_read_quoted() {
        assert_eq!(
            read_quoted("\"terminal\" | NonTerminal"),
            Ok(("terminal".to_string(), " | NonTerminal"))
        );
        assert_eq!(
            read_quoted("'terminal' | NonTerminal"),
            Ok(("terminal".to_string(), " | NonTerminal"))
        );
        assert!(read_quoted("'open").is_err());
    }

    #[test]
    fn test_read_category() {
        let (cat, rest) =
            read_category("PP[+loc, -to, num=?n, tns='past', sem=<?p(?np)>] rest").unwrap();
        assert_eq!(rest, " rest");
        assert_eq!(cat.get("loc"), Some(&FeatureValue::Bool(true)));
        assert_eq!(cat.get("to"), Some(&FeatureValue::Bool(false)));
        assert_eq!(cat.get("num"), Some(&FeatureValue::Var("n".into())));
        assert_eq!(cat.get("tns"), Some(&FeatureValue::Atom("past".into())));
        assert_eq!(
            cat.sem(),
            Some(&Expr::app(Expr::feat_var("p"), [Expr::feat_var("np")]))
        );
    }

    #[test]
    fn test_sem_with_arrows() {
        let (cat, rest) =
            read_category("Det[sem=<\\P e R.all x.(P(x) -> R(e,x))>] -> 'every'").unwrap();
        assert_eq!(rest, " -> 'every'");
        assert_eq!(
            cat.sem().unwrap().to_string(),
            "\\P e R.all x.(P(x) -> R(e,x))"
        );

        let (cat, _) = read_category("X[sem=<(a <-> b)>]").unwrap();
        assert_eq!(cat.sem().unwrap().to_string(), "(a <-> b)");

        let (cat, _) = read_category("NP[sem=< ?np >]").unwrap();
        assert_eq!(cat.get("sem"), Some(&FeatureValue::Var("np".into())));
    }

    #[test]
    fn test_feature_errors() {
        assert!(read_category("NP[num=sg,num=pl]").is_err());
        assert!(read_category("NP[num]").is_err());
        assert!(read_category("NP[num=sg").is_err());
        assert!(read_category("NP[sem=<walk(e)]").is_err());
        assert!(read_category("NP[sem=<walk(e>]").is_err());
    }

    #[test]
    fn test_eat_arrow() {
        assert_eq!(eat_arrow("-> some other stuff"), Some(" some other stuff"));
        assert_eq!(eat_arrow("->"), Some(""));
        assert_eq!(eat_arrow("<-"), None);
    }

    #[test]
    fn test_read_production() {
        let line = "N[num=sg] -> 'boy' | \"girl\" | Nom[num=sg] 'dog'";
        let productions = read_production(line).unwrap();
        let lhs = Category::new("N").with_feature("num", FeatureValue::Atom("sg".into()));
        assert_eq!(
            productions,
            vec![
                Production::new(lhs.clone(), vec![Symbol::Terminal("boy".to_string())]),
                Production::new(lhs.clone(), vec![Symbol::Terminal("girl".to_string())]),
                Production::new(
                    lhs,
                    vec![
                        Symbol::NonTerminal(
                            Category::new("Nom").with_feature("num", FeatureValue::Atom("sg".into()))
                        ),
                        Symbol::Terminal("dog".to_string()),
                    ]
                ),
            ]
        );
        assert!(read_production("S NP VP").is_err());
    }

    #[test]
    fn test_read_grammar() {
        let text = "\
# a comment
% start S

S -> NP[num=?n] \\
     VP[num=?n]
NP[num=sg] -> 'Angus'
VP[num=sg] -> 'walks' | 'runs'
Empty ->
";
        let grammar: FeatureGrammar = text.parse().unwrap();
        assert_eq!(grammar.start(), &Category::new("S"));
        assert_eq!(grammar.productions().len(), 5);
        assert_eq!(grammar.productions()[0].line, 4);
        assert_eq!(grammar.productions()[1].line, 6);
        assert_eq!(grammar.productions_with_lhs("VP").len(), 2);
        assert_eq!(
            grammar
                .productions_with_first(&SymbolKey::NonTerminal("NP".into()))
                .len(),
            1
        );
        assert_eq!(grammar.lexical_productions("runs").len(), 1);
        assert_eq!(grammar.empty_productions().len(), 1);

        let tokens = vec!["Angus".to_string(), "flies".to_string(), "flies".to_string()];
        assert_eq!(
            grammar.check_coverage(&tokens),
            Err(ParseError::Coverage(vec!["flies".to_string()]))
        );
        assert_eq!(grammar.check_coverage(&tokens[..1]), Ok(()));
    }

    #[test]
    fn test_default_start_and_display() {
        let grammar: FeatureGrammar = "VP[num=sg] -> 'walks'".parse().unwrap();
        assert_eq!(grammar.start(), &Category::new("VP"));
        assert_eq!(grammar.to_string(), "% start VP\nVP[num=sg] -> 'walks'\n");
        let reread: FeatureGrammar = grammar.to_string().parse().unwrap();
        assert_eq!(reread.productions(), grammar.productions());
    }

    #[test]
    fn test_grammar_errors() {
        assert_eq!(
            "# nothing here\n".parse::<FeatureGrammar>().unwrap_err(),
            GrammarError::Empty
        );
        assert_eq!(
            "% begin S\nS -> 'a'".parse::<FeatureGrammar>().unwrap_err(),
            GrammarError::UnknownDirective {
                line: 1,
                directive: "begin".into()
            }
        );
        match "S -> 'a'\n\nS -> NP[".parse::<FeatureGrammar>() {
            Err(GrammarError::Syntax { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected a syntax error, got {:?}", other.map(|g| g.to_string())),
        }
    }
}
