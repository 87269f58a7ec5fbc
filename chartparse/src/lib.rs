pub mod chart;
pub mod chartrule;
pub mod edge;
pub mod error;
pub mod featstruct;
pub mod grammar;
pub mod production;
pub mod select;
pub mod tree;

use crate::chart::Chart;
use crate::chartrule::{
    BottomUpPredictCombineRule, ChartRule, EmptyPredictRule, LeafInitRule,
    SingleEdgeFundamentalRule,
};
pub use crate::error::{GrammarError, ParseError};
pub use crate::featstruct::{Bindings, Category, FeatureKind, FeatureValue};
pub use crate::grammar::FeatureGrammar;
pub use crate::production::{Production, Symbol, SymbolKey};
pub use crate::tree::Tree;

/// Bottom-up feature chart parser. Rules are applied over the whole chart until none of them
/// adds an edge.
pub struct ChartParser<'a> {
    grammar: &'a FeatureGrammar,
    strategy: Vec<Box<dyn ChartRule>>,
}

impl<'a> ChartParser<'a> {
    pub fn from_grammar(grammar: &'a FeatureGrammar) -> Self {
        ChartParser::from_grammar_with_strategy(
            grammar,
            vec![
                Box::new(LeafInitRule {}),
                Box::new(EmptyPredictRule {}),
                Box::new(BottomUpPredictCombineRule {}),
                Box::new(SingleEdgeFundamentalRule {}),
            ],
        )
    }

    pub fn from_grammar_with_strategy(
        grammar: &'a FeatureGrammar,
        strategy: Vec<Box<dyn ChartRule>>,
    ) -> Self {
        Self { grammar, strategy }
    }

    pub fn grammar(&self) -> &'a FeatureGrammar {
        self.grammar
    }

    pub fn chart_parse<'b>(&self, tokens: &'b [String]) -> Result<Chart<'b>, ParseError> {
        self.grammar.check_coverage(tokens)?;

        let mut chart = Chart::new(tokens);
        let trace = log::log_enabled!(log::Level::Trace);
        if trace {
            log::trace!("{}", chart.pretty_format_leaves(None));
        }

        loop {
            let mut edges_added = false;
            for rule in &self.strategy {
                let new_edges = rule.apply_everywhere(&mut chart, self.grammar);
                if trace {
                    for edge in &new_edges {
                        log::trace!("{} {}", chart.pretty_format_edge(edge, None), rule.name());
                    }
                }
                edges_added |= !new_edges.is_empty();
            }

            if !edges_added {
                break;
            }
        }

        log::debug!(
            "chart for {:?} has {} edges",
            tokens.join(" "),
            chart.num_edges()
        );
        Ok(chart)
    }

    /// Every tree spanning all of `tokens` whose root unifies with the start category.
    pub fn parse(&self, tokens: &[String]) -> Result<Vec<Tree>, ParseError> {
        let chart = self.chart_parse(tokens)?;
        Ok(chart.parses(self.grammar.start()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_parse_composes_semantics() {
        let grammar: FeatureGrammar = r"
% start S
S[sem=<?vp(?subj)>] -> NP[num=?n,sem=?subj] VP[num=?n,sem=?vp]
NP[num=sg,sem=<angus>] -> 'Angus'
VP[num=sg,sem=<\x.walk(x)>] -> 'walks'
VP[num=pl,sem=<\x.walk(x)>] -> 'walk'
"
        .parse()
        .unwrap();
        let parser = ChartParser::from_grammar(&grammar);

        let trees = parser.parse(&tokens("Angus walks")).unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].skeleton(), "(S (NP Angus) (VP walks))");
        let sem = trees[0].sem().unwrap().simplify().unwrap();
        assert_eq!(sem.to_string(), "walk(angus)");

        assert!(parser.parse(&tokens("Angus walk")).unwrap().is_empty());
    }

    #[test]
    fn test_ambiguity() {
        let grammar: FeatureGrammar = "NP -> NP NP | 'a'".parse().unwrap();
        let parser = ChartParser::from_grammar(&grammar);
        assert_eq!(parser.parse(&tokens("a")).unwrap().len(), 1);
        assert_eq!(parser.parse(&tokens("a a a")).unwrap().len(), 2);
        assert_eq!(parser.parse(&tokens("a a a a")).unwrap().len(), 5);
    }

    #[test]
    fn test_root_must_unify_with_start() {
        let grammar: FeatureGrammar = "% start S[tns=past]\n\
             S[tns=?t] -> V[tns=?t]\n\
             V[tns=past] -> 'walked'\n\
             V[tns=pres] -> 'walks'"
            .parse()
            .unwrap();
        let parser = ChartParser::from_grammar(&grammar);
        assert_eq!(parser.parse(&tokens("walked")).unwrap().len(), 1);
        assert!(parser.parse(&tokens("walks")).unwrap().is_empty());
    }

    #[test]
    fn test_labels_carry_parent_bindings() {
        let grammar: FeatureGrammar = "S -> NP[num=?n] VP[num=?n]\n\
             NP[num=sg] -> 'Angus'\n\
             VP[num=?n,tns=?t] -> IV[num=?n,tns=?t]\n\
             IV[tns=past] -> 'walked'"
            .parse()
            .unwrap();
        let parser = ChartParser::from_grammar(&grammar);
        let trees = parser.parse(&tokens("Angus walked")).unwrap();
        assert_eq!(trees.len(), 1);

        let label = |path: &[usize]| trees[0][path].label().map(|c| c.to_string());
        assert_eq!(label(&[0]), Some("NP[num=sg]".to_string()));
        assert_eq!(label(&[1]), Some("VP[num=sg,tns=past]".to_string()));
        assert_eq!(label(&[1, 0]), Some("IV[num=sg,tns=past]".to_string()));
    }

    #[test]
    fn test_empty_productions() {
        let grammar: FeatureGrammar = "S -> Gap 'x' Gap\nGap ->".parse().unwrap();
        let parser = ChartParser::from_grammar(&grammar);
        let trees = parser.parse(&tokens("x")).unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].skeleton(), "(S (Gap ) x (Gap ))");
    }

    #[test]
    fn test_coverage() {
        let grammar: FeatureGrammar = "S -> 'a'".parse().unwrap();
        let parser = ChartParser::from_grammar(&grammar);
        assert_eq!(
            parser.parse(&tokens("a b")).unwrap_err(),
            ParseError::Coverage(vec!["b".to_string()])
        );
        let tokens = tokens("a");
        let chart = parser.chart_parse(&tokens).unwrap();
        assert_eq!(chart.num_edges(), 2);
    }
}
