use crate::chart::Chart;
use crate::edge::{EdgeWrapper, LeafEdge, TreeEdge};
use crate::grammar::FeatureGrammar;
use crate::production::Symbol;
use crate::select::Restrictions;

pub trait ChartRule {
    fn num_edges(&self) -> usize;

    fn apply(
        &self,
        chart: &mut Chart<'_>,
        grammar: &FeatureGrammar,
        edges: Vec<EdgeWrapper>,
    ) -> Vec<EdgeWrapper>;

    fn apply_everywhere(&self, chart: &mut Chart<'_>, grammar: &FeatureGrammar) -> Vec<EdgeWrapper> {
        match self.num_edges() {
            0 => self.apply(chart, grammar, vec![]),
            1 => {
                let edges = chart.edges();
                let mut res = vec![];
                for e1 in edges.iter() {
                    res.extend(self.apply(chart, grammar, vec![e1.clone()]));
                }
                res
            }
            n => unimplemented!("chart rules over {} edges", n),
        }
    }

    fn name(&self) -> &'static str;

    fn box_clone(&self) -> Box<dyn ChartRule>;
}

impl Clone for Box<dyn ChartRule> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Adds one leaf edge per input token.
#[derive(Copy, Clone)]
pub struct LeafInitRule {}

impl ChartRule for LeafInitRule {
    fn num_edges(&self) -> usize {
        0
    }

    fn apply(
        &self,
        chart: &mut Chart<'_>,
        _grammar: &FeatureGrammar,
        _edges: Vec<EdgeWrapper>,
    ) -> Vec<EdgeWrapper> {
        let mut edges = vec![];
        for (i, leaf) in chart.leaves().iter().enumerate() {
            let new_edge: EdgeWrapper = LeafEdge::new(Symbol::Terminal(leaf.clone()), i).into();

            if chart.insert(new_edge.clone(), vec![]) {
                edges.push(new_edge);
            }
        }
        edges
    }

    fn name(&self) -> &'static str {
        "LeafInitRule"
    }

    fn box_clone(&self) -> Box<dyn ChartRule> {
        Box::new(*self)
    }
}

/// Moves the dot of an incomplete edge over an adjacent complete edge whose left-hand side
/// unifies with the incomplete edge's next symbol. Either edge may be the one being visited.
#[derive(Copy, Clone)]
pub struct SingleEdgeFundamentalRule {}

impl ChartRule for SingleEdgeFundamentalRule {
    fn num_edges(&self) -> usize {
        1
    }

    fn apply(
        &self,
        chart: &mut Chart<'_>,
        _grammar: &FeatureGrammar,
        mut edges: Vec<EdgeWrapper>,
    ) -> Vec<EdgeWrapper> {
        let edge = edges.remove(0);
        let mut edges = vec![];

        if !edge.is_complete() {
            let next_sym = match edge.next_sym() {
                Some(sym) => sym.key(),
                None => return edges,
            };
            let restrictions = Restrictions::default()
                .start(edge.end())
                .complete(true)
                .lhs(next_sym);
            let right_edges = match chart.select(restrictions) {
                None => return edges,
                Some(edges) => edges,
            };
            for right_edge in right_edges.iter() {
                if let Some(new_edge) = edge.combine(right_edge) {
                    if chart.insert_with_backpointer(new_edge.clone(), &edge, right_edge) {
                        edges.push(new_edge);
                    }
                }
            }
        } else {
            let restrictions = Restrictions::default()
                .end(edge.start())
                .complete(false)
                .next_sym(edge.lhs().key());
            let left_edges = match chart.select(restrictions) {
                None => return edges,
                Some(edges) => edges,
            };
            for left_edge in left_edges.iter() {
                if let Some(new_edge) = left_edge.combine(&edge) {
                    if chart.insert_with_backpointer(new_edge.clone(), left_edge, &edge) {
                        edges.push(new_edge);
                    }
                }
            }
        }

        edges
    }

    fn name(&self) -> &'static str {
        "SingleEdgeFundamentalRule"
    }

    fn box_clone(&self) -> Box<dyn ChartRule> {
        Box::new(*self)
    }
}

/// Adds a complete zero-width edge for every empty production at every position.
#[derive(Copy, Clone)]
pub struct EmptyPredictRule {}

impl ChartRule for EmptyPredictRule {
    fn num_edges(&self) -> usize {
        0
    }

    fn apply(
        &self,
        chart: &mut Chart<'_>,
        grammar: &FeatureGrammar,
        _edges: Vec<EdgeWrapper>,
    ) -> Vec<EdgeWrapper> {
        let mut edges = vec![];
        for production in grammar.empty_productions() {
            for i in 0..chart.num_leaves() + 1 {
                let new_edge: EdgeWrapper = TreeEdge::from_production(production, i).into();

                if chart.insert(new_edge.clone(), vec![vec![]]) {
                    edges.push(new_edge);
                }
            }
        }
        edges
    }

    fn name(&self) -> &'static str {
        "EmptyPredictRule"
    }

    fn box_clone(&self) -> Box<dyn ChartRule> {
        Box::new(*self)
    }
}

/// For a complete edge, starts every production whose first right-hand symbol unifies with the
/// edge's left-hand side, with the dot already past that symbol.
#[derive(Copy, Clone)]
pub struct BottomUpPredictCombineRule {}

impl ChartRule for BottomUpPredictCombineRule {
    fn num_edges(&self) -> usize {
        1
    }

    fn apply(
        &self,
        chart: &mut Chart<'_>,
        grammar: &FeatureGrammar,
        mut edges: Vec<EdgeWrapper>,
    ) -> Vec<EdgeWrapper> {
        let edge = edges.remove(0);
        if !edge.is_complete() {
            return vec![];
        }

        let mut edges = vec![];
        for production in grammar.productions_with_first(&edge.lhs().key()) {
            let predicted: EdgeWrapper = TreeEdge::from_production(production, edge.start()).into();
            let new_edge = match predicted.combine(&edge) {
                Some(new_edge) => new_edge,
                None => continue,
            };
            if chart.insert(new_edge.clone(), vec![vec![edge.clone()]]) {
                edges.push(new_edge)
            }
        }
        edges
    }

    fn name(&self) -> &'static str {
        "BottomUpPredictCombineRule"
    }

    fn box_clone(&self) -> Box<dyn ChartRule> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn grammar() -> FeatureGrammar {
        "S -> NP[num=?n] VP[num=?n]\n\
         NP[num=sg] -> 'Angus'\n\
         VP[num=sg] -> 'walks'\n\
         VP[num=pl] -> 'walk'"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_leaf_init() {
        let tokens = vec!["Angus".to_string(), "walks".to_string()];
        let mut chart = Chart::new(&tokens);
        let g = grammar();
        assert_eq!(LeafInitRule {}.apply_everywhere(&mut chart, &g).len(), 2);
        assert!(LeafInitRule {}.apply_everywhere(&mut chart, &g).is_empty());
    }

    #[test]
    fn test_predict_then_combine() {
        let tokens = vec!["Angus".to_string(), "walks".to_string()];
        let mut chart = Chart::new(&tokens);
        let g = grammar();
        LeafInitRule {}.apply_everywhere(&mut chart, &g);

        let predicted = BottomUpPredictCombineRule {}.apply_everywhere(&mut chart, &g);
        let shown: Vec<String> = predicted.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            shown,
            vec![
                "[0:1] NP[num=sg] -> 'Angus' *",
                "[1:2] VP[num=sg] -> 'walks' *",
            ]
        );

        let predicted = BottomUpPredictCombineRule {}.apply_everywhere(&mut chart, &g);
        let shown: Vec<String> = predicted.iter().map(|e| e.to_string()).collect();
        assert_eq!(shown, vec!["[0:1] S -> NP[num=sg] * VP[num=sg]"]);

        let combined = SingleEdgeFundamentalRule {}.apply_everywhere(&mut chart, &g);
        let shown: Vec<String> = combined.iter().map(|e| e.to_string()).collect();
        assert_eq!(shown, vec!["[0:2] S -> NP[num=sg] VP[num=sg] *"]);
    }

    #[test]
    fn test_agreement_blocks_combination() {
        let tokens = vec!["Angus".to_string(), "walk".to_string()];
        let mut chart = Chart::new(&tokens);
        let g = grammar();
        LeafInitRule {}.apply_everywhere(&mut chart, &g);
        BottomUpPredictCombineRule {}.apply_everywhere(&mut chart, &g);
        BottomUpPredictCombineRule {}.apply_everywhere(&mut chart, &g);
        assert!(SingleEdgeFundamentalRule {}
            .apply_everywhere(&mut chart, &g)
            .is_empty());
    }

    #[test]
    fn test_empty_predict() {
        let g: FeatureGrammar = "S -> Gap 'x'\nGap ->".parse().unwrap();
        let tokens = vec!["x".to_string()];
        let mut chart = Chart::new(&tokens);
        let added = EmptyPredictRule {}.apply_everywhere(&mut chart, &g);
        assert_eq!(added.len(), 2);
        assert!(added.iter().all(|e| e.is_complete() && e.start() == e.end()));
    }
}
