use approx::AbsDiffEq;
use log::debug;
use num_traits::Float;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::cs::graph::adjacency::{EdgeId, Graph};
use crate::cs::numeric;
use crate::error::FlowError;

/// One direction of an edge in the residual network.
///
/// Every original edge `u -> v` yields a forward arc `u -> v` holding the
/// remaining capacity and a reverse arc `v -> u` holding the flow that can be
/// cancelled. The two residuals always add up to the original capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualArc<W> {
    pub to: usize,
    pub residual: W,
    /// Original capacity, zero for reverse arcs
    pub capacity: W,
    /// Index of the paired arc
    pub rev: usize,
    /// Original edge id, `None` for reverse arcs
    pub edge: Option<EdgeId>,
}

impl<W> ResidualArc<W>
where
    W: Float,
{
    #[inline]
    pub fn is_forward(&self) -> bool {
        self.edge.is_some()
    }

    /// Flow currently routed over a forward arc.
    #[inline]
    pub fn flow(&self) -> W {
        self.capacity - self.residual
    }
}

/// Residual network in compressed sparse row form.
///
/// The arcs leaving `u` are `arcs[start[u]..start[u + 1]]`: first one forward
/// arc per outgoing edge of `u`, then one reverse arc per incoming edge, both
/// in edge insertion order. Arc indices are stable for the lifetime of the
/// graph, so the solver refers to arcs by index only.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualGraph<W> {
    start: Vec<usize>,
    arcs: Vec<ResidualArc<W>>,
}

/// Rejects negative, infinite and NaN capacities.
pub fn validate_capacities<W>(graph: &Graph<W>) -> Result<(), FlowError>
where
    W: Float + Debug,
{
    match graph
        .edges()
        .iter()
        .find(|e| !e.weight.is_finite() || e.weight < W::zero())
    {
        Some(e) => Err(FlowError::InvalidCapacity {
            from: e.from,
            to: e.to,
        }),
        None => Ok(()),
    }
}

impl<W> ResidualGraph<W>
where
    W: Float + AbsDiffEq<Epsilon = W> + Debug + Send + Sync,
{
    /// Validates `graph` and builds its residual network.
    pub fn from_graph(graph: &Graph<W>, parallel: bool) -> Result<Self, FlowError> {
        if !graph.is_directed() {
            return Err(FlowError::UndirectedGraph);
        }
        validate_capacities(graph)?;
        Ok(Self::build(graph, parallel))
    }

    /// Builds the residual network of a validated directed graph.
    ///
    /// Offsets and each edge's position inside its endpoints' adjacency are
    /// computed up front. After that every node assembles its own arc list
    /// from its own out- and in-edges, so the per-node work shares no mutable
    /// state and runs on the rayon pool when `parallel` is set.
    pub(crate) fn build(graph: &Graph<W>, parallel: bool) -> Self {
        let n = graph.number_of_nodes();
        let m = graph.number_of_edges();
        let edges = graph.edges();

        let mut start = vec![0; n + 1];
        for u in 0..n {
            start[u + 1] = start[u] + graph.out_edge_ids(u).len() + graph.in_edge_ids(u).len();
        }

        // position of each edge in its tail's out list and its head's in list
        let mut out_pos = vec![0; m];
        let mut in_pos = vec![0; m];
        for u in 0..n {
            for (k, &e) in graph.out_edge_ids(u).iter().enumerate() {
                out_pos[e] = k;
            }
            for (k, &e) in graph.in_edge_ids(u).iter().enumerate() {
                in_pos[e] = k;
            }
        }

        let node_arcs = |u: usize| -> Vec<ResidualArc<W>> {
            let out = graph.out_edge_ids(u);
            let inc = graph.in_edge_ids(u);
            let mut arcs = Vec::with_capacity(out.len() + inc.len());
            for &e in out {
                let v = edges[e].to;
                arcs.push(ResidualArc {
                    to: v,
                    residual: edges[e].weight,
                    capacity: edges[e].weight,
                    rev: start[v] + graph.out_edge_ids(v).len() + in_pos[e],
                    edge: Some(e),
                });
            }
            for &e in inc {
                let v = edges[e].from;
                arcs.push(ResidualArc {
                    to: v,
                    residual: W::zero(),
                    capacity: W::zero(),
                    rev: start[v] + out_pos[e],
                    edge: None,
                });
            }
            arcs
        };

        #[cfg(feature = "parallel")]
        let per_node: Vec<Vec<ResidualArc<W>>> = if parallel {
            (0..n).into_par_iter().map(node_arcs).collect()
        } else {
            (0..n).map(node_arcs).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let per_node: Vec<Vec<ResidualArc<W>>> = {
            let _ = parallel;
            (0..n).map(node_arcs).collect()
        };

        let arcs: Vec<ResidualArc<W>> = per_node.into_iter().flatten().collect();
        debug_assert_eq!(arcs.len(), 2 * m);
        debug_assert!(arcs
            .iter()
            .enumerate()
            .all(|(i, arc)| arcs[arc.rev].rev == i));

        debug!("built residual graph with {} nodes and {} arcs", n, arcs.len());
        ResidualGraph { start, arcs }
    }

    #[inline]
    pub fn number_of_nodes(&self) -> usize {
        self.start.len() - 1
    }

    #[inline]
    pub fn number_of_arcs(&self) -> usize {
        self.arcs.len()
    }

    /// Indices of the arcs leaving `u`.
    #[inline]
    pub fn arcs_of(&self, u: usize) -> Range<usize> {
        self.start[u]..self.start[u + 1]
    }

    #[inline]
    pub fn neighbors(&self, u: usize) -> std::slice::Iter<'_, ResidualArc<W>> {
        self.arcs[self.arcs_of(u)].iter()
    }

    #[inline]
    pub fn arc(&self, index: usize) -> &ResidualArc<W> {
        &self.arcs[index]
    }

    /// Node the arc leaves from.
    #[inline]
    pub fn tail(&self, index: usize) -> usize {
        self.arcs[self.arcs[index].rev].to
    }

    /// Moves `delta` units over `index`: its residual shrinks, the paired
    /// arc's residual grows. A residual within `epsilon` of zero is clamped to
    /// zero and reported as saturated.
    pub fn push_flow(&mut self, index: usize, delta: W, epsilon: W) -> bool {
        let rev = self.arcs[index].rev;
        self.arcs[rev].residual = self.arcs[rev].residual + delta;

        let remaining = self.arcs[index].residual - delta;
        debug_assert!(
            remaining >= -epsilon,
            "negative residual capacity {:?} on arc {}",
            remaining,
            index
        );
        if numeric::is_zero(remaining, epsilon) {
            self.arcs[index].residual = W::zero();
            true
        } else {
            self.arcs[index].residual = remaining;
            false
        }
    }

    pub fn has_arc(&self, u: usize, v: usize) -> bool {
        self.neighbors(u).any(|arc| arc.to == v)
    }

    /// Total residual capacity from `u` to `v` over all arcs between them.
    pub fn residual_capacity(&self, u: usize, v: usize) -> W {
        self.neighbors(u)
            .filter(|arc| arc.to == v)
            .fold(W::zero(), |sum, arc| sum + arc.residual)
    }

    /// Total flow over the original edges `u -> v`.
    pub fn flow(&self, u: usize, v: usize) -> W {
        self.neighbors(u)
            .filter(|arc| arc.is_forward() && arc.to == v)
            .fold(W::zero(), |sum, arc| sum + arc.flow())
    }

    /// Flow on every original edge, indexed by edge id.
    pub fn edge_flows(&self) -> Vec<(usize, usize, W)> {
        let mut flows = vec![(0, 0, W::zero()); self.arcs.len() / 2];
        for u in 0..self.number_of_nodes() {
            for arc in self.neighbors(u) {
                if let Some(e) = arc.edge {
                    flows[e] = (u, arc.to, arc.flow());
                }
            }
        }
        flows
    }

    /// Nodes reachable from `source` over arcs with residual above `epsilon`.
    pub fn reachable_from(&self, source: usize, epsilon: W) -> Vec<bool> {
        let mut visited = vec![false; self.number_of_nodes()];
        let mut queue = VecDeque::from([source]);
        visited[source] = true;

        while let Some(u) = queue.pop_front() {
            for arc in self.neighbors(u) {
                if !visited[arc.to] && numeric::is_positive(arc.residual, epsilon) {
                    visited[arc.to] = true;
                    queue.push_back(arc.to);
                }
            }
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::DEFAULT_EPSILON;

    fn diamond() -> Graph<f64> {
        Graph::from_edges(
            4,
            &[(0, 1, 3.0), (0, 2, 2.0), (1, 2, 1.0), (1, 3, 2.0), (2, 3, 3.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_forward_and_reverse_arcs() {
        let residual = ResidualGraph::from_graph(&diamond(), false).unwrap();

        assert_eq!(residual.number_of_nodes(), 4);
        assert_eq!(residual.number_of_arcs(), 10);

        assert_eq!(residual.residual_capacity(0, 1), 3.0);
        assert_eq!(residual.residual_capacity(1, 0), 0.0);
        assert!(residual.has_arc(3, 2));
        assert!(!residual.has_arc(0, 3));

        for u in 0..4 {
            for i in residual.arcs_of(u) {
                let arc = residual.arc(i);
                let rev = residual.arc(arc.rev);
                assert_eq!(rev.rev, i);
                assert_eq!(residual.tail(i), u);
                assert_eq!(residual.tail(arc.rev), arc.to);
                assert_ne!(arc.is_forward(), rev.is_forward());
                if !arc.is_forward() {
                    assert_eq!(arc.residual, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_push_flow_conserves_capacity() {
        let mut residual = ResidualGraph::from_graph(&diamond(), false).unwrap();
        let arc = residual.arcs_of(0).find(|&i| residual.arc(i).to == 1).unwrap();

        assert!(!residual.push_flow(arc, 1.0, DEFAULT_EPSILON));
        assert_eq!(residual.residual_capacity(0, 1), 2.0);
        assert_eq!(residual.residual_capacity(1, 0), 1.0);
        assert_eq!(residual.flow(0, 1), 1.0);

        assert!(residual.push_flow(arc, 2.0, DEFAULT_EPSILON));
        assert_eq!(residual.residual_capacity(0, 1), 0.0);
        assert_eq!(residual.residual_capacity(1, 0), 3.0);

        // cancel one unit through the reverse arc
        let rev = residual.arc(arc).rev;
        assert!(!residual.push_flow(rev, 1.0, DEFAULT_EPSILON));
        assert_eq!(residual.flow(0, 1), 2.0);
        assert_eq!(
            residual.residual_capacity(0, 1) + residual.residual_capacity(1, 0),
            3.0
        );
    }

    #[test]
    fn test_push_flow_clamps_rounding_noise() {
        let graph = Graph::from_edges(2, &[(0, 1, 0.3)]).unwrap();
        let mut residual = ResidualGraph::from_graph(&graph, false).unwrap();

        assert!(residual.push_flow(0, 0.1 + 0.2, DEFAULT_EPSILON));
        assert_eq!(residual.arc(0).residual, 0.0);
    }

    #[test]
    fn test_parallel_build_matches_sequential() {
        let mut graph = Graph::new_directed(50);
        for u in 0..50 {
            for step in [1, 3, 7] {
                graph.add_edge(u, (u + step) % 50, (u * step % 11) as f64).unwrap();
            }
        }
        graph.add_edge(4, 4, 1.0).unwrap();
        graph.add_edge(4, 5, 2.0).unwrap();

        let sequential = ResidualGraph::from_graph(&graph, false).unwrap();
        let parallel = ResidualGraph::from_graph(&graph, true).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_parallel_edges_stay_separate() {
        let graph = Graph::from_edges(2, &[(0, 1, 2.0), (0, 1, 3.0), (1, 0, 4.0)]).unwrap();
        let residual = ResidualGraph::from_graph(&graph, false).unwrap();

        assert_eq!(residual.number_of_arcs(), 6);
        assert_eq!(residual.residual_capacity(0, 1), 5.0);
        assert_eq!(residual.residual_capacity(1, 0), 4.0);
    }

    #[test]
    fn test_edge_flows_and_reachability() {
        let mut residual = ResidualGraph::from_graph(&diamond(), false).unwrap();
        let arc = residual.arcs_of(0).find(|&i| residual.arc(i).to == 2).unwrap();
        residual.push_flow(arc, 2.0, DEFAULT_EPSILON);

        let flows = residual.edge_flows();
        assert_eq!(flows.len(), 5);
        assert_eq!(flows[1], (0, 2, 2.0));
        assert_eq!(flows[0], (0, 1, 0.0));

        let reachable = residual.reachable_from(0, DEFAULT_EPSILON);
        assert_eq!(reachable, vec![true, true, true, true]);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let graph = Graph::from_edges(2, &[(0, 1, -1.0)]).unwrap();
        assert_eq!(
            ResidualGraph::from_graph(&graph, false),
            Err(FlowError::InvalidCapacity { from: 0, to: 1 })
        );

        for bad in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let graph = Graph::from_edges(3, &[(0, 1, 2.0), (1, 2, bad)]).unwrap();
            assert_eq!(
                ResidualGraph::from_graph(&graph, false),
                Err(FlowError::InvalidCapacity { from: 1, to: 2 })
            );
        }

        let undirected: Graph<f64> = Graph::new_undirected(2);
        assert_eq!(
            ResidualGraph::from_graph(&undirected, false),
            Err(FlowError::UndirectedGraph)
        );
    }
}
