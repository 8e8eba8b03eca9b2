use approx::AbsDiffEq;
use log::{debug, info, trace};
use num_traits::Float;
use std::collections::VecDeque;
use std::fmt::Debug;

use crate::cs::graph::adjacency::Graph;
use crate::cs::graph::residual::{self, ResidualGraph};
use crate::cs::numeric;
use crate::error::FlowError;

const UNREACHED: usize = usize::MAX;

/// Configuration options for [`Dinic`].
#[derive(Debug, Clone)]
pub struct DinicConfig<W>
where
    W: Float + Debug,
{
    /// Residual capacities within this distance of zero count as saturated
    pub tolerance: W,
    /// Build the residual graph on the rayon pool
    pub parallel_build: bool,
}

impl<W> Default for DinicConfig<W>
where
    W: Float + Debug,
{
    fn default() -> Self {
        Self {
            tolerance: numeric::default_epsilon(),
            parallel_build: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NotRun,
    Finished,
}

/// Maximum flow from `source` to `target` with Dinic's algorithm.
///
/// Each phase layers the residual graph with a BFS from the source, then
/// saturates a blocking flow in that layering by walking from the target back
/// to the source over the recorded predecessor arcs. An arc is dropped from
/// its predecessor queue as soon as it saturates or leads into a dead end, so
/// a phase touches every arc a constant number of times.
///
/// # Examples
/// ```
/// use maxflow::graph::{Dinic, Graph};
///
/// let graph = Graph::from_edges(
///     4,
///     &[(0, 1, 3.0), (0, 2, 2.0), (1, 2, 1.0), (1, 3, 2.0), (2, 3, 3.0)],
/// )
/// .unwrap();
///
/// let mut dinic = Dinic::new(&graph, 0, 3).unwrap();
/// dinic.run();
/// assert_eq!(dinic.max_flow().unwrap(), 5.0);
/// ```
///
/// # Complexity
/// * Time: O(V² E), at most V phases of O(V E) each
/// * Space: O(V + E)
///
/// # Errors
/// * `UndirectedGraph`, `UnweightedGraph`, `SourceEqualsTarget`,
///   `NodeOutOfRange`, `InvalidCapacity` from the constructor
/// * `NotRun` from any result query before [`Dinic::run`]
#[derive(Debug)]
pub struct Dinic<'a, W>
where
    W: Float + Debug,
{
    graph: &'a Graph<W>,
    source: usize,
    target: usize,
    config: DinicConfig<W>,
    residual: Option<ResidualGraph<W>>,
    levels: Vec<usize>,
    // admissible arcs into each node for the current phase
    parents: Vec<VecDeque<usize>>,
    queue: VecDeque<usize>,
    // arcs from the target back towards the source
    path: Vec<usize>,
    max_flow: W,
    phase_flows: Vec<W>,
    augmenting_paths: usize,
    state: State,
}

impl<'a, W> Dinic<'a, W>
where
    W: Float + AbsDiffEq<Epsilon = W> + Debug + Send + Sync,
{
    pub fn new(graph: &'a Graph<W>, source: usize, target: usize) -> Result<Self, FlowError> {
        Self::with_config(graph, source, target, DinicConfig::default())
    }

    pub fn with_config(
        graph: &'a Graph<W>,
        source: usize,
        target: usize,
        config: DinicConfig<W>,
    ) -> Result<Self, FlowError> {
        if !graph.is_directed() {
            return Err(FlowError::UndirectedGraph);
        }
        if !graph.is_weighted() {
            return Err(FlowError::UnweightedGraph);
        }
        if source == target {
            return Err(FlowError::SourceEqualsTarget);
        }
        for node in [source, target] {
            if !graph.has_vertex(node) {
                return Err(FlowError::NodeOutOfRange(node));
            }
        }
        residual::validate_capacities(graph)?;

        let n = graph.number_of_nodes();
        Ok(Dinic {
            graph,
            source,
            target,
            config,
            residual: None,
            levels: vec![UNREACHED; n],
            parents: vec![VecDeque::new(); n],
            queue: VecDeque::with_capacity(n),
            path: Vec::new(),
            max_flow: W::zero(),
            phase_flows: Vec::new(),
            augmenting_paths: 0,
            state: State::NotRun,
        })
    }

    #[inline]
    pub fn source(&self) -> usize {
        self.source
    }

    #[inline]
    pub fn target(&self) -> usize {
        self.target
    }

    /// Computes the maximum flow.
    ///
    /// Every call rebuilds the residual graph and starts from zero flow, so
    /// running twice gives the same answer.
    pub fn run(&mut self) {
        let n = self.graph.number_of_nodes();
        self.state = State::NotRun;
        self.residual = Some(ResidualGraph::build(self.graph, self.config.parallel_build));
        self.max_flow = W::zero();
        self.phase_flows.clear();
        self.augmenting_paths = 0;

        info!(
            "dinic: {} nodes, {} edges, source {}, target {}",
            n,
            self.graph.number_of_edges(),
            self.source,
            self.target
        );

        while self.can_reach_target_in_level_graph() {
            let flow = self.compute_blocking_flow();
            if numeric::is_zero(flow, self.config.tolerance) {
                debug!("phase {} carried no flow, stopping", self.phase_flows.len() + 1);
                break;
            }
            self.max_flow = self.max_flow + flow;
            self.phase_flows.push(flow);
            debug!(
                "phase {}: target at level {}, flow {:?}, total {:?}",
                self.phase_flows.len(),
                self.levels[self.target],
                flow,
                self.max_flow
            );
            debug_assert!(self.phase_flows.len() <= n, "more phases than nodes");
        }

        self.state = State::Finished;
        info!(
            "dinic: max flow {:?} after {} phases and {} augmenting paths",
            self.max_flow,
            self.phase_flows.len(),
            self.augmenting_paths
        );
    }

    /// Layers the residual graph by BFS distance from the source and records,
    /// for every reached node, the arcs entering it from the previous layer.
    /// Returns whether the target was reached.
    fn can_reach_target_in_level_graph(&mut self) -> bool {
        let Some(residual) = self.residual.as_ref() else {
            return false;
        };
        let epsilon = self.config.tolerance;

        self.levels.fill(UNREACHED);
        for parents in self.parents.iter_mut() {
            parents.clear();
        }
        self.queue.clear();

        self.levels[self.source] = 0;
        self.queue.push_back(self.source);
        while let Some(parent) = self.queue.pop_front() {
            let next_level = self.levels[parent] + 1;
            for index in residual.arcs_of(parent) {
                let arc = residual.arc(index);
                if !numeric::is_positive(arc.residual, epsilon) {
                    continue;
                }
                let child = arc.to;
                if self.levels[child] == UNREACHED {
                    self.levels[child] = next_level;
                    self.parents[child].push_back(index);
                    self.queue.push_back(child);
                } else if self.levels[child] == next_level {
                    self.parents[child].push_back(index);
                }
            }
        }

        self.levels[self.target] != UNREACHED
    }

    /// Saturates a blocking flow in the current level graph and returns its
    /// value.
    fn compute_blocking_flow(&mut self) -> W {
        let Some(residual) = self.residual.as_mut() else {
            return W::zero();
        };
        let epsilon = self.config.tolerance;
        let mut total = W::zero();

        self.path.clear();
        let mut tail = self.target;
        loop {
            let front = self.parents[tail].front().copied();
            match front {
                Some(index) => {
                    self.path.push(index);
                    tail = residual.tail(index);
                }
                None => {
                    // dead end: step back and drop the arc that led here
                    let Some(dead) = self.path.pop() else {
                        break;
                    };
                    tail = residual.arc(dead).to;
                    self.parents[tail].pop_front();
                    continue;
                }
            }

            if tail != self.source {
                continue;
            }

            let bottleneck = self
                .path
                .iter()
                .map(|&index| residual.arc(index).residual)
                .fold(W::infinity(), W::min);

            for &index in &self.path {
                if residual.push_flow(index, bottleneck, epsilon) {
                    let head = residual.arc(index).to;
                    debug_assert_eq!(self.parents[head].front(), Some(&index));
                    self.parents[head].pop_front();
                }
            }

            trace!(
                "augmenting path of {} arcs carries {:?}",
                self.path.len(),
                bottleneck
            );
            total = total + bottleneck;
            self.augmenting_paths += 1;
            self.path.clear();
            tail = self.target;
        }

        total
    }

    fn assure_finished(&self) -> Result<&ResidualGraph<W>, FlowError> {
        match (self.state, self.residual.as_ref()) {
            (State::Finished, Some(residual)) => Ok(residual),
            _ => Err(FlowError::NotRun),
        }
    }

    #[inline]
    pub fn has_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Value of the maximum flow.
    pub fn max_flow(&self) -> Result<W, FlowError> {
        self.assure_finished()?;
        Ok(self.max_flow)
    }

    /// Number of phases that carried flow.
    pub fn phases(&self) -> Result<usize, FlowError> {
        self.assure_finished()?;
        Ok(self.phase_flows.len())
    }

    /// Blocking flow value of each phase, in order.
    pub fn phase_flows(&self) -> Result<&[W], FlowError> {
        self.assure_finished()?;
        Ok(&self.phase_flows)
    }

    pub fn augmenting_paths(&self) -> Result<usize, FlowError> {
        self.assure_finished()?;
        Ok(self.augmenting_paths)
    }

    /// Flow routed over the original edges `u -> v`.
    pub fn flow(&self, u: usize, v: usize) -> Result<W, FlowError> {
        let residual = self.assure_finished()?;
        for node in [u, v] {
            if !self.graph.has_vertex(node) {
                return Err(FlowError::NodeOutOfRange(node));
            }
        }
        Ok(residual.flow(u, v))
    }

    /// `(from, to, flow)` for every original edge, indexed by edge id.
    pub fn flows(&self) -> Result<Vec<(usize, usize, W)>, FlowError> {
        Ok(self.assure_finished()?.edge_flows())
    }

    /// Source side of a minimum cut: the nodes still reachable from the source
    /// in the final residual graph.
    pub fn min_cut_source_side(&self) -> Result<Vec<usize>, FlowError> {
        let residual = self.assure_finished()?;
        Ok(residual
            .reachable_from(self.source, self.config.tolerance)
            .into_iter()
            .enumerate()
            .filter_map(|(u, reached)| reached.then_some(u))
            .collect())
    }

    pub fn residual_graph(&self) -> Result<&ResidualGraph<W>, FlowError> {
        self.assure_finished()
    }

    pub fn into_residual_graph(self) -> Result<ResidualGraph<W>, FlowError> {
        match (self.state, self.residual) {
            (State::Finished, Some(residual)) => Ok(residual),
            _ => Err(FlowError::NotRun),
        }
    }
}

/// Runs [`Dinic`] once and returns the maximum flow value.
pub fn max_flow<W>(graph: &Graph<W>, source: usize, target: usize) -> Result<W, FlowError>
where
    W: Float + AbsDiffEq<Epsilon = W> + Debug + Send + Sync,
{
    let mut dinic = Dinic::new(graph, source, target)?;
    dinic.run();
    dinic.max_flow()
}
