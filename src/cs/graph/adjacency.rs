use num_traits::Float;
use std::fmt::Debug;
use std::ops::Range;

use crate::error::{GraphError, Result};

/// Stable index of an edge, assigned in insertion order.
pub type EdgeId = usize;

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Edge<W> {
    pub from: usize,
    pub to: usize,
    pub weight: W,
}

/// Index-based graph over the nodes `0..n`.
///
/// Edges live in a flat list and every node keeps the ids of its outgoing and
/// incoming edges, so both directions can be iterated in O(degree). For an
/// undirected graph each edge is listed as outgoing and incoming at both of
/// its endpoints. An unweighted graph stores every weight as `1`.
#[derive(Debug, Clone)]
pub struct Graph<W> {
    directed: bool,
    weighted: bool,
    edges: Vec<Edge<W>>,
    out_edges: Vec<Vec<EdgeId>>,
    in_edges: Vec<Vec<EdgeId>>,
}

impl<W> Graph<W>
where
    W: Float + Debug,
{
    pub fn new(num_nodes: usize, weighted: bool, directed: bool) -> Self {
        Graph {
            directed,
            weighted,
            edges: Vec::new(),
            out_edges: vec![Vec::new(); num_nodes],
            in_edges: vec![Vec::new(); num_nodes],
        }
    }

    /// Directed, weighted graph: the shape flow algorithms expect.
    pub fn new_directed(num_nodes: usize) -> Self {
        Self::new(num_nodes, true, true)
    }

    pub fn new_undirected(num_nodes: usize) -> Self {
        Self::new(num_nodes, true, false)
    }

    /// Builds a directed, weighted graph from `(from, to, weight)` triples.
    pub fn from_edges(num_nodes: usize, edges: &[(usize, usize, W)]) -> Result<Self> {
        let mut graph = Self::new_directed(num_nodes);
        for &(u, v, w) in edges {
            graph.add_edge(u, v, w)?;
        }
        Ok(graph)
    }

    #[inline]
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    #[inline]
    pub fn is_weighted(&self) -> bool {
        self.weighted
    }

    #[inline]
    pub fn number_of_nodes(&self) -> usize {
        self.out_edges.len()
    }

    #[inline]
    pub fn number_of_edges(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn has_vertex(&self, u: usize) -> bool {
        u < self.number_of_nodes()
    }

    pub fn nodes(&self) -> Range<usize> {
        0..self.number_of_nodes()
    }

    pub fn add_node(&mut self) -> usize {
        self.out_edges.push(Vec::new());
        self.in_edges.push(Vec::new());
        self.number_of_nodes() - 1
    }

    /// Inserts `from -> to` and returns its id. Parallel edges are allowed and
    /// kept as separate edges.
    pub fn add_edge(&mut self, from: usize, to: usize, weight: W) -> Result<EdgeId> {
        if !self.has_vertex(from) {
            return Err(GraphError::VertexNotFound(from));
        }
        if !self.has_vertex(to) {
            return Err(GraphError::VertexNotFound(to));
        }

        let weight = if self.weighted { weight } else { W::one() };
        let id = self.edges.len();
        self.edges.push(Edge { from, to, weight });
        self.out_edges[from].push(id);
        self.in_edges[to].push(id);
        if !self.directed && from != to {
            self.out_edges[to].push(id);
            self.in_edges[from].push(id);
        }
        Ok(id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge<W>> {
        self.edges.get(id)
    }

    pub fn edges(&self) -> &[Edge<W>] {
        &self.edges
    }

    /// Ids of the edges leaving `u`, in insertion order.
    pub fn out_edge_ids(&self, u: usize) -> &[EdgeId] {
        &self.out_edges[u]
    }

    /// Ids of the edges entering `u`, in insertion order.
    pub fn in_edge_ids(&self, u: usize) -> &[EdgeId] {
        &self.in_edges[u]
    }

    /// Out-neighbors of `u` with the connecting edge weight.
    pub fn neighbors(&self, u: usize) -> Result<impl Iterator<Item = (usize, W)> + '_> {
        if !self.has_vertex(u) {
            return Err(GraphError::VertexNotFound(u));
        }
        Ok(self.out_edges[u].iter().map(move |&id| {
            let e = &self.edges[id];
            (if e.from == u { e.to } else { e.from }, e.weight)
        }))
    }

    /// In-neighbors of `u` with the connecting edge weight.
    pub fn in_neighbors(&self, u: usize) -> Result<impl Iterator<Item = (usize, W)> + '_> {
        if !self.has_vertex(u) {
            return Err(GraphError::VertexNotFound(u));
        }
        Ok(self.in_edges[u].iter().map(move |&id| {
            let e = &self.edges[id];
            (if e.to == u { e.from } else { e.to }, e.weight)
        }))
    }

    fn find_edge(&self, u: usize, v: usize) -> Option<EdgeId> {
        if !self.has_vertex(u) || !self.has_vertex(v) {
            return None;
        }
        self.out_edges[u].iter().copied().find(|&id| {
            let e = &self.edges[id];
            (e.from == u && e.to == v) || (!self.directed && e.from == v && e.to == u)
        })
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.find_edge(u, v).is_some()
    }

    /// Weight of the first edge `u -> v`, if any.
    pub fn weight(&self, u: usize, v: usize) -> Option<W> {
        self.find_edge(u, v).map(|id| self.edges[id].weight)
    }

    /// Updates the weight of the first edge `u -> v`.
    pub fn set_weight(&mut self, u: usize, v: usize, weight: W) -> Result<()> {
        if !self.weighted {
            return Err(GraphError::invalid_input(
                "cannot set the weight of an edge in an unweighted graph",
            ));
        }
        let id = self.find_edge(u, v).ok_or(GraphError::EdgeNotFound(u, v))?;
        self.edges[id].weight = weight;
        Ok(())
    }
}
