use thiserror::Error;

/// Errors raised by the graph container.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("Vertex {0} not found")]
    VertexNotFound(usize),

    #[error("Edge {0} -> {1} not found")]
    EdgeNotFound(usize, usize),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl GraphError {
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        GraphError::InvalidInput(msg.into())
    }
}

/// Errors raised by the maximum flow solver.
///
/// Everything except [`FlowError::NotRun`] is a configuration error reported
/// by the constructor, before any residual state exists. `NotRun` is
/// recoverable: call `run()` and ask again.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowError {
    #[error("Dinic algorithm requires a directed graph")]
    UndirectedGraph,

    #[error("Dinic algorithm requires a weighted graph")]
    UnweightedGraph,

    #[error("Dinic algorithm requires source and target to be different nodes")]
    SourceEqualsTarget,

    #[error("Node {0} is not part of the graph")]
    NodeOutOfRange(usize),

    #[error("Edge {from} -> {to} has a negative or non-finite capacity")]
    InvalidCapacity { from: usize, to: usize },

    #[error("Algorithm has not been run, call run() first")]
    NotRun,
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;
