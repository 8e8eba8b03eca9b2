pub mod adjacency;
pub mod dinic;
pub mod residual;

pub use adjacency::{Edge, EdgeId, Graph};
pub use dinic::{max_flow, Dinic, DinicConfig};
pub use residual::{ResidualArc, ResidualGraph};
