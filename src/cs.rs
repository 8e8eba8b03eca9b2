pub mod graph;
pub mod numeric;

// Re-export all modules
pub use graph::*;
