pub mod cs;
pub mod error;

pub use cs::{graph, numeric};
pub use error::{FlowError, GraphError, Result};
