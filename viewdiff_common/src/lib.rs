pub mod config;
pub mod error;
pub mod graph;
pub mod types;

pub use config::*;
pub use error::*;
pub use graph::*;
pub use types::*;
