pub mod config;
pub mod feed;
pub mod node_set;

pub use config::*;
pub use feed::*;
pub use node_set::*;
