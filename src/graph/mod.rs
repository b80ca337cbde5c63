//! Graph environment - nodes, edges and hop-count routing

pub mod environment;

pub use environment::{Edge, GraphEnvironment, Node, NodeKind};
