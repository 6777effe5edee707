//! # Muster Graph
//!
//! Task graph construction: expanding a goal-model annotation tree into
//! the directed graph the planner enumerates over.

pub mod builder;
pub mod graph;

pub use builder::GraphBuilder;
pub use graph::{EdgeKind, NodeKind, TaskGraph, TaskNode};

pub use petgraph::graph::NodeIndex;
