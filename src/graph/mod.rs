//! Orchestration graph: triage router → (response agent) → end.
//!
//! The graph owns one `Conversation` per run and hands nodes `&mut` access,
//! which only permits appending.

pub mod conversation;
pub mod email_graph;
pub mod node;

pub use conversation::Conversation;
pub use email_graph::{EmailGraph, EmailGraphBuilder};
pub use node::Node;
