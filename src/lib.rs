//! Triage Assist: email triage and tool-using reply agent.
//!
//! An incoming email is classified by the [`triage::TriageRouter`] and either
//! dropped, surfaced as a notification, or handed to the
//! [`agent::ResponseAgent`], which drafts a reply and sends it through the
//! [`tools::ToolRegistry`]. [`graph::EmailGraph`] wires the two together.

pub mod agent;
pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod tools;
pub mod triage;
