//! Response agent: the tool-using loop that drafts replies.

pub mod response_agent;

pub use response_agent::{AgentRun, LoopState, ResponseAgent};
