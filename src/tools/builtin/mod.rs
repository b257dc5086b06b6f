//! Built-in tools available to the response agent.

pub mod send_email;

use std::sync::Arc;

pub use send_email::SendEmailTool;

use crate::tools::ToolRegistry;

/// Registry preloaded with every built-in tool.
pub fn default_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.register_sync(Arc::new(SendEmailTool::new()));
    registry
}
