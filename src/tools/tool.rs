//! The `Tool` trait and its input/output helpers.

use std::time::Duration;

use async_trait::async_trait;

/// Default per-call execution timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors a tool raises from inside `execute`.
///
/// The registry lifts these into [`crate::error::ToolError`] with the tool name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Output of a successful tool call.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub result: serde_json::Value,
    pub duration: Duration,
}

impl ToolOutput {
    /// Structured JSON result.
    pub fn success(result: serde_json::Value, duration: Duration) -> Self {
        Self { result, duration }
    }

    /// Plain text result.
    pub fn text(text: impl Into<String>, duration: Duration) -> Self {
        Self {
            result: serde_json::Value::String(text.into()),
            duration,
        }
    }

    /// Render the result as the string fed back to the model.
    pub fn as_text(&self) -> String {
        match &self.result {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A named, typed action the model can call.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError>;

    fn execution_timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }
}

/// Fetch a required string argument.
pub fn require_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    match params.get(key) {
        Some(serde_json::Value::String(s)) => Ok(s),
        Some(other) => Err(ToolError::InvalidParameters(format!(
            "'{key}' must be a string, got {}",
            json_type_name(other)
        ))),
        None => Err(ToolError::InvalidParameters(format!(
            "missing required parameter '{key}'"
        ))),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
