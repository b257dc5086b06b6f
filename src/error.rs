//! Error types for Triage Assist.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Triage error: {0}")]
    Triage(#[from] TriageError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
///
/// These never escape the completion client as errors; the agent loop is the
/// only caller that sees them directly.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tool registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("Tool {name} not found")]
    NotFound { name: String },

    #[error("Invalid arguments for tool {name}: {reason}")]
    InvalidArguments { name: String, reason: String },

    #[error("Tool {name} execution failed: {reason}")]
    ExecutionFailed { name: String, reason: String },
}

/// Triage router errors. All of them are fatal for the email being routed.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("Classifier backend failed: {0}")]
    Backend(String),

    #[error("Could not parse classification: {reason}")]
    ClassificationParse { reason: String },

    #[error("Invalid classification: '{label}'")]
    InvalidClassification { label: String },
}

/// Response agent errors.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Iteration budget of {max_iterations} tool rounds exceeded")]
    IterationBudgetExceeded { max_iterations: usize },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Orchestration graph errors.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("triage stage failed: {0}")]
    Triage(#[from] TriageError),

    #[error("response stage failed: {0}")]
    ResponseAgent(#[from] AgentError),

    #[error("Route names unknown node '{node}'")]
    InvalidNodeReference { node: String },

    #[error("No edge from {from} to {to}")]
    InvalidEdge { from: String, to: String },

    #[error("Terminal route decision carried a state update")]
    TerminalUpdate,

    #[error("Graph is missing required node {node}")]
    MissingNode { node: String },
}

impl GraphError {
    /// Which stage of the run produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Triage(_) => "triage",
            Self::ResponseAgent(_) => "response",
            Self::InvalidNodeReference { .. }
            | Self::InvalidEdge { .. }
            | Self::TerminalUpdate
            | Self::MissingNode { .. } => "graph",
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
