//! Configuration types.
//!
//! Loaded once at startup (see [`Config::from_env`]) and passed explicitly to
//! constructors. Nothing reads the environment after that.

use std::path::Path;

use crate::error::ConfigError;
use crate::llm::LlmConfig;
use crate::triage::TriageExample;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "deepseek/deepseek-chat:free";

/// Complete process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub triage: TriageConfig,
    pub agent: AgentConfig,
}

/// Criteria the classifier applies to each category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageRules {
    pub ignore: String,
    pub notify: String,
    pub respond: String,
}

impl Default for TriageRules {
    fn default() -> Self {
        Self {
            ignore: "Marketing newsletters, promotional offers, spam, and mass announcements."
                .to_string(),
            notify: "Important information the user should see but that needs no reply: \
                     status updates, deployment notices, documents shared for reference."
                .to_string(),
            respond: "Direct questions, meeting requests, and anything from a colleague or \
                      client that expects an answer."
                .to_string(),
        }
    }
}

/// Triage router configuration.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub rules: TriageRules,
    /// Few-shot examples rendered into the system prompt. May be empty.
    pub examples: Vec<TriageExample>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 512,
            rules: TriageRules::default(),
            examples: Vec::new(),
        }
    }
}

/// Response agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Persona name used in the system preamble.
    pub name: String,
    /// Role instructions appended to the preamble.
    pub instructions: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Tool-execution rounds allowed before the run fails.
    pub max_iterations: usize,
}

impl AgentConfig {
    /// Fixed persona preamble sent ahead of every agent request.
    pub fn system_prompt(&self) -> String {
        format!(
            "Hello, I am {name}. I am a {name} agent. {instructions}",
            name = self.name,
            instructions = self.instructions
        )
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Gigi".to_string(),
            instructions: "Please respond to the email.".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            max_iterations: 10,
        }
    }
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("TRIAGE_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("TRIAGE_API_KEY".to_string()))?;

        let llm = LlmConfig {
            provider_name: get("TRIAGE_PROVIDER_NAME").unwrap_or_else(|| "openai-compat".into()),
            base_url: get("TRIAGE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            api_key: secrecy::SecretString::from(api_key),
            model: get("TRIAGE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
        };

        let triage_defaults = TriageConfig::default();
        let examples = match get("TRIAGE_EXAMPLES_PATH") {
            Some(path) => load_examples(Path::new(&path))?,
            None => Vec::new(),
        };
        let triage = TriageConfig {
            temperature: parse_temperature(
                "TRIAGE_TEMPERATURE",
                get("TRIAGE_TEMPERATURE"),
                triage_defaults.temperature,
            )?,
            max_tokens: parse_positive(
                "TRIAGE_MAX_TOKENS",
                get("TRIAGE_MAX_TOKENS"),
                triage_defaults.max_tokens,
            )?,
            rules: triage_defaults.rules,
            examples,
        };

        let agent_defaults = AgentConfig::default();
        let agent = AgentConfig {
            name: get("AGENT_NAME").unwrap_or(agent_defaults.name),
            instructions: get("AGENT_INSTRUCTIONS").unwrap_or(agent_defaults.instructions),
            temperature: parse_temperature(
                "AGENT_TEMPERATURE",
                get("AGENT_TEMPERATURE"),
                agent_defaults.temperature,
            )?,
            max_tokens: parse_positive(
                "AGENT_MAX_TOKENS",
                get("AGENT_MAX_TOKENS"),
                agent_defaults.max_tokens,
            )?,
            max_iterations: parse_positive(
                "AGENT_MAX_ITERATIONS",
                get("AGENT_MAX_ITERATIONS"),
                agent_defaults.max_iterations,
            )?,
        };

        Ok(Self { llm, triage, agent })
    }
}

/// Load few-shot triage examples from a JSON array file.
pub fn load_examples(path: &Path) -> Result<Vec<TriageExample>, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))
}

fn parse_temperature(key: &str, value: Option<String>, default: f32) -> Result<f32, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    let t: f32 = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{value}' is not a number"),
    })?;
    if !(0.0..=1.0).contains(&t) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{t} is outside [0, 1]"),
        });
    }
    Ok(t)
}

fn parse_positive<T>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(value) = value else {
        return Ok(default);
    };
    let n: T = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{value}' is not a positive integer"),
    })?;
    if n <= T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    Ok(n)
}
