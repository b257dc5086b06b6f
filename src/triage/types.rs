//! Shared types for email triage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TriageError;
use crate::graph::Node;
use crate::llm::ChatMessage;

// ── Inbound email ───────────────────────────────────────────────────

/// An inbound email. Read-only once received.
///
/// Also accepts the `to` / `email_thread` field names used by exported
/// email fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub author: String,
    #[serde(alias = "to")]
    pub recipient: String,
    pub subject: String,
    #[serde(alias = "email_thread")]
    pub thread_body: String,
}

impl Email {
    pub fn new(
        author: impl Into<String>,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        thread_body: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            recipient: recipient.into(),
            subject: subject.into(),
            thread_body: thread_body.into(),
        }
    }
}

// ── Classification ──────────────────────────────────────────────────

/// Triage disposition of an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageLabel {
    /// Irrelevant: marketing, spam, noise.
    Ignore,
    /// Worth knowing about, no reply needed.
    Notify,
    /// Needs a reply.
    Respond,
}

impl TriageLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Notify => "notify",
            Self::Respond => "respond",
        }
    }
}

impl fmt::Display for TriageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriageLabel {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "notify" => Ok(Self::Notify),
            "respond" => Ok(Self::Respond),
            _ => Err(TriageError::InvalidClassification {
                label: s.to_string(),
            }),
        }
    }
}

/// The classifier's verdict on one email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Step-by-step reasoning behind the label.
    pub reasoning: String,
    #[serde(rename = "classification")]
    pub label: TriageLabel,
}

/// A labelled email shown to the classifier as a few-shot example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageExample {
    pub email: Email,
    pub label: TriageLabel,
}

// ── Route decision ──────────────────────────────────────────────────

/// Where the graph goes after triage, and what to append to the
/// conversation on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDecision {
    pub next_node: Node,
    pub state_update: Option<Vec<ChatMessage>>,
}

impl RouteDecision {
    /// Terminate the run. Carries no state update.
    pub fn end() -> Self {
        Self {
            next_node: Node::End,
            state_update: None,
        }
    }

    /// Forward to the response agent with the given messages appended.
    pub fn to_response_agent(update: Vec<ChatMessage>) -> Self {
        Self {
            next_node: Node::ResponseAgent,
            state_update: Some(update),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next_node == Node::End
    }
}
