//! Closed set of graph nodes.

use std::fmt;
use std::str::FromStr;

use crate::error::GraphError;

/// A node of the email graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    TriageRouter,
    ResponseAgent,
    End,
}

impl Node {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TriageRouter => "triage_router",
            Self::ResponseAgent => "response_agent",
            Self::End => "__end__",
        }
    }

    /// Whether the graph has an edge `self → to`.
    pub fn has_edge_to(&self, to: Node) -> bool {
        matches!(
            (self, to),
            (Self::TriageRouter, Self::ResponseAgent)
                | (Self::TriageRouter, Self::End)
                | (Self::ResponseAgent, Self::End)
        )
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Node {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "triage_router" => Ok(Self::TriageRouter),
            "response_agent" => Ok(Self::ResponseAgent),
            "__end__" | "end" => Ok(Self::End),
            other => Err(GraphError::InvalidNodeReference {
                node: other.to_string(),
            }),
        }
    }
}
