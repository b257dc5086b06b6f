//! Send-email tool: placeholder with no delivery.
//!
//! Validates its arguments and reports success. Nothing leaves the process;
//! a real transport would sit behind this same tool signature.

use std::time::Instant;

use async_trait::async_trait;

use crate::tools::tool::{Tool, ToolError, ToolOutput, require_str};

/// Tool the response agent uses to reply to an email.
#[derive(Debug, Default)]
pub struct SendEmailTool;

impl SendEmailTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Write and send an email."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "to": {
                    "type": "string",
                    "description": "Recipient address"
                },
                "subject": {
                    "type": "string",
                    "description": "Subject line"
                },
                "content": {
                    "type": "string",
                    "description": "Body of the email"
                }
            },
            "required": ["to", "subject", "content"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let to = require_str(&params, "to")?;
        let subject = require_str(&params, "subject")?;
        let content = require_str(&params, "content")?;

        if to.trim().is_empty() {
            return Err(ToolError::InvalidParameters(
                "'to' must not be empty".to_string(),
            ));
        }

        tracing::info!(
            to = %to,
            subject = %subject,
            body_chars = content.chars().count(),
            "send_email called (no delivery)"
        );

        Ok(ToolOutput::text(
            format!("Email sent to {to} with subject '{subject}'"),
            start.elapsed(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_confirmation() {
        let out = SendEmailTool::new()
            .execute(serde_json::json!({
                "to": "sender@x",
                "subject": "Re: Meeting",
                "content": "Tuesday works."
            }))
            .await
            .unwrap();
        assert_eq!(out.as_text(), "Email sent to sender@x with subject 'Re: Meeting'");
    }

    #[tokio::test]
    async fn missing_content_is_invalid() {
        let err = SendEmailTool::new()
            .execute(serde_json::json!({"to": "a@x", "subject": "s"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(ref m) if m.contains("content")));
    }

    #[tokio::test]
    async fn blank_recipient_is_invalid() {
        let err = SendEmailTool::new()
            .execute(serde_json::json!({"to": "  ", "subject": "s", "content": "c"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }

    #[test]
    fn schema_requires_all_fields() {
        let schema = SendEmailTool::new().parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["to", "subject", "content"]));
    }
}
