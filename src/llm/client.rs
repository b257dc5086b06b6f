//! Completion client: one chat completion in, one string out.
//!
//! Transport, auth, and decoding failures never propagate as errors. They come
//! back as a string starting with [`ERROR_PREFIX`], and callers must check
//! [`is_error_completion`] before trusting the content.

use std::sync::Arc;

use tracing::warn;

use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Prefix marking a failed completion.
pub const ERROR_PREFIX: &str = "Error:";

/// Whether a completion string is the error sentinel.
pub fn is_error_completion(text: &str) -> bool {
    text.starts_with(ERROR_PREFIX)
}

/// Thin wrapper over a provider that folds failures into the returned text.
#[derive(Clone)]
pub struct CompletionClient {
    llm: Arc<dyn LlmProvider>,
}

impl CompletionClient {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Request a completion.
    ///
    /// `temperature` is clamped to `[0, 1]` and `max_tokens` to at least 1.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> String {
        let request = CompletionRequest::new(messages)
            .with_temperature(temperature.clamp(0.0, 1.0))
            .with_max_tokens(max_tokens.max(1));

        match self.llm.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(model = %self.llm.model_name(), error = %e, "Completion failed");
                format!("{ERROR_PREFIX} {e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::provider::{
        CompletionResponse, FinishReason, ToolCompletionRequest, ToolCompletionResponse,
    };

    /// Records the last request and replies with a canned outcome.
    struct RecordingLlm {
        fail: bool,
        last: Mutex<Option<CompletionRequest>>,
    }

    #[async_trait::async_trait]
    impl LlmProvider for RecordingLlm {
        fn model_name(&self) -> &str {
            "recording"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            *self.last.lock().unwrap() = Some(request);
            if self.fail {
                return Err(LlmError::AuthFailed {
                    provider: "recording".into(),
                });
            }
            Ok(CompletionResponse {
                content: "hello there".into(),
                input_tokens: 3,
                output_tokens: 2,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }

        async fn complete_with_tools(
            &self,
            _request: ToolCompletionRequest,
        ) -> Result<ToolCompletionResponse, LlmError> {
            unimplemented!("not used by the completion client")
        }
    }

    #[tokio::test]
    async fn returns_content_on_success() {
        let llm = Arc::new(RecordingLlm {
            fail: false,
            last: Mutex::new(None),
        });
        let client = CompletionClient::new(llm.clone());
        let text = client
            .complete(vec![ChatMessage::user("hi")], 0.7, 500)
            .await;
        assert_eq!(text, "hello there");
        assert!(!is_error_completion(&text));

        let request = llm.last.lock().unwrap().take().unwrap();
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(500));
    }

    #[tokio::test]
    async fn failure_becomes_error_tagged_string() {
        let client = CompletionClient::new(Arc::new(RecordingLlm {
            fail: true,
            last: Mutex::new(None),
        }));
        let text = client.complete(vec![ChatMessage::user("hi")], 0.0, 10).await;
        assert!(is_error_completion(&text));
        assert!(text.contains("Authentication failed"));
    }

    #[tokio::test]
    async fn sampling_parameters_are_clamped() {
        let llm = Arc::new(RecordingLlm {
            fail: false,
            last: Mutex::new(None),
        });
        let client = CompletionClient::new(llm.clone());
        client.complete(vec![ChatMessage::user("hi")], 3.0, 0).await;

        let request = llm.last.lock().unwrap().take().unwrap();
        assert_eq!(request.temperature, Some(1.0));
        assert_eq!(request.max_tokens, Some(1));
    }
}
