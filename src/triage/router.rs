//! Triage router: classifies an email once and decides where it goes next.
//!
//! Flow:
//! 1. Build system/user prompts (rules, few-shot examples, email fields)
//! 2. One completion call → JSON `{reasoning, classification}`
//! 3. `respond` → forward to the response agent; `ignore`/`notify` → end
//!
//! Any failure is fatal to the routing decision. There is no fallback label.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::TriageConfig;
use crate::error::TriageError;
use crate::llm::{ChatMessage, CompletionClient, is_error_completion};
use crate::triage::notify::{LogNotifier, Notifier};
use crate::triage::prompts::{
    build_response_instruction, build_triage_system_prompt, build_triage_user_prompt,
};
use crate::triage::types::{Classification, Email, RouteDecision, TriageLabel};

/// Single-shot triage decision node.
pub struct TriageRouter {
    client: CompletionClient,
    config: TriageConfig,
    notifier: Arc<dyn Notifier>,
}

impl TriageRouter {
    pub fn new(client: CompletionClient, config: TriageConfig) -> Self {
        Self {
            client,
            config,
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Replace the notifier used for `notify` emails.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Ask the classifier for a label.
    pub async fn classify(&self, email: &Email) -> Result<Classification, TriageError> {
        let messages = vec![
            ChatMessage::system(build_triage_system_prompt(&self.config)),
            ChatMessage::user(build_triage_user_prompt(email)),
        ];

        let raw = self
            .client
            .complete(messages, self.config.temperature, self.config.max_tokens)
            .await;

        if is_error_completion(&raw) {
            return Err(TriageError::Backend(raw));
        }

        debug!(model = %self.client.model_name(), raw = %raw, "Classifier responded");
        parse_classification(&raw)
    }

    /// Map a classification to a route. Pure: same inputs, same decision.
    pub fn decide(&self, email: &Email, classification: &Classification) -> RouteDecision {
        match classification.label {
            TriageLabel::Respond => RouteDecision::to_response_agent(vec![ChatMessage::user(
                build_response_instruction(email),
            )]),
            TriageLabel::Ignore | TriageLabel::Notify => RouteDecision::end(),
        }
    }

    /// Classify, raise the notify alert if needed, and decide.
    pub async fn route(&self, email: &Email) -> Result<RouteDecision, TriageError> {
        let classification = self.classify(email).await?;

        match classification.label {
            TriageLabel::Respond => info!(
                subject = %email.subject,
                reasoning = %classification.reasoning,
                "Classification: RESPOND - This email requires a response"
            ),
            TriageLabel::Ignore => info!(
                subject = %email.subject,
                reasoning = %classification.reasoning,
                "Classification: IGNORE - This email can be safely ignored"
            ),
            TriageLabel::Notify => {
                info!(
                    subject = %email.subject,
                    reasoning = %classification.reasoning,
                    "Classification: NOTIFY - This email contains important information"
                );
                self.notifier.notify(email, &classification).await;
            }
        }

        Ok(self.decide(email, &classification))
    }
}

// ── Response parsing ────────────────────────────────────────────────

/// Classifier response as it arrives on the wire.
#[derive(Debug, serde::Deserialize)]
struct RawClassification {
    reasoning: String,
    #[serde(default, alias = "label")]
    classification: Option<String>,
}

/// Parse a classifier response into a `Classification`.
///
/// The reply may wrap the object in a markdown fence or surround it with
/// prose. The first JSON object that carries a `reasoning` field wins; any
/// text after it is ignored.
pub fn parse_classification(raw: &str) -> Result<Classification, TriageError> {
    let body = fenced_block(raw).unwrap_or(raw);
    let response = first_classification_object(body)?;

    let label = response
        .classification
        .ok_or_else(|| TriageError::ClassificationParse {
            reason: "missing 'classification' field".into(),
        })?
        .parse::<TriageLabel>()?;

    Ok(Classification {
        reasoning: response.reasoning,
        label,
    })
}

/// Contents of the first ```` ```json ```` (or bare ```` ``` ````) fence
/// holding an object.
fn fenced_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let after = &text[start + 7..];
        if let Some(end) = after.find("```") {
            return Some(after[..end].trim());
        }
    }

    let start = text.find("```")?;
    let after = &text[start + 3..];
    let end = after.find("```")?;
    let inner = after[..end].trim();
    inner.starts_with('{').then_some(inner)
}

/// Read exactly one object starting at each `{` in turn, stopping at the end
/// of the first complete value so trailing text never reaches the parser.
fn first_classification_object(text: &str) -> Result<RawClassification, TriageError> {
    let mut first_error = None;

    for (start, _) in text.match_indices('{') {
        let mut values =
            serde_json::Deserializer::from_str(&text[start..]).into_iter::<RawClassification>();
        match values.next() {
            Some(Ok(response)) => return Ok(response),
            Some(Err(e)) => {
                first_error.get_or_insert(e);
            }
            None => {}
        }
    }

    Err(TriageError::ClassificationParse {
        reason: match first_error {
            Some(e) => format!("JSON parse error: {e}"),
            None => "no JSON object in classifier output".into(),
        },
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::LlmError;
    use crate::graph::Node;
    use crate::llm::{
        CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
        ToolCompletionRequest, ToolCompletionResponse,
    };

    /// Mock LLM that returns a fixed triage response.
    struct MockTriageLlm {
        response: Result<String, ()>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockTriageLlm {
        fn replying(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(response.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: Err(()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for MockTriageLlm {
        fn model_name(&self) -> &str {
            "mock-triage"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            match &self.response {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    input_tokens: 100,
                    output_tokens: 50,
                    finish_reason: FinishReason::Stop,
                    response_id: None,
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "connection refused".into(),
                }),
            }
        }

        async fn complete_with_tools(
            &self,
            _request: ToolCompletionRequest,
        ) -> Result<ToolCompletionResponse, LlmError> {
            unimplemented!("mock does not support tool completion")
        }
    }

    /// Notifier that counts alerts.
    #[derive(Default)]
    struct CountingNotifier {
        alerts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Notifier for CountingNotifier {
        async fn notify(&self, email: &Email, _classification: &Classification) {
            self.alerts.lock().unwrap().push(email.subject.clone());
        }
    }

    fn router(llm: Arc<MockTriageLlm>) -> TriageRouter {
        TriageRouter::new(CompletionClient::new(llm), TriageConfig::default())
    }

    fn promo_email() -> Email {
        Email::new(
            "Marketing Team <marketing@amazingdeals.com>",
            "John Doe <john.doe@company.com>",
            "EXCLUSIVE OFFER: Limited Time Discount on Developer Tools!",
            "Get 80% OFF on our Premium Developer Suite!\n---\nTo unsubscribe, click here",
        )
    }

    fn question_email() -> Email {
        Email::new(
            "Alice Smith <alice.smith@company.com>",
            "John Doe <john.doe@company.com>",
            "Quick question about API documentation",
            "Hi John, could you point me to the docs for the /auth endpoints?",
        )
    }

    // ── Parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_plain_json() {
        let c = parse_classification(r#"{"reasoning": "promo", "classification": "ignore"}"#)
            .unwrap();
        assert_eq!(c.label, TriageLabel::Ignore);
        assert_eq!(c.reasoning, "promo");
    }

    #[test]
    fn parse_markdown_wrapped() {
        let raw = "Here you go:\n```json\n{\"reasoning\": \"asks a question\", \"classification\": \"respond\"}\n```";
        assert_eq!(parse_classification(raw).unwrap().label, TriageLabel::Respond);
    }

    #[test]
    fn parse_with_surrounding_text() {
        let raw = "My verdict: {\"reasoning\": \"fyi\", \"classification\": \"notify\"} done.";
        assert_eq!(parse_classification(raw).unwrap().label, TriageLabel::Notify);
    }

    #[test]
    fn parse_label_alias() {
        let c = parse_classification(r#"{"reasoning": "question", "label": "respond"}"#).unwrap();
        assert_eq!(c.label, TriageLabel::Respond);
    }

    #[test]
    fn parse_object_followed_by_prose() {
        let raw = "{\"reasoning\":\"promo\",\"classification\":\"ignore\"}\n\nLet me know if you need more.";
        let c = parse_classification(raw).unwrap();
        assert_eq!(c.label, TriageLabel::Ignore);
        assert_eq!(c.reasoning, "promo");
    }

    #[test]
    fn parse_takes_first_object_when_prose_has_later_braces() {
        let raw = r#"Verdict: {"reasoning": "fyi", "classification": "notify"} (see {rules})"#;
        assert_eq!(parse_classification(raw).unwrap().label, TriageLabel::Notify);
    }

    #[test]
    fn parse_skips_braces_before_the_object() {
        let raw = r#"Applying {rules}: {"reasoning": "promo", "classification": "ignore"}"#;
        assert_eq!(parse_classification(raw).unwrap().label, TriageLabel::Ignore);
    }

    #[test]
    fn parse_fence_with_trailing_prose() {
        let raw = "```json\n{\"reasoning\": \"r\", \"classification\": \"respond\"}\n```\nHope that helps {really}.";
        assert_eq!(parse_classification(raw).unwrap().label, TriageLabel::Respond);
    }

    #[test]
    fn parse_missing_reasoning_fails() {
        let err = parse_classification(r#"{"classification": "ignore"}"#).unwrap_err();
        assert!(matches!(err, TriageError::ClassificationParse { .. }));
    }

    #[test]
    fn parse_missing_label_fails() {
        let err = parse_classification(r#"{"reasoning": "hmm"}"#).unwrap_err();
        assert!(matches!(err, TriageError::ClassificationParse { .. }));
    }

    #[test]
    fn parse_unknown_label_fails() {
        let err = parse_classification(r#"{"reasoning": "x", "classification": "escalate"}"#)
            .unwrap_err();
        assert!(matches!(err, TriageError::InvalidClassification { .. }));
    }

    #[test]
    fn parse_non_json_fails() {
        let err = parse_classification("I think you should ignore it").unwrap_err();
        assert!(matches!(err, TriageError::ClassificationParse { .. }));
    }

    // ── Routing ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn respond_routes_to_agent_with_instruction() {
        let r = router(MockTriageLlm::replying(
            r#"{"reasoning": "direct question", "classification": "respond"}"#,
        ));
        let decision = r.route(&question_email()).await.unwrap();
        assert_eq!(decision.next_node, Node::ResponseAgent);
        let update = decision.state_update.unwrap();
        assert_eq!(update.len(), 1);
        assert_eq!(update[0].role, Role::User);
        assert!(update[0].content.starts_with("Respond to the email"));
    }

    #[tokio::test]
    async fn ignore_routes_to_end_without_update() {
        let r = router(MockTriageLlm::replying(
            r#"{"reasoning": "marketing with unsubscribe link", "classification": "ignore"}"#,
        ));
        let decision = r.route(&promo_email()).await.unwrap();
        assert_eq!(decision, RouteDecision::end());
    }

    #[tokio::test]
    async fn notify_routes_to_end_and_alerts() {
        let notifier = Arc::new(CountingNotifier::default());
        let r = router(MockTriageLlm::replying(
            r#"{"reasoning": "deployment notice", "classification": "notify"}"#,
        ))
        .with_notifier(notifier.clone());
        let decision = r.route(&question_email()).await.unwrap();
        assert_eq!(decision, RouteDecision::end());
        assert_eq!(notifier.alerts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ignore_does_not_alert() {
        let notifier = Arc::new(CountingNotifier::default());
        let r = router(MockTriageLlm::replying(
            r#"{"reasoning": "spam", "classification": "ignore"}"#,
        ))
        .with_notifier(notifier.clone());
        r.route(&promo_email()).await.unwrap();
        assert!(notifier.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_label_is_fatal() {
        let r = router(MockTriageLlm::replying(
            r#"{"reasoning": "x", "classification": "archive"}"#,
        ));
        let err = r.route(&promo_email()).await.unwrap_err();
        assert!(matches!(err, TriageError::InvalidClassification { ref label } if label == "archive"));
    }

    #[tokio::test]
    async fn backend_failure_is_fatal_not_ignore() {
        let r = router(MockTriageLlm::failing());
        let err = r.route(&promo_email()).await.unwrap_err();
        match err {
            TriageError::Backend(msg) => assert!(msg.starts_with("Error:")),
            other => panic!("Expected Backend, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn route_is_deterministic_for_fixed_classifier() {
        let r = router(MockTriageLlm::replying(
            r#"{"reasoning": "question", "classification": "respond"}"#,
        ));
        let first = r.route(&question_email()).await.unwrap();
        let second = r.route(&question_email()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn classifier_request_uses_triage_sampling() {
        let llm = MockTriageLlm::replying(r#"{"reasoning": "x", "classification": "ignore"}"#);
        let r = router(llm.clone());
        r.classify(&promo_email()).await.unwrap();

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[1].content.contains("EXCLUSIVE OFFER"));
        assert_eq!(request.temperature, Some(TriageConfig::default().temperature));
        assert_eq!(request.max_tokens, Some(TriageConfig::default().max_tokens));
    }

    #[test]
    fn decide_maps_each_label() {
        let r = router(MockTriageLlm::replying("{}"));
        let email = question_email();
        for (label, node) in [
            (TriageLabel::Respond, Node::ResponseAgent),
            (TriageLabel::Notify, Node::End),
            (TriageLabel::Ignore, Node::End),
        ] {
            let c = Classification {
                reasoning: String::new(),
                label,
            };
            let decision = r.decide(&email, &c);
            assert_eq!(decision.next_node, node);
            assert_eq!(decision.state_update.is_some(), node == Node::ResponseAgent);
        }
    }
}
