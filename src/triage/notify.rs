//! Side effect for emails classified as `notify`.
//!
//! Notify and ignore share control flow (both end the run). They differ only
//! in that notify raises an alert through a `Notifier`.

use async_trait::async_trait;

use crate::triage::types::{Classification, Email};

/// Receives alerts for emails the user should see.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, email: &Email, classification: &Classification);
}

/// Notifier that emits a structured `tracing` event on the
/// `triage_assist::notify` target.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, email: &Email, classification: &Classification) {
        tracing::warn!(
            target: "triage_assist::notify",
            author = %email.author,
            subject = %email.subject,
            reasoning = %classification.reasoning,
            "Important email needs your attention"
        );
    }
}
