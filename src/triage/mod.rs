//! Email triage.
//!
//! Every inbound email gets exactly one classification:
//! - `ignore`: end the run, log only
//! - `notify`: end the run, raise an alert through the `Notifier`
//! - `respond`: hand off to the response agent with a reply instruction

pub mod notify;
pub mod prompts;
pub mod router;
pub mod types;

pub use notify::{LogNotifier, Notifier};
pub use router::{TriageRouter, parse_classification};
pub use types::{Classification, Email, RouteDecision, TriageExample, TriageLabel};
