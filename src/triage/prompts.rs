//! Prompt construction for the triage classifier and the reply hand-off.

use crate::config::{TriageConfig, TriageRules};
use crate::triage::types::{Email, TriageExample};

/// Maximum characters of thread body rendered into a prompt.
const MAX_BODY_CHARS: usize = 4000;

/// Build the triage system prompt from the rules and few-shot examples.
pub fn build_triage_system_prompt(config: &TriageConfig) -> String {
    let TriageRules {
        ignore,
        notify,
        respond,
    } = &config.rules;

    let mut prompt = format!(
        "You are an email triage assistant. Classify each incoming email into exactly one category.\n\n\
         Categories:\n\
         - \"ignore\": {ignore}\n\
         - \"notify\": {notify}\n\
         - \"respond\": {respond}\n\n\
         Respond with ONLY a JSON object:\n\
         {{\"reasoning\": \"<step-by-step reasoning>\", \"classification\": \"ignore\" | \"notify\" | \"respond\"}}"
    );

    if !config.examples.is_empty() {
        prompt.push_str("\n\nHere are some examples of previous emails and how they were classified:\n");
        for example in &config.examples {
            prompt.push('\n');
            prompt.push_str(&render_example(example));
        }
    }

    prompt
}

/// Build the triage user prompt from an email.
pub fn build_triage_user_prompt(email: &Email) -> String {
    format!(
        "Please determine how to handle the email thread below.\n\n{}",
        render_email(email)
    )
}

/// Instruction handed to the response agent for an email that needs a reply.
pub fn build_response_instruction(email: &Email) -> String {
    format!("Respond to the email below.\n\n{}", render_email(email))
}

fn render_email(email: &Email) -> String {
    let body: String = email.thread_body.chars().take(MAX_BODY_CHARS).collect();
    let truncated = if email.thread_body.chars().count() > MAX_BODY_CHARS {
        "\n[... truncated]"
    } else {
        ""
    };
    format!(
        "From: {}\nTo: {}\nSubject: {}\n\n{}{}",
        email.author, email.recipient, email.subject, body, truncated
    )
}

fn render_example(example: &TriageExample) -> String {
    format!(
        "<email>\n{}\n</email>\nClassification: {}\n",
        render_email(&example.email),
        example.label
    )
}
