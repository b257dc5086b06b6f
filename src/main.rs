use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use triage_assist::agent::ResponseAgent;
use triage_assist::config::Config;
use triage_assist::error::GraphError;
use triage_assist::graph::{Conversation, EmailGraph};
use triage_assist::llm::{CompletionClient, create_provider};
use triage_assist::tools::builtin::default_registry;
use triage_assist::triage::{Email, TriageRouter};

const DEMO_BODY: &str = "Dear Valued Developer,

Don't miss out on this INCREDIBLE opportunity!

For a LIMITED TIME ONLY, get 80% OFF on our Premium Developer Suite!

FEATURES:
- Revolutionary AI-powered code completion
- Cloud-based development environment
- 24/7 customer support
- And much more!

Regular Price: $999/month
YOUR SPECIAL PRICE: Just $199/month!

Hurry! This offer expires in:
24 HOURS ONLY!

Click here to claim your discount: https://amazingdeals.com/special-offer

Best regards,
Marketing Team
---
To unsubscribe, click here
";

fn demo_email() -> Email {
    Email::new(
        "Marketing Team <marketing@amazingdeals.com>",
        "John Doe <john.doe@company.com>",
        "EXCLUSIVE OFFER: Limited Time Discount on Developer Tools!",
        DEMO_BODY,
    )
}

/// Read one email, or an array of emails, from a JSON file.
fn load_emails(path: &Path) -> anyhow::Result<Vec<Email>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))?;
    let emails = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(emails)
}

fn print_result(email: &Email, result: &Result<Conversation, GraphError>) -> bool {
    println!("=== {} ===", email.subject);
    match result {
        Ok(conversation) if conversation.is_empty() => {
            println!("(no reply drafted)\n");
            true
        }
        Ok(conversation) => {
            println!("{conversation}");
            true
        }
        Err(e) => {
            eprintln!("Error in {} stage: {e}\n", e.stage());
            false
        }
    }
}

/// Wire provider, tools, router and agent into the email graph.
fn build_graph(config: &Config) -> triage_assist::error::Result<EmailGraph> {
    let llm = create_provider(&config.llm)?;
    let tools = Arc::new(default_registry());

    let router = TriageRouter::new(CompletionClient::new(Arc::clone(&llm)), config.triage.clone());
    let agent = ResponseAgent::new(llm, tools, &config.agent);
    let graph = EmailGraph::builder()
        .triage_router(router)
        .response_agent(agent)
        .build()?;
    Ok(graph)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    eprintln!("Triage Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Endpoint: {}", config.llm.base_url);
    eprintln!("   Agent: {}\n", config.agent.name);

    let graph = build_graph(&config)?;

    let emails = match std::env::args().nth(1) {
        Some(path) => load_emails(Path::new(&path))?,
        None => vec![demo_email()],
    };

    let results = graph.run_batch(&emails).await;
    let mut all_ok = true;
    for (email, result) in emails.iter().zip(&results) {
        all_ok &= print_result(email, result);
    }

    if !all_ok {
        std::process::exit(1);
    }
    Ok(())
}
