//! The email graph runtime.
//!
//! Edges:
//! - start → triage_router
//! - triage_router → response_agent | end (per `RouteDecision`)
//! - response_agent → end

use tracing::{error, info};
use uuid::Uuid;

use crate::agent::ResponseAgent;
use crate::error::GraphError;
use crate::graph::{Conversation, Node};
use crate::triage::{Email, RouteDecision, TriageRouter};

/// Compiled email graph.
pub struct EmailGraph {
    router: TriageRouter,
    response_agent: Option<ResponseAgent>,
}

/// Builder for [`EmailGraph`].
#[derive(Default)]
pub struct EmailGraphBuilder {
    router: Option<TriageRouter>,
    response_agent: Option<ResponseAgent>,
}

impl EmailGraphBuilder {
    pub fn triage_router(mut self, router: TriageRouter) -> Self {
        self.router = Some(router);
        self
    }

    pub fn response_agent(mut self, agent: ResponseAgent) -> Self {
        self.response_agent = Some(agent);
        self
    }

    /// Finish the graph. The triage router is the entry node and is required.
    pub fn build(self) -> Result<EmailGraph, GraphError> {
        let router = self.router.ok_or_else(|| GraphError::MissingNode {
            node: Node::TriageRouter.to_string(),
        })?;
        Ok(EmailGraph {
            router,
            response_agent: self.response_agent,
        })
    }
}

impl EmailGraph {
    pub fn builder() -> EmailGraphBuilder {
        EmailGraphBuilder::default()
    }

    /// Nodes present in this graph.
    pub fn nodes(&self) -> Vec<Node> {
        let mut nodes = vec![Node::TriageRouter];
        if self.response_agent.is_some() {
            nodes.push(Node::ResponseAgent);
        }
        nodes.push(Node::End);
        nodes
    }

    pub fn contains(&self, node: Node) -> bool {
        match node {
            Node::TriageRouter | Node::End => true,
            Node::ResponseAgent => self.response_agent.is_some(),
        }
    }

    /// Process one email start to finish.
    ///
    /// Returns every message appended during the run. An email that ends at
    /// triage yields an empty conversation.
    pub async fn run(&self, email: &Email) -> Result<Conversation, GraphError> {
        let run_id = Uuid::new_v4();
        info!(%run_id, author = %email.author, subject = %email.subject, "Graph run started");

        let result = self.run_inner(email).await;
        match &result {
            Ok(conversation) => info!(
                %run_id,
                messages = conversation.len(),
                "Graph run finished"
            ),
            Err(e) => error!(%run_id, stage = e.stage(), error = %e, "Graph run failed"),
        }
        result
    }

    /// Process emails one after another, each with its own conversation.
    ///
    /// A failure on one email does not stop the rest.
    pub async fn run_batch(&self, emails: &[Email]) -> Vec<Result<Conversation, GraphError>> {
        info!(count = emails.len(), "Processing email batch");
        let mut results = Vec::with_capacity(emails.len());
        for email in emails {
            results.push(self.run(email).await);
        }
        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(total = emails.len(), failed, "Batch processing complete");
        results
    }

    async fn run_inner(&self, email: &Email) -> Result<Conversation, GraphError> {
        let mut conversation = Conversation::new();

        let decision = self.router.route(email).await?;
        let next = self.transition(Node::TriageRouter, decision, &mut conversation)?;

        if next == Node::ResponseAgent {
            let agent = self
                .response_agent
                .as_ref()
                .ok_or_else(|| GraphError::InvalidNodeReference {
                    node: Node::ResponseAgent.to_string(),
                })?;
            agent.run(&mut conversation).await?;
            self.transition(Node::ResponseAgent, RouteDecision::end(), &mut conversation)?;
        }

        Ok(conversation)
    }

    /// Validate a decision leaving `from` and apply its state update.
    fn transition(
        &self,
        from: Node,
        decision: RouteDecision,
        conversation: &mut Conversation,
    ) -> Result<Node, GraphError> {
        let to = decision.next_node;
        if !self.contains(to) {
            return Err(GraphError::InvalidNodeReference {
                node: to.to_string(),
            });
        }
        if !from.has_edge_to(to) {
            return Err(GraphError::InvalidEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        match decision.state_update {
            Some(_) if to == Node::End => return Err(GraphError::TerminalUpdate),
            Some(update) => conversation.extend(update),
            None => {}
        }
        Ok(to)
    }
}
