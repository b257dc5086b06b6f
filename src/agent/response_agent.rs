//! Response agent: bounded LLM → tool → LLM loop.
//!
//! States: `AwaitingModel` → `ExecutingTools` → `AwaitingModel` … → `Done`.
//! `max_iterations` caps tool-execution rounds; a model still asking for
//! tools after that many rounds fails the run instead of being cut off.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::graph::Conversation;
use crate::llm::{
    ChatMessage, LlmProvider, Reasoning, ReasoningContext, RespondResult, TokenUsage, ToolCall,
};
use crate::tools::ToolRegistry;

/// Loop state of the response agent.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    AwaitingModel,
    ExecutingTools(Vec<ToolCall>),
    Done(String),
}

/// Summary of a finished agent run.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Content of the final assistant message.
    pub reply: String,
    pub model_calls: usize,
    pub tool_rounds: usize,
    pub usage: TokenUsage,
}

/// Tool-using agent that drafts and sends replies.
pub struct ResponseAgent {
    reasoning: Reasoning,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
    name: String,
}

impl ResponseAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: &AgentConfig) -> Self {
        let reasoning = Reasoning::new(llm)
            .with_system_prompt(config.system_prompt())
            .with_sampling(config.temperature, config.max_tokens);
        Self {
            reasoning,
            tools,
            max_iterations: config.max_iterations,
            name: config.name.clone(),
        }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.reasoning.system_prompt()
    }

    /// Run the loop on `conversation`, returning the final reply.
    pub async fn run(&self, conversation: &mut Conversation) -> Result<String, AgentError> {
        self.execute(conversation).await.map(|run| run.reply)
    }

    /// Run standalone on a fresh conversation seeded with `request`.
    pub async fn respond(&self, request: &str) -> Result<(String, Conversation), AgentError> {
        let mut conversation = Conversation::new();
        conversation.push(ChatMessage::user(request));
        let reply = self.run(&mut conversation).await?;
        Ok((reply, conversation))
    }

    /// Run the loop and report call counts and token usage.
    ///
    /// Appends every assistant turn and tool result to `conversation`.
    pub async fn execute(&self, conversation: &mut Conversation) -> Result<AgentRun, AgentError> {
        let tools = self.tools.tool_definitions().await;
        let metadata = HashMap::from([("agent".to_string(), self.name.clone())]);

        let mut model_calls = 0usize;
        let mut tool_rounds = 0usize;
        let mut usage = TokenUsage::default();
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    let ctx = ReasoningContext::new()
                        .with_messages(conversation.messages().to_vec())
                        .with_tools(tools.clone())
                        .with_metadata(metadata.clone());

                    model_calls += 1;
                    let output = self.reasoning.respond_with_tools(&ctx).await?;
                    usage.input_tokens += output.usage.input_tokens;
                    usage.output_tokens += output.usage.output_tokens;

                    match output.result {
                        RespondResult::Text(reply) => {
                            conversation.push(ChatMessage::assistant(&reply));
                            LoopState::Done(reply)
                        }
                        RespondResult::ToolCalls {
                            tool_calls,
                            content,
                        } => {
                            if tool_rounds >= self.max_iterations {
                                error!(
                                    max_iterations = self.max_iterations,
                                    model_calls, "Response agent exceeded its iteration budget"
                                );
                                return Err(AgentError::IterationBudgetExceeded {
                                    max_iterations: self.max_iterations,
                                });
                            }
                            debug!(
                                count = tool_calls.len(),
                                iteration = tool_rounds + 1,
                                "Model requested tool calls"
                            );
                            conversation.push(ChatMessage::assistant_with_tool_calls(
                                content,
                                tool_calls.clone(),
                            ));
                            LoopState::ExecutingTools(tool_calls)
                        }
                    }
                }
                LoopState::ExecutingTools(tool_calls) => {
                    tool_rounds += 1;
                    for call in tool_calls {
                        let result = self.execute_tool(&call).await;
                        conversation.push(ChatMessage::tool_result(call.id, call.name, result));
                    }
                    LoopState::AwaitingModel
                }
                LoopState::Done(reply) => {
                    info!(
                        model_calls,
                        tool_rounds,
                        tokens = usage.total(),
                        "Response agent finished"
                    );
                    return Ok(AgentRun {
                        reply,
                        model_calls,
                        tool_rounds,
                        usage,
                    });
                }
            };
        }
    }

    /// Execute one tool call. Failures become the tool result text so the
    /// model can react to them.
    async fn execute_tool(&self, call: &ToolCall) -> String {
        match self.tools.invoke(&call.name, &call.arguments).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                format!("Error: {e}")
            }
        }
    }
}
