//! Agent loop for tool-based research tasks.
//!
//! An agent is declared by its instructions, the tools it may reach and
//! the shape of its final answer. The runner drives the chat model until
//! it stops calling tools, executing each call through a `ToolExecutor`
//! scoped to the agent's toolset.

use crate::agent::llm::{ChatMessage, ChatModel};
use crate::agent::tools::{SectorsTools, ToolExecutor, ToolKind};
use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

/// Declared shape of an agent's final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    Text,
    StringList,
}

impl OutputShape {
    fn directive(&self) -> &'static str {
        match self {
            OutputShape::Text => "When you are done, answer in plain text.",
            OutputShape::StringList => {
                "When you are done, respond with only a JSON array of strings, for example [\"AAA\", \"BBB\"]. Do not add any other text."
            }
        }
    }

    /// Interpret the model's final message.
    ///
    /// List answers that are not valid JSON are kept as a string so the
    /// caller can reject them.
    pub fn parse(&self, content: &str) -> Value {
        match self {
            OutputShape::Text => Value::String(content.trim().to_string()),
            OutputShape::StringList => {
                let body = strip_code_fence(content);
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(content.to_string()))
            }
        }
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Declarative description of an agent.
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub name: String,
    pub instructions: String,
    pub tools: Vec<ToolKind>,
    pub output: OutputShape,
}

impl AgentSpec {
    /// Agent that turns screening criteria into a ranked list of tickers.
    pub fn ranking() -> Self {
        Self {
            name: "get_top_companies_based_on_metric".to_string(),
            instructions: "Get the top companies based on the given metric. Return the tickers of the top companies. Return in a List.".to_string(),
            tools: vec![ToolKind::TopCompaniesRanked],
            output: OutputShape::StringList,
        }
    }

    /// Agent that researches a single ticker.
    pub fn research() -> Self {
        Self {
            name: "company_research_agent".to_string(),
            instructions: "Research the company by using the right tool".to_string(),
            tools: vec![ToolKind::CompanyOverview],
            output: OutputShape::Text,
        }
    }

    fn system_prompt(&self) -> String {
        format!("{}\n\n{}", self.instructions, self.output.directive())
    }
}

/// Final result of one agent run.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutput {
    pub final_output: Value,
    /// Number of tool calls executed during the run.
    pub tool_calls: usize,
}

/// Runs an agent on one input.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, agent: &AgentSpec, input: &str) -> Result<AgentOutput>;
}

/// Tool-calling runner backed by a chat model and the Sectors tools.
pub struct AgentRunner {
    model: Arc<dyn ChatModel>,
    tools: Arc<SectorsTools>,
    max_iterations: usize,
}

impl AgentRunner {
    pub fn new(model: Arc<dyn ChatModel>, tools: Arc<SectorsTools>, max_iterations: usize) -> Self {
        info!(
            "Initializing agent runner with model {}",
            model.model_name()
        );

        Self {
            model,
            tools,
            max_iterations,
        }
    }

    async fn run_loop(&self, agent: &AgentSpec, input: &str) -> Result<AgentOutput> {
        let executor = ToolExecutor::new(self.tools.clone(), agent.tools.clone());
        let definitions = executor.definitions();

        let mut messages = vec![
            ChatMessage::system(agent.system_prompt()),
            ChatMessage::user(input),
        ];
        let mut tool_calls = 0;

        for iteration in 0..self.max_iterations {
            debug!("Agent {} iteration {}", agent.name, iteration + 1);

            let turn = self.model.chat(&messages, &definitions).await?;
            messages.push(ChatMessage::assistant(&turn));

            if turn.tool_calls.is_empty() {
                let content = turn.content.unwrap_or_default();
                debug!("Agent {} finished after {} tool calls", agent.name, tool_calls);
                return Ok(AgentOutput {
                    final_output: agent.output.parse(&content),
                    tool_calls,
                });
            }

            for call in &turn.tool_calls {
                let result = executor.execute(call).await?;
                messages.push(ChatMessage::tool(&call.id, result.to_message_content()));
                tool_calls += 1;

                info!("Tool {} executed", call.function.name);
            }
        }

        Err(ScoutError::Agent(format!(
            "{} did not produce a final answer within {} iterations",
            agent.name, self.max_iterations
        )))
    }
}

#[async_trait]
impl TaskExecutor for AgentRunner {
    async fn execute(&self, agent: &AgentSpec, input: &str) -> Result<AgentOutput> {
        let span = info_span!("agent", name = %agent.name);
        self.run_loop(agent, input).instrument(span).await
    }
}
