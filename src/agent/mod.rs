//! LLM agent modules for company research.
//!
//! This module provides the chat client, the Sectors tools and the
//! tool-calling agent runner.

pub mod agent_loop;
pub mod llm;
pub mod tools;

pub use agent_loop::{AgentRunner, AgentSpec, TaskExecutor};
pub use llm::OpenAiChat;
pub use tools::SectorsTools;
