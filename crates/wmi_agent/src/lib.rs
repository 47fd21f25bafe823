//! wmi_agent - Natural-language front end over the WMI dispatch pipeline.
//!
//! The agent exposes the same builtin commands as wmictl to an LLM as
//! tool calls, over either a local Ollama server or Azure OpenAI.

pub mod llm;
pub mod provider;
pub mod repl;
pub mod tools;

pub use llm::{ChatClient, LlmError};
pub use provider::{AgentConfig, Provider};
pub use repl::AgentSession;
pub use tools::{tool_schemas, ToolRouter};
