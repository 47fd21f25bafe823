//! Chat-completions client with tool calling and streamed final answers.

use std::io::Write;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::provider::{AgentConfig, Provider};

#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    pub function: ToolFunction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    /// JSON-encoded argument object.
    #[serde(default)]
    pub arguments: String,
}

/// One assistant turn: text, tool calls, or both.
#[derive(Debug, Default)]
pub struct ChatOutcome {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    /// Raw assistant message, replayed into the history verbatim so the
    /// provider sees its own tool_calls shape back.
    pub raw_message: Value,
}

pub struct ChatClient {
    config: AgentConfig,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(config: AgentConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn provider(&self) -> Provider {
        self.config.provider
    }

    fn request(&self, body: &Value) -> reqwest::RequestBuilder {
        let mut request = self.client.post(&self.config.chat_url).json(body);
        if let Some(key) = &self.config.api_key {
            request = match self.config.provider {
                Provider::Azure => request.header("api-key", key),
                Provider::Ollama => request.bearer_auth(key),
            };
        }
        request
    }

    /// One non-streamed turn, with tool schemas offered to the model.
    pub async fn chat(
        &self,
        messages: &[Value],
        tools: Option<&[Value]>,
    ) -> Result<ChatOutcome, LlmError> {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false,
        });
        if let Some(tools) = tools {
            body["tools"] = Value::Array(tools.to_vec());
        }

        let response = self
            .request(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::Http(format!("{}: {}", status, detail)));
        }
        let parsed: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        parse_chat_response(&parsed)
    }

    /// Streamed turn: prints content deltas as they arrive and returns
    /// the accumulated text.
    pub async fn chat_stream(&self, messages: &[Value]) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": true,
        });

        let response = self
            .request(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::Http(format!("{}: {}", status, detail)));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut full_text = String::new();
        let mut stdout = std::io::stdout();

        'outer: while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::Http(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);
                match parse_stream_line(&line) {
                    StreamEvent::Delta(text) => {
                        print!("{}", text);
                        let _ = stdout.flush();
                        full_text.push_str(&text);
                    }
                    StreamEvent::Done => break 'outer,
                    StreamEvent::Ignore => {}
                }
            }
        }
        println!();
        Ok(full_text)
    }
}

/// Extract content and tool calls from a non-streamed response.
fn parse_chat_response(parsed: &Value) -> Result<ChatOutcome, LlmError> {
    let message = parsed
        .pointer("/choices/0/message")
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message".to_string()))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let tool_calls = match message.get("tool_calls") {
        Some(raw) => serde_json::from_value::<Vec<ToolCall>>(raw.clone())
            .map_err(|e| LlmError::InvalidResponse(format!("bad tool_calls: {}", e)))?,
        None => Vec::new(),
    };

    debug!(
        tool_calls = tool_calls.len(),
        has_content = content.is_some(),
        "assistant turn parsed"
    );
    Ok(ChatOutcome {
        content,
        tool_calls,
        raw_message: message.clone(),
    })
}

#[derive(Debug, PartialEq)]
enum StreamEvent {
    Delta(String),
    Done,
    Ignore,
}

/// Parse one SSE line of a streamed chat response.
fn parse_stream_line(line: &str) -> StreamEvent {
    let Some(payload) = line.strip_prefix("data:").map(str::trim) else {
        return StreamEvent::Ignore;
    };
    if payload == "[DONE]" {
        return StreamEvent::Done;
    }
    let Ok(parsed) = serde_json::from_str::<Value>(payload) else {
        return StreamEvent::Ignore;
    };
    match parsed
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
    {
        Some(text) if !text.is_empty() => StreamEvent::Delta(text.to_string()),
        _ => StreamEvent::Ignore,
    }
}
