//! LLM provider configuration.
//!
//! Two providers are supported, both speaking the OpenAI-compatible chat
//! completions API: Ollama (local) and Azure OpenAI (cloud). Resolution
//! order is CLI override, then environment, then defaults.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    Azure,
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "azure" => Ok(Provider::Azure),
            other => Err(format!(
                "unsupported provider '{}': use 'ollama' or 'azure'",
                other
            )),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Ollama => write!(f, "ollama"),
            Provider::Azure => write!(f, "azure"),
        }
    }
}

/// Resolved agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub provider: Provider,
    pub model: String,
    /// Full chat-completions URL.
    pub chat_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl AgentConfig {
    /// Resolve from CLI overrides plus environment.
    pub fn resolve(
        provider: Option<Provider>,
        model: Option<String>,
        endpoint: Option<String>,
    ) -> Result<Self> {
        let provider = match provider {
            Some(p) => p,
            None => std::env::var("AGENT_PROVIDER")
                .unwrap_or_else(|_| "ollama".to_string())
                .parse()
                .map_err(|e: String| anyhow!(e))?,
        };

        match provider {
            Provider::Ollama => {
                let model = model
                    .or_else(|| std::env::var("OLLAMA_MODEL").ok())
                    .unwrap_or_else(|| "gpt-oss:120b".to_string());
                let endpoint = endpoint
                    .or_else(|| std::env::var("OLLAMA_ENDPOINT").ok())
                    .unwrap_or_else(|| "http://localhost:11434/v1".to_string());
                Ok(Self {
                    provider,
                    model,
                    chat_url: format!("{}/chat/completions", endpoint.trim_end_matches('/')),
                    // Ollama ignores the key but the API requires a header.
                    api_key: Some("ollama".to_string()),
                    timeout_secs: 120,
                })
            }
            Provider::Azure => {
                let endpoint = endpoint
                    .or_else(|| std::env::var("AZURE_OPENAI_ENDPOINT").ok())
                    .ok_or_else(|| {
                        anyhow!("for the azure provider, AZURE_OPENAI_ENDPOINT is required")
                    })?;
                let deployment = model
                    .or_else(|| std::env::var("AZURE_OPENAI_DEPLOYMENT").ok())
                    .ok_or_else(|| {
                        anyhow!("for the azure provider, AZURE_OPENAI_DEPLOYMENT is required")
                    })?;
                let api_key = std::env::var("AZURE_OPENAI_API_KEY").map_err(|_| {
                    anyhow!("for the azure provider, AZURE_OPENAI_API_KEY is required")
                })?;
                let api_version = std::env::var("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|_| "2024-08-01-preview".to_string());
                Ok(Self {
                    provider,
                    chat_url: format!(
                        "{}/openai/deployments/{}/chat/completions?api-version={}",
                        endpoint.trim_end_matches('/'),
                        deployment,
                        api_version
                    ),
                    model: deployment,
                    api_key: Some(api_key),
                    timeout_secs: 120,
                })
            }
        }
    }
}
