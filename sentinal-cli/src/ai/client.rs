//! Memo completion client
//!
//! One call shape: a system prompt and a user prompt go out, text and token
//! counts come back. Anthropic is reached through its Messages API, every
//! other backend through the OpenAI chat-completions format. Sync HTTP via
//! ureq, so the pipeline needs no async runtime.

use crate::ai::{AiError, AiResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    Messages,
    ChatCompletions,
}

/// Where a backend lives and how it is addressed
struct Endpoint {
    url: &'static str,
    /// Environment variable holding the key; `None` for keyless local servers
    key_var: Option<&'static str>,
    default_model: &'static str,
    protocol: Protocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmBackend {
    #[default]
    Anthropic,
    OpenAi,
    Deepinfra,
    OpenRouter,
    Ollama,
}

impl LlmBackend {
    fn endpoint(self) -> Endpoint {
        let chat = |url: &'static str, key_var: Option<&'static str>, default_model: &'static str| Endpoint {
            url,
            key_var,
            default_model,
            protocol: Protocol::ChatCompletions,
        };
        match self {
            LlmBackend::Anthropic => Endpoint {
                url: "https://api.anthropic.com/v1/messages",
                key_var: Some("ANTHROPIC_API_KEY"),
                default_model: "claude-sonnet-4-20250514",
                protocol: Protocol::Messages,
            },
            LlmBackend::OpenAi => chat(
                "https://api.openai.com/v1/chat/completions",
                Some("OPENAI_API_KEY"),
                "gpt-4o",
            ),
            LlmBackend::Deepinfra => chat(
                "https://api.deepinfra.com/v1/openai/chat/completions",
                Some("DEEPINFRA_API_KEY"),
                "meta-llama/Llama-3.3-70B-Instruct",
            ),
            LlmBackend::OpenRouter => chat(
                "https://openrouter.ai/api/v1/chat/completions",
                Some("OPENROUTER_API_KEY"),
                "anthropic/claude-sonnet-4",
            ),
            LlmBackend::Ollama => chat("http://localhost:11434/v1/chat/completions", None, "llama3.1:8b"),
        }
    }

    pub fn key_var(self) -> Option<&'static str> {
        self.endpoint().key_var
    }

    pub fn default_model(self) -> &'static str {
        self.endpoint().default_model
    }
}

impl FromStr for LlmBackend {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(LlmBackend::Anthropic),
            "openai" => Ok(LlmBackend::OpenAi),
            "deepinfra" => Ok(LlmBackend::Deepinfra),
            "openrouter" => Ok(LlmBackend::OpenRouter),
            "ollama" => Ok(LlmBackend::Ollama),
            other => Err(AiError::ConfigError(format!(
                "unknown backend '{}' (expected anthropic, openai, deepinfra, openrouter or ollama)",
                other
            ))),
        }
    }
}

/// Settings for memo calls, filled from `[report]`
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub backend: LlmBackend,
    /// Backend default when unset
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::default(),
            model: None,
            max_tokens: 2048,
            temperature: 0.2,
            timeout: Duration::from_secs(120),
        }
    }
}

/// USD per million tokens; zero when the operator configured no prices
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pricing {
    pub input_per_1m: f64,
    pub output_per_1m: f64,
}

/// Token counts reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn cost_usd(&self, pricing: Pricing) -> f64 {
        (self.input_tokens as f64 * pricing.input_per_1m
            + self.output_tokens as f64 * pricing.output_per_1m)
            / 1_000_000.0
    }
}

/// Text plus usage from one call
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

pub struct AiClient {
    backend: LlmBackend,
    model: String,
    max_tokens: u32,
    temperature: f32,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl AiClient {
    pub fn new(config: AiConfig, api_key: Option<String>) -> Self {
        let agent = ureq::config::Config::builder()
            .http_status_as_error(false) // mapped to AiError::ApiError
            .timeout_global(Some(config.timeout))
            .build()
            .new_agent();
        Self {
            model: config
                .model
                .unwrap_or_else(|| config.backend.default_model().to_string()),
            backend: config.backend,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            api_key,
            agent,
        }
    }

    /// Client with the key read from the backend's environment variable
    pub fn from_env(config: AiConfig) -> AiResult<Self> {
        let api_key = match config.backend.key_var() {
            Some(var) => Some(
                std::env::var(var).map_err(|_| AiError::MissingApiKey {
                    env_var: var.to_string(),
                })?,
            ),
            None => None,
        };
        Ok(Self::new(config, api_key))
    }

    pub fn backend(&self) -> LlmBackend {
        self.backend
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One system + user exchange
    pub fn complete(&self, system: &str, prompt: &str) -> AiResult<Completion> {
        let endpoint = self.backend.endpoint();
        let mut request = self
            .agent
            .post(endpoint.url)
            .header("Content-Type", "application/json");

        let sent = match endpoint.protocol {
            Protocol::Messages => {
                request = request.header("anthropic-version", ANTHROPIC_VERSION);
                if let Some(key) = &self.api_key {
                    request = request.header("x-api-key", key);
                }
                request.send_json(&MessagesRequest {
                    model: &self.model,
                    max_tokens: self.max_tokens,
                    temperature: self.temperature,
                    system,
                    messages: [Turn::user(prompt)],
                })
            }
            Protocol::ChatCompletions => {
                if let Some(key) = &self.api_key {
                    request = request.header("Authorization", &format!("Bearer {}", key));
                }
                request.send_json(&ChatRequest {
                    model: &self.model,
                    max_tokens: self.max_tokens,
                    temperature: self.temperature,
                    messages: [Turn::system(system), Turn::user(prompt)],
                })
            }
        };
        let response = sent.map_err(|e| AiError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;
        if status >= 400 {
            return Err(AiError::ApiError {
                status,
                message: body,
            });
        }
        parse_completion(endpoint.protocol, &body)
    }
}

fn parse_completion(protocol: Protocol, body: &str) -> AiResult<Completion> {
    let invalid = |e: serde_json::Error| AiError::ParseError(e.to_string());
    let (text, usage) = match protocol {
        Protocol::Messages => {
            let reply: MessagesReply = serde_json::from_str(body).map_err(invalid)?;
            let text: String = reply
                .content
                .into_iter()
                .filter(|block| block.kind == "text")
                .map(|block| block.text)
                .collect();
            (text, reply.usage)
        }
        Protocol::ChatCompletions => {
            let reply: ChatReply = serde_json::from_str(body).map_err(invalid)?;
            let text = reply
                .choices
                .into_iter()
                .find_map(|choice| choice.message.content)
                .unwrap_or_default();
            (text, reply.usage)
        }
    };

    if text.is_empty() {
        return Err(AiError::ParseError("response carried no text".to_string()));
    }
    Ok(Completion {
        text,
        usage: usage.map(TokenUsage::from).unwrap_or_default(),
    })
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> Turn<'a> {
    fn system(content: &'a str) -> Self {
        Self {
            role: "system",
            content,
        }
    }

    fn user(content: &'a str) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Turn<'a>; 1],
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Turn<'a>; 2],
}

/// Both wire formats, under their own field names
#[derive(Deserialize)]
struct WireUsage {
    #[serde(default, alias = "prompt_tokens")]
    input_tokens: u64,
    #[serde(default, alias = "completion_tokens")]
    output_tokens: u64,
}

impl From<WireUsage> for TokenUsage {
    fn from(usage: WireUsage) -> Self {
        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }
}

#[derive(Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("OpenAI".parse::<LlmBackend>().unwrap(), LlmBackend::OpenAi);
        assert_eq!("claude".parse::<LlmBackend>().unwrap(), LlmBackend::Anthropic);
        assert!("gemini".parse::<LlmBackend>().is_err());
    }

    #[test]
    fn test_only_anthropic_uses_messages_api() {
        assert_eq!(LlmBackend::Anthropic.endpoint().protocol, Protocol::Messages);
        for backend in [LlmBackend::OpenAi, LlmBackend::Deepinfra, LlmBackend::OpenRouter, LlmBackend::Ollama] {
            assert_eq!(backend.endpoint().protocol, Protocol::ChatCompletions);
        }
        assert_eq!(LlmBackend::Ollama.key_var(), None);
        assert_eq!(LlmBackend::OpenAi.key_var(), Some("OPENAI_API_KEY"));
    }

    #[test]
    fn test_model_defaults_to_backend() {
        let client = AiClient::new(AiConfig::default(), None);
        assert_eq!(client.model(), "claude-sonnet-4-20250514");

        let config = AiConfig {
            backend: LlmBackend::Ollama,
            model: Some("qwen2.5:14b".to_string()),
            ..Default::default()
        };
        assert_eq!(AiClient::new(config, None).model(), "qwen2.5:14b");
    }

    #[test]
    fn test_chat_reply_with_usage() {
        let body = r#"{"choices":[{"message":{"content":"memo"}}],"usage":{"prompt_tokens":12,"completion_tokens":3}}"#;
        let completion = parse_completion(Protocol::ChatCompletions, body).unwrap();
        assert_eq!(completion.text, "memo");
        assert_eq!(
            completion.usage,
            TokenUsage {
                input_tokens: 12,
                output_tokens: 3
            }
        );
    }

    #[test]
    fn test_messages_reply_joins_text_blocks() {
        let body = r##"{"content":[{"type":"text","text":"# Memo"},{"type":"tool_use"},{"type":"text","text":"\nbody"}],"usage":{"input_tokens":7,"output_tokens":2}}"##;
        let completion = parse_completion(Protocol::Messages, body).unwrap();
        assert_eq!(completion.text, "# Memo\nbody");
        assert_eq!(completion.usage.output_tokens, 2);
    }

    #[test]
    fn test_missing_usage_counts_zero() {
        let body = r#"{"content":[{"type":"text","text":"memo"}]}"#;
        let completion = parse_completion(Protocol::Messages, body).unwrap();
        assert_eq!(completion.usage, TokenUsage::default());
    }

    #[test]
    fn test_reply_without_text_is_error() {
        assert!(matches!(
            parse_completion(Protocol::ChatCompletions, r#"{"choices":[]}"#),
            Err(AiError::ParseError(_))
        ));
        assert!(matches!(
            parse_completion(Protocol::Messages, "not json"),
            Err(AiError::ParseError(_))
        ));
    }

    #[test]
    fn test_cost_per_million_tokens() {
        let usage = TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 100_000,
        };
        let pricing = Pricing {
            input_per_1m: 3.0,
            output_per_1m: 15.0,
        };
        assert!((usage.cost_usd(pricing) - 4.5).abs() < 1e-9);
        assert_eq!(usage.cost_usd(Pricing::default()), 0.0);
    }
}
