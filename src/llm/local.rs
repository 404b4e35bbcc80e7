//! Local provider over an OpenAI-compatible chat-completions server
//! (LM Studio, llama.cpp server, and similar).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::llm::{LanguageModel, SYSTEM_INSTRUCTION};
use crate::net::{DEFAULT_RETRY_ATTEMPTS, default_agent, request_with_retry};

const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct LocalClient {
    base_url: String,
    model: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl LocalClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            base_url: config.llm.local_url.trim_end_matches('/').to_string(),
            model: config.llm.local_model.clone(),
            agent: default_agent(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }
}

impl LanguageModel for LocalClient {
    #[inline]
    fn generate(&self, question: &str, context: &str) -> Result<String> {
        debug!("Generating answer with local model {}", self.model);

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_INSTRUCTION.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Context: {}\n\nQuestion: {}", context, question),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        let response_text = request_with_retry(self.retry_attempts, || {
            self.agent
                .post(&url)
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Chat completion request failed")?;

        let response: ChatCompletionResponse = serde_json::from_str(&response_text)
            .context("Failed to parse chat completion response")?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("Chat completion response contained no choices")?;

        Ok(answer)
    }

    #[inline]
    fn name(&self) -> &'static str {
        "local"
    }
}
