//! Gemini provider over the Google Generative Language REST API.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::llm::{LanguageModel, SYSTEM_INSTRUCTION, build_prompt};
use crate::net::{DEFAULT_RETRY_ATTEMPTS, default_agent, request_with_retry};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_base: String,
    api_key: String,
    model: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    /// Zero disables thinking; answers come straight from the context.
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

impl GeminiClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .gemini_api_key()
            .context("Gemini API key is not configured (set GEMINI_API_KEY or llm.gemini_api_key)")?;

        Ok(Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key,
            model: config.llm.gemini_model.clone(),
            agent: default_agent(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    /// Point the client at a different API base (used by tests).
    #[inline]
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }
}

impl LanguageModel for GeminiClient {
    #[inline]
    fn generate(&self, question: &str, context: &str) -> Result<String> {
        debug!("Generating answer with Gemini model {}", self.model);

        let request = GenerateContentRequest {
            system_instruction: Content {
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(question, context),
                }],
            }],
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };

        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize Gemini request")?;

        let response_text = request_with_retry(self.retry_attempts, || {
            self.agent
                .post(&url)
                .header("Content-Type", "application/json")
                .header("x-goog-api-key", &self.api_key)
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Gemini generate request failed")?;

        let response: GenerateContentResponse =
            serde_json::from_str(&response_text).context("Failed to parse Gemini response")?;

        let answer = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .context("Gemini response contained no candidates")?;

        Ok(answer)
    }

    #[inline]
    fn name(&self) -> &'static str {
        "gemini"
    }
}
