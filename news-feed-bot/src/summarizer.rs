use crate::traits::Summarizer;
use crate::types::{BotError, Result};
use crate::utils::text::trim_to_last_sentence;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Chat-completion backed summarizer.
///
/// Without an API key the summarizer is disabled: every call returns an empty
/// summary and the article is published with title and link only.
pub struct OpenAiSummarizer {
    http: reqwest::Client,
    api_key: Option<String>,
    prompt: String,
    model: String,
    base_url: String,
}

impl OpenAiSummarizer {
    pub fn new(http: reqwest::Client, api_key: Option<String>, prompt: impl Into<String>) -> Self {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        info!("OpenAI summarizer enabled: {}", api_key.is_some());

        Self {
            http,
            api_key,
            prompt: prompt.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    /// A summarizer that always yields an empty summary.
    pub fn disabled() -> Self {
        Self::new(reqwest::Client::new(), None, "")
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!("Summarizer is disabled, returning empty summary");
            return Ok(String::new());
        };

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "system".to_string(),
                content: Some(format!("{}{}", text, self.prompt)),
            }],
            max_tokens: 256,
            temperature: 0.7,
            top_p: 1.0,
        };

        debug!(model = %self.model, "OpenAI chat request");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BotError::Summarizer(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await?;
        let raw_summary = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BotError::Summarizer("No choices in OpenAI response".to_string()))?;

        Ok(trim_to_last_sentence(&raw_summary))
    }

    fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}
