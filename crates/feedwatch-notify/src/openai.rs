//! [`Summarizer`] over an OpenAI-compatible `/chat/completions` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use feedwatch_core::{Summarizer, SummaryError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiSummarizer {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiSummarizer {
    /// Creates a summarizer for `base_url` (e.g. `https://api.openai.com/v1`).
    ///
    /// A missing `api_key` is not an error here; every call then fails with
    /// [`SummaryError::NotConfigured`] so the caller falls back.
    ///
    /// # Errors
    ///
    /// Returns [`SummaryError::Request`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SummaryError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SummaryError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(
        &self,
        content: &str,
        prompt: &str,
        model: &str,
    ) -> Result<String, SummaryError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SummaryError::NotConfigured(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        };

        let request = ChatRequest {
            model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: prompt,
                },
                WireMessage {
                    role: "user",
                    content,
                },
            ],
        };

        tracing::debug!(model, chars = content.len(), "summarizer: chat request");
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SummaryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummaryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummaryError::Request(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(SummaryError::Empty)
    }
}
