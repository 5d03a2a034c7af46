//! [`Notifier`] over the Telegram Bot API `sendMessage` method.

use std::time::Duration;

use async_trait::async_trait;
use feedwatch_core::{DeliveryError, Notifier};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    http: Client,
    api_url: String,
    token: String,
}

impl TelegramNotifier {
    /// # Errors
    ///
    /// Returns [`DeliveryError::Request`] if the HTTP client cannot be built.
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Request(e.to_string()))?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: Option<&'static str>,
    ) -> Result<(), DeliveryError> {
        let body = SendMessage {
            chat_id,
            text,
            parse_mode,
            disable_web_page_preview: true,
        };
        let response = self
            .http
            .post(format!("{}/bot{}/sendMessage", self.api_url, self.token))
            .json(&body)
            .send()
            .await
            // The URL carries the bot token.
            .map_err(|e| DeliveryError::Request(e.without_url().to_string()))?;

        let status = response.status();
        let parsed: Option<ApiResponse> = response.json().await.ok();
        match parsed {
            Some(api) if api.ok && status.is_success() => Ok(()),
            Some(api) => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: api
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            }),
            None => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: "unreadable response body".to_string(),
            }),
        }
    }
}

fn is_markdown_rejection(err: &DeliveryError) -> bool {
    matches!(
        err,
        DeliveryError::Rejected { status: 400, description }
            if description.contains("can't parse entities")
    )
}

#[async_trait]
impl Notifier for TelegramNotifier {
    /// Sends `text` as Markdown. If Telegram cannot parse the markup, the
    /// message is resent once as plain text.
    async fn send(&self, sink: &str, text: &str) -> Result<(), DeliveryError> {
        let chat_id = sink.trim();
        if chat_id.is_empty() {
            return Err(DeliveryError::InvalidTarget(sink.to_string()));
        }

        match self.send_message(chat_id, text, Some("Markdown")).await {
            Err(e) if is_markdown_rejection(&e) => {
                tracing::warn!(chat_id, error = %e, "notifier: markdown rejected, resending as plain text");
                self.send_message(chat_id, text, None).await
            }
            other => other,
        }
    }
}
