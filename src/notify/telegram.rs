// src/notify/telegram.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{Notifier, TransportError};
use crate::config::credentials::TelegramCredentials;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Bot API `sendMessage` transport. One attempt per `send`; retries belong to
/// the governor.
#[derive(Clone)]
pub struct TelegramNotifier {
    api_base: String,
    credentials: TelegramCredentials,
    client: Client,
    timeout: Duration,
}

impl TelegramNotifier {
    pub fn new(credentials: TelegramCredentials, client: Client) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            credentials,
            client,
            timeout: Duration::from_secs(25),
        }
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs.max(1));
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base, self.credentials.bot_token
        )
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize, Default)]
struct ApiErrorBody {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Deserialize, Default)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        let payload = SendMessage {
            chat_id: &self.credentials.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let rsp = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            // The URL carries the token; keep it out of error text.
            .map_err(|e| {
                TransportError::transient(format!("telegram request failed: {}", e.without_url()))
            })?;

        let status = rsp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = rsp.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

/// 429 and 5xx are transient; any other non-2xx status is permanent.
pub fn classify_status(status: StatusCode, body: &str) -> TransportError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let description = parsed
        .description
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
    let message = format!("telegram HTTP {}: {}", status.as_u16(), description);

    if status == StatusCode::TOO_MANY_REQUESTS {
        return TransportError::Transient {
            message,
            retry_after: parsed
                .parameters
                .and_then(|p| p.retry_after)
                .map(Duration::from_secs),
        };
    }
    if status.is_server_error() {
        return TransportError::Transient {
            message,
            retry_after: None,
        };
    }
    TransportError::Permanent { message }
}
