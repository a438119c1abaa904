//! Telegram Bot API notifier
//!
//! Direct Bot API implementation: `sendMessage` for new progress messages
//! and `editMessageText` to update them in place.

use crate::error::{NotifyError, Result};
use crate::notifier::{MessageHandle, Notifier};
use async_trait::async_trait;
use serde::Deserialize;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const MESSAGE_TITLE: &str = "🔰*capgrab*";

/// Configuration for the Telegram notifier
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
    pub proxy: Option<String>,
    pub api_base: String,
}

impl TelegramConfig {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            chat_id: chat_id.into(),
            proxy: None,
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

/// Telegram notifier
pub struct TelegramNotifier {
    client: reqwest::Client,
    config: TelegramConfig,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    result: Option<ApiMessage>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message_id: i64,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        if config.token.is_empty() || config.chat_id.is_empty() {
            return Err(NotifyError::InvalidConfig(
                "token and chat-id are required".to_string(),
            ));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(ref proxy) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| NotifyError::InvalidConfig(format!("proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.token,
            method
        )
    }

    fn body(context: &str, text: &str) -> String {
        if context.is_empty() {
            format!("{}\n{}", MESSAGE_TITLE, text)
        } else {
            format!("{} {}\n{}", MESSAGE_TITLE, context, text)
        }
    }

    async fn call(&self, method: &str, form: &[(&str, &str)]) -> Result<ApiResponse> {
        tracing::debug!("Telegram {}", method);
        let response = self.client.post(self.url(method)).form(form).send().await?;

        // Telegram answers errors with a JSON body and a 4xx status
        let api_response: ApiResponse = response.json().await?;
        if !api_response.ok {
            return Err(NotifyError::Api(
                api_response
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }
        Ok(api_response)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, context: &str, text: &str) -> Result<MessageHandle> {
        let body = Self::body(context, text);
        let response = self
            .call(
                "sendMessage",
                &[
                    ("parse_mode", "Markdown"),
                    ("chat_id", self.config.chat_id.as_str()),
                    ("text", body.as_str()),
                ],
            )
            .await?;

        Ok(response
            .result
            .map(|m| MessageHandle::new(m.message_id))
            .unwrap_or_default())
    }

    async fn edit(&self, handle: &MessageHandle, context: &str, text: &str) -> Result<()> {
        let message_id = handle.message_id.ok_or(NotifyError::Detached)?.to_string();
        let body = Self::body(context, text);
        self.call(
            "editMessageText",
            &[
                ("parse_mode", "Markdown"),
                ("chat_id", self.config.chat_id.as_str()),
                ("message_id", message_id.as_str()),
                ("text", body.as_str()),
            ],
        )
        .await?;
        Ok(())
    }
}
