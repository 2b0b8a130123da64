// src/notify/telegram.rs
use reqwest::Client;
use serde::Serialize;

use super::Notifier;
use crate::config::TelegramConfig;
use crate::error::{snippet, DeliveryError};
use crate::http::{send_with_retry, USER_AGENT};

/// Telegram Bot API `sendMessage` sink. The bot token lives in the URL path,
/// so the URL is never logged.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    url: String,
    chat_id: String,
    cfg: TelegramConfig,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    pub fn new(cfg: &TelegramConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(cfg.timeout)
            .build()
            .map_err(DeliveryError::Transport)?;
        Ok(Self {
            client,
            url: format!("{}/bot{}/sendMessage", cfg.api_base, cfg.bot_token),
            chat_id: cfg.chat_id.clone(),
            cfg: cfg.clone(),
        })
    }

    pub fn with_retries(mut self, attempts: u8) -> Self {
        self.cfg.attempts = attempts.max(1);
        self
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<(), DeliveryError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: message,
            parse_mode: "Markdown",
            disable_web_page_preview: false,
        };
        let req = self
            .client
            .post(&self.url)
            .timeout(self.cfg.timeout)
            .form(&payload);

        let rsp = send_with_retry(req, self.cfg.attempts, "telegram")
            .await
            // reqwest errors embed the URL, and with it the token.
            .map_err(|e| DeliveryError::Transport(e.without_url()))?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
