//! Telegram Bot API transport
//!
//! One `sendMessage` call per attempt, HTML parse mode. Status mapping:
//! 429 and 5xx are transient (dispatcher retries them), other 4xx mean a bad
//! token or chat id and are permanent.

use super::{Ack, Notifier, SendError};
use crate::types::NotificationMessage;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://api.telegram.org";

/// Body of every Bot API response
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

pub struct TelegramNotifier {
    http: reqwest::Client,
    send_url: String,
    chat_id: String,
    request_timeout: Duration,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str, request_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            send_url: format!("{}/bot{}/sendMessage", API_BASE, bot_token),
            chat_id: chat_id.to_string(),
            request_timeout,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<Ack, SendError> {
        // Destination defaults to the configured chat but the message may
        // carry its own (the contract is destination + text, nothing more).
        let chat_id = if message.destination.is_empty() {
            self.chat_id.as_str()
        } else {
            message.destination.as_str()
        };

        let response = self
            .http
            .post(&self.send_url)
            .form(&[
                ("chat_id", chat_id),
                ("text", message.body.as_str()),
                ("parse_mode", "HTML"),
                ("disable_web_page_preview", "true"),
            ])
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SendError::Timeout(self.request_timeout)
                } else {
                    SendError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SendError::RateLimited);
        }
        if status.is_server_error() {
            return Err(SendError::ServerError(status.as_u16()));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        if !body.ok {
            // 400/401/403 land here: bad chat id, revoked token, bot blocked
            return Err(SendError::Rejected(
                body.description
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        debug!(component = "notifier", chat_id, "telegram message accepted");
        Ok(Ack {
            delivered_at: Utc::now(),
        })
    }
}
