// src/notifier/telegram.rs

use crate::config::TelegramSettings;
use crate::notifier::{Channel, DeliveryError};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";

/// Bot API envelope shared by every method.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    username: Option<String>,
}

pub struct TelegramChannel {
    base_url: String,
    chat_ids: Vec<String>,
    client: Client,
}

impl TelegramChannel {
    pub fn new(settings: &TelegramSettings) -> Result<Self, DeliveryError> {
        let token = settings
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DeliveryError::RequestFailed("bot token is not configured".into()))?;

        if settings.chat_ids.is_empty() {
            return Err(DeliveryError::RequestFailed(
                "no chat ids configured".into(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: format!("{API_BASE}/bot{token}"),
            chat_ids: settings.chat_ids.clone(),
            client,
        })
    }

    /// `getMe`; returns the bot's username.
    pub fn check_connection(&self) -> Result<String, DeliveryError> {
        let resp = self
            .client
            .get(format!("{}/getMe", self.base_url))
            .send()?;

        let status = resp.status();
        let body: ApiResponse<BotUser> = resp.json()?;
        if !status.is_success() || !body.ok {
            return Err(DeliveryError::Api {
                status: status.as_u16(),
                body: body.description.unwrap_or_else(|| "getMe failed".into()),
            });
        }

        Ok(body
            .result
            .and_then(|u| u.username)
            .unwrap_or_else(|| "<unknown>".to_string()))
    }
}

impl Channel for TelegramChannel {
    fn recipients(&self) -> &[String] {
        &self.chat_ids
    }

    fn send(&self, recipient: &str, text: &str) -> Result<(), DeliveryError> {
        let params = [
            ("chat_id", recipient),
            ("text", text),
            ("parse_mode", "HTML"),
            ("disable_web_page_preview", "true"),
        ];

        let resp = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .form(&params)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_else(|_| "(no body)".to_string());
            return Err(DeliveryError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
