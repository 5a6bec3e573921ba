//! Bot API client
//!
//! Thin JSON-over-HTTPS wrapper. The bot token is part of every request URL,
//! so URLs are stripped from errors before they are surfaced.

use super::error::MessagingError;
use crate::db::{ChatId, MessageId};
use crate::screens::Keyboard;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

pub struct TelegramClient {
    client: Client,
    /// `<api base>/bot<token>`
    base_url: String,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardMarkup {
    inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardButton {
    text: String,
    callback_data: String,
}

impl From<&Keyboard> for InlineKeyboardMarkup {
    fn from(keyboard: &Keyboard) -> Self {
        Self {
            inline_keyboard: keyboard
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| InlineKeyboardButton {
                            text: button.label.clone(),
                            callback_data: button.action.callback_data(),
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

/// Envelope every Bot API method answers with
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: MessageId,
}

impl TelegramClient {
    pub fn new(token: &str, api_base: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{token}", api_base.trim_end_matches('/')),
        })
    }

    async fn call(&self, method: &str, payload: Value) -> Result<Value, MessagingError> {
        let url = format!("{}/{method}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                if e.is_timeout() {
                    MessagingError::transport(format!("{method} timed out: {e}"))
                } else {
                    MessagingError::transport(format!("{method} failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MessagingError::transport(format!("Failed to read {method} response: {}", e.without_url())))?;

        let parsed: ApiResponse = serde_json::from_str(&body).map_err(|e| {
            MessagingError::transport(format!("Unreadable {method} response (HTTP {status}): {e}"))
        })?;

        if !parsed.ok {
            let description = parsed
                .description
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(MessagingError::from_description(&description));
        }

        Ok(parsed.result.unwrap_or(Value::Null))
    }

    pub async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: &str,
        show_alert: bool,
    ) -> Result<(), MessagingError> {
        self.call(
            "answerCallbackQuery",
            json!({
                "callback_query_id": callback_id,
                "text": text,
                "show_alert": show_alert,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), MessagingError> {
        self.call(
            "deleteMessage",
            json!({ "chat_id": chat_id, "message_id": message_id }),
        )
        .await?;
        Ok(())
    }

    /// Send a new HTML message; returns its id
    pub async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId, MessagingError> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(keyboard) = keyboard {
            payload["reply_markup"] = json!(InlineKeyboardMarkup::from(keyboard));
        }

        let result = self.call("sendMessage", payload).await?;
        let sent: SentMessage = serde_json::from_value(result).map_err(|e| {
            MessagingError::transport(format!("sendMessage returned no message id: {e}"))
        })?;
        Ok(sent.message_id)
    }

    pub async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: &Keyboard,
    ) -> Result<(), MessagingError> {
        self.call(
            "editMessageText",
            json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "text": text,
                "parse_mode": "HTML",
                "reply_markup": InlineKeyboardMarkup::from(keyboard),
            }),
        )
        .await?;
        Ok(())
    }
}
