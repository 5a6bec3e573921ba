//! Webhook update decoding
//!
//! Only the subset of the Bot API `Update` object the ledger reacts to is
//! modelled. Updates of other kinds decode to `None` and are ignored.

use crate::runtime::{InboundEvent, Sender};
use serde::Deserialize;
use thiserror::Error;

/// Update that cannot be turned into an event
#[derive(Debug, Error)]
#[error("malformed update: {0}")]
pub struct MalformedEvent(pub String);

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    #[serde(default)]
    from: Option<User>,
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    #[serde(default)]
    message: Option<CallbackMessage>,
    #[serde(default)]
    data: Option<String>,
}

/// The screen a button sits on
#[derive(Debug, Deserialize)]
struct CallbackMessage {
    message_id: i64,
    chat: Chat,
}

impl From<User> for Sender {
    fn from(user: User) -> Self {
        let full_name = [user.first_name, user.last_name]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Sender {
            user_id: user.id,
            display_name: user
                .username
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| format!("User{}", user.id)),
            full_name: (!full_name.is_empty()).then_some(full_name),
        }
    }
}

/// Decode a webhook body.
///
/// `Ok(None)` for well-formed updates the bot does not handle (stickers,
/// edits, channel posts); `Err` when a handled update is missing required
/// fields or the body is not an update at all.
pub fn parse_update(body: &[u8]) -> Result<Option<InboundEvent>, MalformedEvent> {
    let update: Update =
        serde_json::from_slice(body).map_err(|e| MalformedEvent(e.to_string()))?;
    tracing::debug!(update_id = update.update_id, "Decoding update");

    if let Some(callback) = update.callback_query {
        let message = callback
            .message
            .ok_or_else(|| MalformedEvent("callback query without message".to_string()))?;
        let data = callback
            .data
            .ok_or_else(|| MalformedEvent("callback query without data".to_string()))?;

        return Ok(Some(InboundEvent::Callback {
            sender: callback.from.into(),
            chat_id: message.chat.id,
            message_id: message.message_id,
            callback_id: callback.id,
            data,
        }));
    }

    let Some(message) = update.message else {
        return Ok(None);
    };
    let Some(text) = message.text else {
        return Ok(None);
    };
    let sender: Sender = message
        .from
        .ok_or_else(|| MalformedEvent("message without sender".to_string()))?
        .into();

    let event = if is_start_command(&text) {
        InboundEvent::Start {
            sender,
            chat_id: message.chat.id,
            message_id: message.message_id,
        }
    } else {
        InboundEvent::Text {
            sender,
            chat_id: message.chat.id,
            message_id: message.message_id,
            text,
        }
    };
    Ok(Some(event))
}

/// `/start`, `/start@SomeBot`, and `/start <payload>`
fn is_start_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or_default();
    command == "/start" || command.starts_with("/start@")
}
