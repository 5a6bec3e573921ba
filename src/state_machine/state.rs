//! Conversation state types

use serde::{Deserialize, Serialize};

/// Chat platform user identifier
pub type UserId = i64;
/// Chat identifier (private chat or group)
pub type ChatId = i64;
/// Message identifier within a chat
pub type MessageId = i64;

/// Where the conversation currently is.
///
/// Each phase carries its own payload. New phases get a new variant rather
/// than loose keys on an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Phase {
    /// Resting state between turns
    Dashboard {
        /// The live screen message, once one has been sent
        #[serde(default)]
        anchor_message_id: Option<MessageId>,
    },

    /// Prompt shown, waiting for an expense line
    AwaitingInput {
        /// Screen that showed the prompt; edited with the result
        anchor_message_id: MessageId,
    },
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Dashboard {
            anchor_message_id: None,
        }
    }
}

impl Phase {
    pub fn anchor_message_id(&self) -> Option<MessageId> {
        match self {
            Phase::Dashboard { anchor_message_id } => *anchor_message_id,
            Phase::AwaitingInput { anchor_message_id } => Some(*anchor_message_id),
        }
    }

    /// Same phase, pointed at a different screen message
    #[must_use]
    pub fn with_anchor(self, message_id: MessageId) -> Self {
        match self {
            Phase::Dashboard { .. } => Phase::Dashboard {
                anchor_message_id: Some(message_id),
            },
            Phase::AwaitingInput { .. } => Phase::AwaitingInput {
                anchor_message_id: message_id,
            },
        }
    }

    /// Short name for logs and API responses
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Dashboard { .. } => "dashboard",
            Phase::AwaitingInput { .. } => "awaiting_input",
        }
    }
}

/// Who a turn belongs to (immutable for the turn)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnContext {
    pub user_id: UserId,
    pub chat_id: ChatId,
    /// Username, or `User<id>` when the account has none
    pub display_name: String,
    pub full_name: Option<String>,
}

impl TurnContext {
    pub fn new(user_id: UserId, chat_id: ChatId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            chat_id,
            display_name: display_name.into(),
            full_name: None,
        }
    }

    #[must_use]
    pub fn with_full_name(mut self, full_name: Option<String>) -> Self {
        self.full_name = full_name;
        self
    }
}
