//! Runtime for handling conversation turns

mod router;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use router::ConversationRouter;
pub use traits::*;

use crate::db::{ChatId, DbError, MessageId, UserId};
use crate::state_machine::{Action, Event, Phase, TurnContext};
use crate::telegram::{MessagingError, TelegramClient};
use thiserror::Error;

/// Type alias for production router with concrete implementations
pub type ProductionRouter = ConversationRouter<DatabaseStorage, TelegramClient>;

/// Author of an inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user_id: UserId,
    pub display_name: String,
    pub full_name: Option<String>,
}

impl Sender {
    fn into_context(self, chat_id: ChatId) -> TurnContext {
        TurnContext::new(self.user_id, chat_id, self.display_name).with_full_name(self.full_name)
    }
}

/// Decoded, transport-agnostic inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Inline button press; `message_id` is the screen it sits on
    Callback {
        sender: Sender,
        chat_id: ChatId,
        message_id: MessageId,
        callback_id: String,
        data: String,
    },
    Text {
        sender: Sender,
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
    },
    Start {
        sender: Sender,
        chat_id: ChatId,
        message_id: MessageId,
    },
}

impl InboundEvent {
    pub fn sender(&self) -> &Sender {
        match self {
            InboundEvent::Callback { sender, .. }
            | InboundEvent::Text { sender, .. }
            | InboundEvent::Start { sender, .. } => sender,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            InboundEvent::Callback { chat_id, .. }
            | InboundEvent::Text { chat_id, .. }
            | InboundEvent::Start { chat_id, .. } => *chat_id,
        }
    }

    /// Split into the turn's context, its state machine event and, for
    /// button presses, the callback id to acknowledge
    pub fn into_parts(self) -> (TurnContext, Event, Option<String>) {
        match self {
            InboundEvent::Callback {
                sender,
                chat_id,
                message_id,
                callback_id,
                data,
            } => (
                sender.into_context(chat_id),
                Event::ButtonPressed {
                    action: Action::from_callback_data(&data),
                    message_id,
                },
                Some(callback_id),
            ),
            InboundEvent::Text {
                sender,
                chat_id,
                message_id,
                text,
            } => (
                sender.into_context(chat_id),
                Event::TextReceived { text, message_id },
                None,
            ),
            InboundEvent::Start {
                sender,
                chat_id,
                message_id,
            } => (
                sender.into_context(chat_id),
                Event::Start { message_id },
                None,
            ),
        }
    }
}

/// How a successful turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub phase: Phase,
    pub effects_applied: usize,
}

/// A turn that could not complete
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("persistence failed: {0}")]
    Persistence(#[from] DbError),
    #[error("screen could not be shown: {0}")]
    Messaging(#[from] MessagingError),
}
