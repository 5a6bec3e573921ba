//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the router with mock implementations.

use crate::db::{ChatId, ConversationState, DbResult, MessageId, Participant, Phase, Transaction, UserId};
use crate::screens::{Operation, ScreenDirective};
use crate::telegram::{Ignorable, MessagingError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Storage for per-user conversation state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current state, or the resting default for unknown users
    async fn get_state(&self, user_id: UserId) -> DbResult<ConversationState>;

    /// Full replace of the user's record
    async fn set_state(&self, user_id: UserId, chat_id: ChatId, phase: &Phase) -> DbResult<()>;
}

/// Participants and the append-only transaction log
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn ensure_schema(&self) -> DbResult<()>;

    async fn register_participant(
        &self,
        id: UserId,
        display_name: &str,
        full_name: Option<&str>,
    ) -> DbResult<Participant>;

    async fn list_participants(&self) -> DbResult<Vec<Participant>>;

    async fn append_transaction(
        &self,
        payer_id: UserId,
        amount: Decimal,
        description: &str,
        involved: &[String],
    ) -> DbResult<Transaction>;

    async fn list_transactions(&self) -> DbResult<Vec<Transaction>>;
}

/// Outbound chat operations
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Answer a button press with a toast or alert
    async fn acknowledge(&self, callback_id: &str, text: &str, alert: bool)
        -> Result<(), Ignorable>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId)
        -> Result<(), Ignorable>;

    /// One-shot plain message. Returns its id so it can be removed later.
    async fn notify(&self, chat_id: ChatId, text: &str) -> Result<MessageId, Ignorable>;

    /// Send or edit a screen. Returns the id of the message now showing it.
    async fn render(&self, directive: &ScreenDirective) -> Result<MessageId, MessagingError>;
}

/// Combined storage trait for convenience
pub trait Storage: StateStore + Ledger {}
impl<T: StateStore + Ledger> Storage for T {}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    async fn get_state(&self, user_id: UserId) -> DbResult<ConversationState> {
        (**self).get_state(user_id).await
    }

    async fn set_state(&self, user_id: UserId, chat_id: ChatId, phase: &Phase) -> DbResult<()> {
        (**self).set_state(user_id, chat_id, phase).await
    }
}

#[async_trait]
impl<T: Ledger + ?Sized> Ledger for Arc<T> {
    async fn ensure_schema(&self) -> DbResult<()> {
        (**self).ensure_schema().await
    }

    async fn register_participant(
        &self,
        id: UserId,
        display_name: &str,
        full_name: Option<&str>,
    ) -> DbResult<Participant> {
        (**self).register_participant(id, display_name, full_name).await
    }

    async fn list_participants(&self) -> DbResult<Vec<Participant>> {
        (**self).list_participants().await
    }

    async fn append_transaction(
        &self,
        payer_id: UserId,
        amount: Decimal,
        description: &str,
        involved: &[String],
    ) -> DbResult<Transaction> {
        (**self)
            .append_transaction(payer_id, amount, description, involved)
            .await
    }

    async fn list_transactions(&self) -> DbResult<Vec<Transaction>> {
        (**self).list_transactions().await
    }
}

#[async_trait]
impl<T: Messenger + ?Sized> Messenger for Arc<T> {
    async fn acknowledge(&self, callback_id: &str, text: &str, alert: bool) -> Result<(), Ignorable> {
        (**self).acknowledge(callback_id, text, alert).await
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), Ignorable> {
        (**self).delete_message(chat_id, message_id).await
    }

    async fn notify(&self, chat_id: ChatId, text: &str) -> Result<MessageId, Ignorable> {
        (**self).notify(chat_id, text).await
    }

    async fn render(&self, directive: &ScreenDirective) -> Result<MessageId, MessagingError> {
        (**self).render(directive).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

use crate::db::Database;
use crate::telegram::TelegramClient;

/// Adapter to use Database as Storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StateStore for DatabaseStorage {
    async fn get_state(&self, user_id: UserId) -> DbResult<ConversationState> {
        self.db.get_state(user_id)
    }

    async fn set_state(&self, user_id: UserId, chat_id: ChatId, phase: &Phase) -> DbResult<()> {
        self.db.set_state(user_id, chat_id, phase)
    }
}

#[async_trait]
impl Ledger for DatabaseStorage {
    async fn ensure_schema(&self) -> DbResult<()> {
        self.db.ensure_schema()
    }

    async fn register_participant(
        &self,
        id: UserId,
        display_name: &str,
        full_name: Option<&str>,
    ) -> DbResult<Participant> {
        self.db.register_participant(id, display_name, full_name)
    }

    async fn list_participants(&self) -> DbResult<Vec<Participant>> {
        self.db.list_participants()
    }

    async fn append_transaction(
        &self,
        payer_id: UserId,
        amount: Decimal,
        description: &str,
        involved: &[String],
    ) -> DbResult<Transaction> {
        self.db
            .append_transaction(payer_id, amount, description, involved)
    }

    async fn list_transactions(&self) -> DbResult<Vec<Transaction>> {
        self.db.list_transactions()
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn acknowledge(&self, callback_id: &str, text: &str, alert: bool) -> Result<(), Ignorable> {
        Ok(self.answer_callback_query(callback_id, text, alert).await?)
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), Ignorable> {
        Ok(TelegramClient::delete_message(self, chat_id, message_id).await?)
    }

    async fn notify(&self, chat_id: ChatId, text: &str) -> Result<MessageId, Ignorable> {
        Ok(self.send_message(chat_id, text, None).await?)
    }

    async fn render(&self, directive: &ScreenDirective) -> Result<MessageId, MessagingError> {
        match (directive.operation, directive.message_id) {
            (Operation::Edit, Some(message_id)) => {
                self.edit_message_text(directive.chat_id, message_id, &directive.text, &directive.keyboard)
                    .await?;
                Ok(message_id)
            }
            (Operation::Edit, None) => Err(MessagingError::message_gone(
                "edit requested without a target message",
            )),
            (Operation::Send, _) => {
                self.send_message(directive.chat_id, &directive.text, Some(&directive.keyboard))
                    .await
            }
        }
    }
}
