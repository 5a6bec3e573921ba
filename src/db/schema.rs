//! Database schema and types

pub use crate::state_machine::state::{ChatId, MessageId, Phase, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// SQL schema for initialization. Every statement is idempotent.
///
/// `transactions.payer_id` references `participants(id)` but SQLite leaves
/// foreign keys unenforced unless the pragma is enabled, so expenses from
/// users who never joined are stored and simply left out of the totals.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS participants (
    id INTEGER PRIMARY KEY,
    display_name TEXT NOT NULL,
    full_name TEXT,
    joined_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conversation_states (
    user_id INTEGER PRIMARY KEY,
    chat_id INTEGER NOT NULL,
    state TEXT NOT NULL DEFAULT '{"type":"dashboard"}',
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    payer_id INTEGER NOT NULL REFERENCES participants(id),
    amount TEXT NOT NULL,
    description TEXT NOT NULL,
    involved TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_payer ON transactions(payer_id);
"#;

/// A guild member who pressed "join"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: UserId,
    pub display_name: String,
    pub full_name: Option<String>,
    #[allow(dead_code)] // Listing order comes from SQL
    pub joined_at: DateTime<Utc>,
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: i64,
    pub payer_id: UserId,
    /// Stored and read back with exactly two decimal places
    pub amount: Decimal,
    pub description: String,
    pub involved: Vec<String>,
    #[allow(dead_code)] // Read back by tests
    pub created_at: DateTime<Utc>,
}

/// One record per user; upserted on every transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    pub user_id: UserId,
    /// `None` until the first write
    #[allow(dead_code)] // Read back by tests and for diagnostics
    pub chat_id: Option<ChatId>,
    pub phase: Phase,
    #[allow(dead_code)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConversationState {
    /// Resting state for a user with no stored record
    pub fn fresh(user_id: UserId) -> Self {
        Self {
            user_id,
            chat_id: None,
            phase: Phase::default(),
            updated_at: None,
        }
    }

    pub fn anchor_message_id(&self) -> Option<MessageId> {
        self.phase.anchor_message_id()
    }
}
