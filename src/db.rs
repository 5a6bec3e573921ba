//! Database module for the guild ledger
//!
//! Persistence for participants, per-user conversation state and the
//! append-only transaction log.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Database connection poisoned by a panicked writer")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
///
/// Every operation holds the connection only for its own duration; the guard
/// releases it on every exit path.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.ensure_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.ensure_schema()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    /// Create any missing tables. Safe to call on every `/start`.
    pub fn ensure_schema(&self) -> DbResult<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Cheap liveness probe for the health endpoint
    pub fn ping(&self) -> bool {
        self.conn()
            .and_then(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .map_err(DbError::from)
            })
            .is_ok()
    }

    // ==================== Conversation State ====================

    /// Current state for a user; a fresh dashboard state if none is stored.
    pub fn get_state(&self, user_id: UserId) -> DbResult<ConversationState> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT chat_id, state, updated_at FROM conversation_states WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, ChatId>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((chat_id, state_json, updated_at)) = row else {
            return Ok(ConversationState::fresh(user_id));
        };

        let phase = serde_json::from_str::<Phase>(&state_json).unwrap_or_else(|e| {
            tracing::warn!(
                user_id,
                error = %e,
                "Unreadable conversation state, resetting to dashboard"
            );
            Phase::default()
        });

        Ok(ConversationState {
            user_id,
            chat_id: Some(chat_id),
            phase,
            updated_at: Some(parse_datetime(&updated_at)),
        })
    }

    /// Upsert the full state record for a user.
    pub fn set_state(&self, user_id: UserId, chat_id: ChatId, phase: &Phase) -> DbResult<()> {
        let state_json = serde_json::to_string(phase)?;
        let now = Utc::now();

        self.conn()?.execute(
            "INSERT INTO conversation_states (user_id, chat_id, state, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id) DO UPDATE SET
                chat_id = excluded.chat_id,
                state = excluded.state,
                updated_at = excluded.updated_at",
            params![user_id, chat_id, state_json, now.to_rfc3339()],
        )?;
        Ok(())
    }

    // ==================== Participants ====================

    /// Register a participant, refreshing the names if they already joined.
    pub fn register_participant(
        &self,
        id: UserId,
        display_name: &str,
        full_name: Option<&str>,
    ) -> DbResult<Participant> {
        let conn = self.conn()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO participants (id, display_name, full_name, joined_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET
                display_name = excluded.display_name,
                full_name = excluded.full_name",
            params![id, display_name, full_name, now.to_rfc3339()],
        )?;

        conn.query_row(
            "SELECT id, display_name, full_name, joined_at FROM participants WHERE id = ?1",
            params![id],
            parse_participant_row,
        )
        .map_err(DbError::from)
    }

    /// All participants in join order
    pub fn list_participants(&self) -> DbResult<Vec<Participant>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, display_name, full_name, joined_at
             FROM participants ORDER BY joined_at ASC, id ASC",
        )?;

        let rows = stmt.query_map([], parse_participant_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    // ==================== Transactions ====================

    /// Append a transaction to the ledger
    pub fn append_transaction(
        &self,
        payer_id: UserId,
        amount: Decimal,
        description: &str,
        involved: &[String],
    ) -> DbResult<Transaction> {
        let conn = self.conn()?;
        let now = Utc::now();
        let amount = crate::parser::normalize_amount(amount);
        let involved_json = serde_json::to_string(involved)?;

        conn.execute(
            "INSERT INTO transactions (payer_id, amount, description, involved, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                payer_id,
                amount.to_string(),
                description,
                involved_json,
                now.to_rfc3339()
            ],
        )?;

        Ok(Transaction {
            id: conn.last_insert_rowid(),
            payer_id,
            amount,
            description: description.to_string(),
            involved: involved.to_vec(),
            created_at: now,
        })
    }

    /// The whole ledger, oldest first
    pub fn list_transactions(&self) -> DbResult<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, payer_id, amount, description, involved, created_at
             FROM transactions ORDER BY id ASC",
        )?;

        let rows = stmt.query_map([], parse_transaction_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn parse_participant_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        id: row.get(0)?,
        display_name: row.get(1)?,
        full_name: row.get(2)?,
        joined_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn parse_transaction_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    let amount_str: String = row.get(2)?;
    let amount = Decimal::from_str(&amount_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    let involved_str: String = row.get(4)?;
    let involved: Vec<String> = serde_json::from_str(&involved_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(Transaction {
        id: row.get(0)?,
        payer_id: row.get(1)?,
        amount: crate::parser::normalize_amount(amount),
        description: row.get(3)?,
        involved,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
