//! Mock implementations for testing
//!
//! These mocks enable integration testing of the router without real I/O.

use super::traits::*;
use crate::db::{
    ChatId, ConversationState, DbError, DbResult, MessageId, Participant, Phase, Transaction,
    UserId,
};
use crate::parser::normalize_amount;
use crate::screens::{Operation, ScreenDirective};
use crate::telegram::{Ignorable, MessagingError};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

// ============================================================================
// In-Memory Storage
// ============================================================================

/// In-memory storage with switchable write failures
#[derive(Default)]
pub struct InMemoryStorage {
    states: Mutex<HashMap<UserId, ConversationState>>,
    participants: Mutex<Vec<Participant>>,
    transactions: Mutex<Vec<Transaction>>,
    fail_writes: AtomicBool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn stored_phase(&self, user_id: UserId) -> Option<Phase> {
        self.states.lock().unwrap().get(&user_id).map(|s| s.phase)
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.lock().unwrap().clone()
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.participants.lock().unwrap().clone()
    }

    fn check_write(&self) -> DbResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for InMemoryStorage {
    async fn get_state(&self, user_id: UserId) -> DbResult<ConversationState> {
        Ok(self
            .states
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| ConversationState::fresh(user_id)))
    }

    async fn set_state(&self, user_id: UserId, chat_id: ChatId, phase: &Phase) -> DbResult<()> {
        self.check_write()?;
        self.states.lock().unwrap().insert(
            user_id,
            ConversationState {
                user_id,
                chat_id: Some(chat_id),
                phase: *phase,
                updated_at: Some(Utc::now()),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl Ledger for InMemoryStorage {
    async fn ensure_schema(&self) -> DbResult<()> {
        Ok(())
    }

    async fn register_participant(
        &self,
        id: UserId,
        display_name: &str,
        full_name: Option<&str>,
    ) -> DbResult<Participant> {
        self.check_write()?;
        let mut participants = self.participants.lock().unwrap();
        if let Some(existing) = participants.iter_mut().find(|p| p.id == id) {
            existing.display_name = display_name.to_string();
            existing.full_name = full_name.map(str::to_string);
            return Ok(existing.clone());
        }
        let participant = Participant {
            id,
            display_name: display_name.to_string(),
            full_name: full_name.map(str::to_string),
            joined_at: Utc::now(),
        };
        participants.push(participant.clone());
        Ok(participant)
    }

    async fn list_participants(&self) -> DbResult<Vec<Participant>> {
        Ok(self.participants())
    }

    async fn append_transaction(
        &self,
        payer_id: UserId,
        amount: Decimal,
        description: &str,
        involved: &[String],
    ) -> DbResult<Transaction> {
        self.check_write()?;
        let mut transactions = self.transactions.lock().unwrap();
        let tx = Transaction {
            id: i64::try_from(transactions.len()).unwrap() + 1,
            payer_id,
            amount: normalize_amount(amount),
            description: description.to_string(),
            involved: involved.to_vec(),
            created_at: Utc::now(),
        };
        transactions.push(tx.clone());
        Ok(tx)
    }

    async fn list_transactions(&self) -> DbResult<Vec<Transaction>> {
        Ok(self.transactions())
    }
}

// ============================================================================
// Mock Messenger
// ============================================================================

/// Everything the router asked the chat platform to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Ack {
        callback_id: String,
        text: String,
        alert: bool,
    },
    Delete {
        chat_id: ChatId,
        message_id: MessageId,
    },
    Notify {
        chat_id: ChatId,
        text: String,
    },
    Screen(ScreenDirective),
}

/// Mock messenger that records calls and returns queued failures
pub struct MockMessenger {
    outbound: Mutex<Vec<Outbound>>,
    edit_failures: Mutex<VecDeque<MessagingError>>,
    send_failures: Mutex<VecDeque<MessagingError>>,
    fail_best_effort: AtomicBool,
    next_message_id: AtomicI64,
}

impl Default for MockMessenger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMessenger {
    /// Sent messages are numbered from 1000
    pub fn new() -> Self {
        Self {
            outbound: Mutex::new(Vec::new()),
            edit_failures: Mutex::new(VecDeque::new()),
            send_failures: Mutex::new(VecDeque::new()),
            fail_best_effort: AtomicBool::new(false),
            next_message_id: AtomicI64::new(1000),
        }
    }

    /// Fail the next edit with this error
    pub fn queue_edit_failure(&self, error: MessagingError) {
        self.edit_failures.lock().unwrap().push_back(error);
    }

    /// Fail the next send with this error
    pub fn queue_send_failure(&self, error: MessagingError) {
        self.send_failures.lock().unwrap().push_back(error);
    }

    /// Make acknowledgements, deletes and notices fail
    pub fn fail_best_effort(&self) {
        self.fail_best_effort.store(true, Ordering::SeqCst);
    }

    pub fn outbound(&self) -> Vec<Outbound> {
        self.outbound.lock().unwrap().clone()
    }

    pub fn screens(&self) -> Vec<ScreenDirective> {
        self.outbound()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Screen(directive) => Some(directive),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.outbound.lock().unwrap().clear();
    }

    fn record(&self, outbound: Outbound) -> Result<(), Ignorable> {
        self.outbound.lock().unwrap().push(outbound);
        if self.fail_best_effort.load(Ordering::SeqCst) {
            return Err(MessagingError::transport("mock best-effort failure").into());
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn acknowledge(&self, callback_id: &str, text: &str, alert: bool) -> Result<(), Ignorable> {
        self.record(Outbound::Ack {
            callback_id: callback_id.to_string(),
            text: text.to_string(),
            alert,
        })
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), Ignorable> {
        self.record(Outbound::Delete {
            chat_id,
            message_id,
        })
    }

    async fn notify(&self, chat_id: ChatId, text: &str) -> Result<MessageId, Ignorable> {
        self.record(Outbound::Notify {
            chat_id,
            text: text.to_string(),
        })?;
        Ok(self.next_message_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn render(&self, directive: &ScreenDirective) -> Result<MessageId, MessagingError> {
        self.outbound
            .lock()
            .unwrap()
            .push(Outbound::Screen(directive.clone()));

        match directive.operation {
            Operation::Edit => match self.edit_failures.lock().unwrap().pop_front() {
                Some(error) => Err(error),
                None => Ok(directive.message_id.unwrap_or_default()),
            },
            Operation::Send => match self.send_failures.lock().unwrap().pop_front() {
                Some(error) => Err(error),
                None => Ok(self.next_message_id.fetch_add(1, Ordering::SeqCst)),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::runtime::{ConversationRouter, InboundEvent, Sender, TurnError};
    use crate::telegram::MessagingErrorKind;
    use std::sync::Arc;

    const USER: UserId = 42;
    const CHAT: ChatId = 4200;

    type TestRouter = ConversationRouter<Arc<InMemoryStorage>, Arc<MockMessenger>>;

    struct Harness {
        router: TestRouter,
        storage: Arc<InMemoryStorage>,
        messenger: Arc<MockMessenger>,
    }

    fn harness() -> Harness {
        let storage = Arc::new(InMemoryStorage::new());
        let messenger = Arc::new(MockMessenger::new());
        let router = ConversationRouter::new(
            storage.clone(),
            messenger.clone(),
            Arc::new(Config::default()),
        );
        Harness {
            router,
            storage,
            messenger,
        }
    }

    fn sender() -> Sender {
        Sender {
            user_id: USER,
            display_name: "alice".to_string(),
            full_name: Some("Alice Smith".to_string()),
        }
    }

    fn start(message_id: MessageId) -> InboundEvent {
        InboundEvent::Start {
            sender: sender(),
            chat_id: CHAT,
            message_id,
        }
    }

    fn press(data: &str, message_id: MessageId) -> InboundEvent {
        InboundEvent::Callback {
            sender: sender(),
            chat_id: CHAT,
            message_id,
            callback_id: format!("cb-{message_id}"),
            data: data.to_string(),
        }
    }

    fn text(body: &str, message_id: MessageId) -> InboundEvent {
        InboundEvent::Text {
            sender: sender(),
            chat_id: CHAT,
            message_id,
            text: body.to_string(),
        }
    }

    /// `/start` then open the prompt on the welcome screen
    async fn open_prompt(h: &Harness) -> MessageId {
        h.router.handle(start(1)).await.unwrap();
        let anchor = h.storage.stored_phase(USER).unwrap().anchor_message_id().unwrap();
        h.router.handle(press("btn_add_expense", anchor)).await.unwrap();
        h.messenger.clear();
        anchor
    }

    #[tokio::test]
    async fn test_start_sends_welcome_and_anchors_it() {
        let h = harness();
        let outcome = h.router.handle(start(1)).await.unwrap();

        assert_eq!(
            outcome.phase,
            Phase::Dashboard {
                anchor_message_id: Some(1000)
            }
        );
        assert_eq!(h.storage.stored_phase(USER), Some(outcome.phase));

        let outbound = h.messenger.outbound();
        assert_eq!(
            outbound[0],
            Outbound::Delete {
                chat_id: CHAT,
                message_id: 1
            }
        );
        let screens = h.messenger.screens();
        assert_eq!(screens.len(), 1);
        assert_eq!(screens[0].operation, Operation::Send);
        assert!(screens[0].text.contains("Guild Ledger"));
    }

    #[tokio::test]
    async fn test_expense_flow_records_and_edits_anchor() {
        let h = harness();
        let anchor = open_prompt(&h).await;
        assert_eq!(
            h.storage.stored_phase(USER),
            Some(Phase::AwaitingInput {
                anchor_message_id: anchor
            })
        );

        let outcome = h.router.handle(text("20 lunch with Bob", 7)).await.unwrap();

        assert_eq!(
            outcome.phase,
            Phase::Dashboard {
                anchor_message_id: Some(anchor)
            }
        );
        let transactions = h.storage.transactions();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].payer_id, USER);
        assert_eq!(transactions[0].amount.to_string(), "20.00");
        assert_eq!(transactions[0].description, "lunch");
        assert_eq!(transactions[0].involved, vec!["Bob".to_string()]);

        let screens = h.messenger.screens();
        assert_eq!(screens.len(), 1);
        assert_eq!(screens[0].operation, Operation::Edit);
        assert_eq!(screens[0].message_id, Some(anchor));
        assert!(screens[0].text.contains("Recorded:</b> $20.00 for lunch"));
        assert!(h.messenger.outbound().contains(&Outbound::Delete {
            chat_id: CHAT,
            message_id: 7
        }));
    }

    #[tokio::test]
    async fn test_unparseable_text_keeps_prompt() {
        let h = harness();
        let anchor = open_prompt(&h).await;

        let outcome = h.router.handle(text("lunch", 7)).await.unwrap();

        assert_eq!(
            outcome.phase,
            Phase::AwaitingInput {
                anchor_message_id: anchor
            }
        );
        assert!(h.storage.transactions().is_empty());
        let screens = h.messenger.screens();
        assert!(screens[0].text.contains("Could not parse"));
        assert_eq!(screens[0].message_id, Some(anchor));
    }

    #[tokio::test]
    async fn test_dashboard_text_only_deleted() {
        let h = harness();
        h.router.handle(start(1)).await.unwrap();
        h.messenger.clear();

        h.router.handle(text("20 lunch", 5)).await.unwrap();

        assert_eq!(
            h.messenger.outbound(),
            vec![Outbound::Delete {
                chat_id: CHAT,
                message_id: 5
            }]
        );
        assert!(h.storage.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_button_acknowledged_first() {
        let h = harness();
        h.router.handle(press("btn_finances", 50)).await.unwrap();

        let outbound = h.messenger.outbound();
        assert!(matches!(
            &outbound[0],
            Outbound::Ack { callback_id, alert: false, .. } if callback_id == "cb-50"
        ));
        assert!(matches!(outbound[1], Outbound::Screen(_)));
    }

    #[tokio::test]
    async fn test_best_effort_failures_do_not_abort() {
        let h = harness();
        h.messenger.fail_best_effort();

        h.router.handle(start(1)).await.unwrap();
        h.router.handle(press("btn_join", 1000)).await.unwrap();

        assert_eq!(h.storage.participants().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_action_only_acknowledged() {
        let h = harness();
        let outcome = h.router.handle(press("btn_teleport", 9)).await.unwrap();

        assert_eq!(outcome.effects_applied, 0);
        assert_eq!(
            h.messenger.outbound(),
            vec![Outbound::Ack {
                callback_id: "cb-9".to_string(),
                text: "🚧 Not yet available".to_string(),
                alert: false,
            }]
        );
        assert_eq!(h.storage.stored_phase(USER), None);
    }

    #[tokio::test]
    async fn test_join_registers_and_lists_member() {
        let h = harness();
        h.router.handle(press("btn_join", 9)).await.unwrap();

        let participants = h.storage.participants();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].display_name, "alice");
        assert_eq!(participants[0].full_name.as_deref(), Some("Alice Smith"));

        let outbound = h.messenger.outbound();
        assert!(h.messenger.screens()[0].text.contains("👤 <b>alice</b> (Alice Smith)"));
        assert!(matches!(
            outbound.last(),
            Some(Outbound::Notify { text, .. }) if text.contains("joined the Guild")
        ));
    }

    #[tokio::test]
    async fn test_join_notice_is_removed_after_ttl() {
        let storage = Arc::new(InMemoryStorage::new());
        let messenger = Arc::new(MockMessenger::new());
        let config = Config {
            notice_ttl: std::time::Duration::ZERO,
            ..Config::default()
        };
        let router = ConversationRouter::new(storage, messenger.clone(), Arc::new(config));

        router.handle(press("btn_join", 9)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // The members screen is an edit, so the notice took the first sent id
        assert_eq!(
            messenger.outbound().last(),
            Some(&Outbound::Delete {
                chat_id: CHAT,
                message_id: 1000,
            })
        );
    }

    #[tokio::test]
    async fn test_finances_totals_joined_payers() {
        let h = harness();
        h.router.handle(press("btn_join", 9)).await.unwrap();
        h.router.handle(press("btn_add_expense", 9)).await.unwrap();
        h.router.handle(text("15 pizza", 10)).await.unwrap();
        h.router.handle(press("btn_add_expense", 9)).await.unwrap();
        h.router.handle(text("5.50 soda", 11)).await.unwrap();
        h.messenger.clear();

        h.router.handle(press("btn_finances", 9)).await.unwrap();

        let screen = &h.messenger.screens()[0];
        assert!(screen.text.contains("└── alice: $20.50"));
        assert!(screen.text.contains("Total: $20.50"));
    }

    #[tokio::test]
    async fn test_cancel_returns_to_dashboard() {
        let h = harness();
        let anchor = open_prompt(&h).await;

        let outcome = h.router.handle(press("btn_back_home", anchor)).await.unwrap();

        assert_eq!(
            outcome.phase,
            Phase::Dashboard {
                anchor_message_id: Some(anchor)
            }
        );
        assert_eq!(h.storage.stored_phase(USER), Some(outcome.phase));
    }

    #[tokio::test]
    async fn test_gone_anchor_falls_back_to_new_screen() {
        let h = harness();
        let anchor = open_prompt(&h).await;
        h.messenger
            .queue_edit_failure(MessagingError::message_gone("message to edit not found"));

        let outcome = h.router.handle(text("20 lunch", 7)).await.unwrap();

        let screens = h.messenger.screens();
        assert_eq!(screens.len(), 2);
        assert_eq!(screens[0].operation, Operation::Edit);
        assert_eq!(screens[1].operation, Operation::Send);
        assert_eq!(screens[0].text, screens[1].text);

        // The replacement screen is the new anchor
        let new_anchor = outcome.phase.anchor_message_id().unwrap();
        assert_ne!(new_anchor, anchor);
        assert_eq!(h.storage.stored_phase(USER), Some(outcome.phase));
        assert_eq!(h.storage.transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_not_modified_edit_is_not_resent() {
        let h = harness();
        h.router.handle(start(1)).await.unwrap();
        h.messenger.clear();
        h.messenger
            .queue_edit_failure(MessagingError::not_modified("message is not modified"));

        h.router.handle(press("btn_back_home", 1000)).await.unwrap();

        assert_eq!(h.messenger.screens().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_swallows_any_edit_failure() {
        let h = harness();
        h.messenger
            .queue_edit_failure(MessagingError::transport("connection reset"));

        let outcome = h.router.handle(press("btn_refresh_finances", 9)).await;

        assert!(outcome.is_ok());
        assert_eq!(h.messenger.screens().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fallback_fails_turn() {
        let h = harness();
        let _ = open_prompt(&h).await;
        h.messenger
            .queue_edit_failure(MessagingError::message_gone("message can't be edited"));
        h.messenger
            .queue_send_failure(MessagingError::api("Forbidden: bot was blocked by the user"));

        let err = h.router.handle(text("20 lunch", 7)).await.unwrap_err();

        assert!(matches!(
            err,
            TurnError::Messaging(ref e) if e.kind == MessagingErrorKind::Api
        ));
    }

    #[tokio::test]
    async fn test_persistence_failure_fails_turn() {
        let h = harness();
        let _ = open_prompt(&h).await;
        h.storage.fail_writes();

        let err = h.router.handle(text("20 lunch", 7)).await.unwrap_err();

        assert!(matches!(err, TurnError::Persistence(_)));
        assert!(h.storage.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_failed_start_send_fails_turn() {
        let h = harness();
        h.messenger
            .queue_send_failure(MessagingError::transport("timed out"));

        let err = h.router.handle(start(1)).await.unwrap_err();

        assert!(matches!(err, TurnError::Messaging(_)));
        assert_eq!(h.storage.stored_phase(USER), None);
    }
}
