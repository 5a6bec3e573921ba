//! Conversation router
//!
//! Runs one turn per inbound event: acknowledge, load state, feed the pure
//! transition function and execute its effects in order. A sent screen is
//! fed back as an event so the new message becomes the anchor.

use super::traits::{Messenger, Storage};
use super::{InboundEvent, TurnError, TurnOutcome};
use crate::config::Config;
use crate::db::{ChatId, MessageId};
use crate::ledger::compute_totals;
use crate::screens::{self, Screen, View};
use crate::state_machine::{
    transition, Effect, Event, OnEditFailure, Phase, RenderTarget, TurnContext,
};
use crate::telegram::MessagingErrorKind;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

pub struct ConversationRouter<S, M>
where
    S: Storage + 'static,
    M: Messenger + 'static,
{
    storage: S,
    messenger: Arc<M>,
    config: Arc<Config>,
}

impl<S, M> ConversationRouter<S, M>
where
    S: Storage + 'static,
    M: Messenger + 'static,
{
    pub fn new(storage: S, messenger: M, config: Arc<Config>) -> Self {
        Self {
            storage,
            messenger: Arc::new(messenger),
            config,
        }
    }

    /// Handle one inbound event to completion
    pub async fn handle(&self, inbound: InboundEvent) -> Result<TurnOutcome, TurnError> {
        let turn_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "turn",
            %turn_id,
            user_id = inbound.sender().user_id,
            chat_id = inbound.chat_id(),
        );
        self.run_turn(inbound).instrument(span).await
    }

    async fn run_turn(&self, inbound: InboundEvent) -> Result<TurnOutcome, TurnError> {
        let (context, event, callback_id) = inbound.into_parts();

        // Acknowledge before anything heavier so the button stops spinning
        if let (Some(callback_id), Event::ButtonPressed { action, .. }) = (&callback_id, &event) {
            let toast = action.toast();
            if let Err(e) = self
                .messenger
                .acknowledge(callback_id, toast.text, toast.alert)
                .await
            {
                e.discard("acknowledge");
            }
        }

        let stored = self.storage.get_state(context.user_id).await?;
        tracing::debug!(phase = stored.phase.name(), anchor = ?stored.anchor_message_id(), "Loaded state");
        let mut state = stored.phase;
        let mut effects_applied = 0;

        // Process events in a loop to handle fed-back screens
        let mut events_to_process = vec![event];
        while let Some(current_event) = events_to_process.pop() {
            let result = transition(&state, &context, current_event);
            if result.new_state != state {
                tracing::debug!(from = state.name(), to = result.new_state.name(), "Phase change");
            }
            state = result.new_state;

            for effect in result.effects {
                effects_applied += 1;
                if let Some(generated_event) = self.execute_effect(&context, &state, effect).await? {
                    events_to_process.push(generated_event);
                }
            }
        }

        tracing::info!(phase = state.name(), effects_applied, "Turn complete");
        Ok(TurnOutcome {
            phase: state,
            effects_applied,
        })
    }

    async fn execute_effect(
        &self,
        context: &TurnContext,
        state: &Phase,
        effect: Effect,
    ) -> Result<Option<Event>, TurnError> {
        match effect {
            Effect::EnsureSchema => {
                self.storage.ensure_schema().await?;
                Ok(None)
            }

            Effect::DeleteInbound { message_id } => {
                if let Err(e) = self
                    .messenger
                    .delete_message(context.chat_id, message_id)
                    .await
                {
                    e.discard("delete inbound message");
                }
                Ok(None)
            }

            Effect::RegisterParticipant => {
                let participant = self
                    .storage
                    .register_participant(
                        context.user_id,
                        &context.display_name,
                        context.full_name.as_deref(),
                    )
                    .await?;
                tracing::info!(name = %participant.display_name, "Participant registered");
                Ok(None)
            }

            Effect::AppendTransaction { expense } => {
                let tx = self
                    .storage
                    .append_transaction(
                        context.user_id,
                        expense.amount,
                        &expense.description,
                        &expense.involved,
                    )
                    .await?;
                tracing::info!(
                    transaction_id = tx.id,
                    amount = %tx.amount,
                    description = %tx.description,
                    involved = tx.involved.len(),
                    "Expense recorded"
                );
                Ok(None)
            }

            Effect::PersistState => {
                self.storage
                    .set_state(context.user_id, context.chat_id, state)
                    .await?;
                Ok(None)
            }

            Effect::Render {
                view,
                target,
                on_failure,
            } => self.render(context, &view, target, on_failure).await,

            Effect::Notify { text } => {
                match self.messenger.notify(context.chat_id, &text).await {
                    Ok(message_id) => self.expire_notice(context.chat_id, message_id),
                    Err(e) => e.discard("notify"),
                }
                Ok(None)
            }
        }
    }

    /// Delete a one-shot notice once `notice_ttl` has passed, off the turn's path
    fn expire_notice(&self, chat_id: ChatId, message_id: MessageId) {
        let messenger = Arc::clone(&self.messenger);
        let ttl = self.config.notice_ttl;
        tokio::spawn(
            async move {
                tokio::time::sleep(ttl).await;
                if let Err(e) = messenger.delete_message(chat_id, message_id).await {
                    e.discard("expire notice");
                }
            }
            .in_current_span(),
        );
    }

    /// Show a view. A brand new message comes back as `ScreenSent`.
    async fn render(
        &self,
        context: &TurnContext,
        view: &View,
        target: RenderTarget,
        on_failure: OnEditFailure,
    ) -> Result<Option<Event>, TurnError> {
        let screen = self.build_screen(view).await?;
        let directive = screen.directive(context.chat_id, target);

        let error = match self.messenger.render(&directive).await {
            Ok(message_id) => {
                return Ok(match target {
                    RenderTarget::Send => Some(Event::ScreenSent { message_id }),
                    RenderTarget::Edit(_) => None,
                });
            }
            Err(e) if target == RenderTarget::Send => return Err(e.into()),
            Err(e) => e,
        };

        match on_failure {
            OnEditFailure::Swallow => {
                if error.is_edit_conflict() {
                    tracing::debug!(kind = ?error.kind, "Edit conflict, ignoring");
                } else {
                    tracing::warn!(kind = ?error.kind, error = %error, "Edit failed, ignoring");
                }
                Ok(None)
            }
            // The screen already shows exactly this
            OnEditFailure::SendNew if error.kind == MessagingErrorKind::NotModified => Ok(None),
            OnEditFailure::SendNew => {
                tracing::warn!(kind = ?error.kind, error = %error, "Edit failed, sending a new screen");
                let message_id = self
                    .messenger
                    .render(&screen.directive(context.chat_id, RenderTarget::Send))
                    .await?;
                Ok(Some(Event::ScreenSent { message_id }))
            }
        }
    }

    async fn build_screen(&self, view: &View) -> Result<Screen, TurnError> {
        let currency = &self.config.currency_symbol;
        let screen = match view {
            View::Welcome => screens::welcome(),
            View::Recorded(expense) => screens::recorded(expense, currency),
            View::Prompt { failure } => screens::prompt(*failure),
            View::Settings => screens::settings(),
            View::Members => screens::members(&self.storage.list_participants().await?),
            View::Finances { refreshed } => {
                let transactions = self.storage.list_transactions().await?;
                let participants = self.storage.list_participants().await?;
                screens::finances(
                    &compute_totals(&transactions, &participants),
                    *refreshed,
                    currency,
                )
            }
        };
        Ok(screen)
    }
}
