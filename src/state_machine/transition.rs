//! Pure state transition function

use super::effect::Effect;
use super::event::{Action, Event};
use super::state::{MessageId, Phase, TurnContext};
use crate::parser::parse_expense;
use crate::screens::View;

/// Confirmation sent after a successful join
pub const JOIN_NOTICE: &str = "✅ You have joined the Guild!";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: Phase,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: Phase) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Pure transition function.
///
/// Every (phase, event) pair has a defined outcome, so there is no error
/// path: unknown buttons and stray text resolve to no-ops.
pub fn transition(state: &Phase, _context: &TurnContext, event: Event) -> TransitionResult {
    match (state, event) {
        // ============================================================
        // Entry
        // ============================================================

        // Any + /start -> Dashboard on a fresh screen. The anchor is
        // replaced (and persisted) once the send reports its message id.
        (_, Event::Start { message_id }) => TransitionResult::new(Phase::Dashboard {
            anchor_message_id: state.anchor_message_id(),
        })
        .with_effect(Effect::DeleteInbound { message_id })
        .with_effect(Effect::EnsureSchema)
        .with_effect(Effect::send(View::Welcome)),

        (_, Event::ScreenSent { message_id }) => {
            TransitionResult::new(state.with_anchor(message_id)).with_effect(Effect::PersistState)
        }

        // ============================================================
        // Text input
        // ============================================================
        (
            Phase::AwaitingInput { anchor_message_id },
            Event::TextReceived { text, message_id },
        ) => {
            let anchor = *anchor_message_id;
            let result = TransitionResult::new(*state)
                .with_effect(Effect::DeleteInbound { message_id });

            match parse_expense(&text) {
                Ok(expense) => TransitionResult {
                    new_state: Phase::Dashboard {
                        anchor_message_id: Some(anchor),
                    },
                    ..result
                }
                .with_effect(Effect::AppendTransaction {
                    expense: expense.clone(),
                })
                .with_effect(Effect::PersistState)
                .with_effect(Effect::edit(View::Recorded(expense), anchor)),

                // Stay put; the prompt explains what went wrong
                Err(failure) => result.with_effect(Effect::edit(
                    View::Prompt {
                        failure: Some(failure),
                    },
                    anchor,
                )),
            }
        }

        // Text outside of the prompt only gets cleaned up
        (Phase::Dashboard { .. }, Event::TextReceived { message_id, .. }) => {
            TransitionResult::new(*state).with_effect(Effect::DeleteInbound { message_id })
        }

        // ============================================================
        // Buttons (valid from either phase)
        // ============================================================
        (_, Event::ButtonPressed { action, message_id }) => {
            handle_button(state, &action, message_id)
        }
    }
}

fn handle_button(state: &Phase, action: &Action, message_id: MessageId) -> TransitionResult {
    match action {
        Action::AddExpense => TransitionResult::new(Phase::AwaitingInput {
            anchor_message_id: message_id,
        })
        .with_effect(Effect::PersistState)
        .with_effect(Effect::edit(View::Prompt { failure: None }, message_id)),

        Action::BackHome => navigate(state, message_id, Effect::edit(View::Welcome, message_id)),

        Action::Finances => navigate(
            state,
            message_id,
            Effect::edit(View::Finances { refreshed: false }, message_id),
        ),

        // Pressing refresh twice renders identical content; that edit is
        // allowed to fail quietly
        Action::RefreshFinances => navigate(
            state,
            message_id,
            Effect::edit_quietly(View::Finances { refreshed: true }, message_id),
        ),

        Action::Members => navigate(state, message_id, Effect::edit(View::Members, message_id)),

        Action::Settings => navigate(state, message_id, Effect::edit(View::Settings, message_id)),

        Action::Join => {
            let navigated = navigate(state, message_id, Effect::edit(View::Members, message_id));
            TransitionResult::new(navigated.new_state)
                .with_effect(Effect::RegisterParticipant)
                .with_effects(navigated.effects)
                .with_effect(Effect::Notify {
                    text: JOIN_NOTICE.to_string(),
                })
        }

        // Answered entirely by the acknowledgement toast
        Action::History | Action::Noop | Action::Leave | Action::Unknown(_) => {
            TransitionResult::new(*state)
        }
    }
}

/// Move to the dashboard anchored on the pressed screen, then render.
/// State is only written when it actually changes.
fn navigate(state: &Phase, message_id: MessageId, render: Effect) -> TransitionResult {
    let next = Phase::Dashboard {
        anchor_message_id: Some(message_id),
    };
    let persist = (next != *state).then_some(Effect::PersistState);
    TransitionResult::new(next)
        .with_effects(persist)
        .with_effect(render)
}
