//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::effect::{OnEditFailure, RenderTarget};
use super::event::Action;
use super::state::*;
use super::transition::*;
use super::*;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> TurnContext {
    TurnContext::new(7, 7, "tester")
}

fn count_persists(result: &TransitionResult) -> usize {
    result
        .effects
        .iter()
        .filter(|e| matches!(e, Effect::PersistState))
        .count()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_message_id() -> impl Strategy<Value = MessageId> {
    1i64..10_000
}

fn arb_phase() -> impl Strategy<Value = Phase> {
    prop_oneof![
        proptest::option::of(arb_message_id())
            .prop_map(|anchor_message_id| Phase::Dashboard { anchor_message_id }),
        arb_message_id().prop_map(|anchor_message_id| Phase::AwaitingInput { anchor_message_id }),
    ]
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::BackHome),
        Just(Action::Finances),
        Just(Action::RefreshFinances),
        Just(Action::AddExpense),
        Just(Action::Members),
        Just(Action::Join),
        Just(Action::Settings),
        Just(Action::History),
        Just(Action::Noop),
        Just(Action::Leave),
        "btn_[a-z]{3,10}".prop_map(|data| Action::from_callback_data(&data)),
    ]
}

fn arb_informational_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::History),
        Just(Action::Noop),
        Just(Action::Leave),
        "[a-z_]{1,12}".prop_map(Action::Unknown),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z ]{0,30}",
        "[0-9]{1,4}(\\.[0-9]{1,2})? [a-z]{1,10}( with [A-Z][a-z]{2,6})?",
        "-?[0-9]{1,3} [a-z]{1,10}",
        "[$€]?[0-9,.]{1,8}",
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_message_id().prop_map(|message_id| Event::Start { message_id }),
        (arb_action(), arb_message_id())
            .prop_map(|(action, message_id)| Event::ButtonPressed { action, message_id }),
        (arb_text(), arb_message_id())
            .prop_map(|(text, message_id)| Event::TextReceived { text, message_id }),
        arb_message_id().prop_map(|message_id| Event::ScreenSent { message_id }),
    ]
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    /// Add-expense anchors the prompt on the pressed screen from any phase
    #[test]
    fn prop_add_expense_always_awaits(state in arb_phase(), message_id in arb_message_id()) {
        let result = transition(
            &state,
            &test_context(),
            Event::ButtonPressed { action: Action::AddExpense, message_id },
        );
        prop_assert_eq!(result.new_state, Phase::AwaitingInput { anchor_message_id: message_id });
        prop_assert_eq!(count_persists(&result), 1);
    }

    /// Only the add-expense button can enter the prompt
    #[test]
    fn prop_awaiting_input_entered_only_by_add_expense(state in arb_phase(), event in arb_event()) {
        let is_add = matches!(&event, Event::ButtonPressed { action: Action::AddExpense, .. });
        let result = transition(&state, &test_context(), event);
        let awaiting = |p: &Phase| matches!(p, Phase::AwaitingInput { .. });
        if awaiting(&result.new_state) && !awaiting(&state) {
            prop_assert!(is_add);
        }
    }

    /// Inbound text is always cleaned up first
    #[test]
    fn prop_text_deleted_first(state in arb_phase(), text in arb_text(), message_id in arb_message_id()) {
        let result = transition(&state, &test_context(), Event::TextReceived { text, message_id });
        prop_assert_eq!(result.effects.first(), Some(&Effect::DeleteInbound { message_id }));
    }

    /// Dashboard ignores text beyond deleting it
    #[test]
    fn prop_dashboard_text_is_inert(
        anchor in proptest::option::of(arb_message_id()),
        text in arb_text(),
        message_id in arb_message_id(),
    ) {
        let state = Phase::Dashboard { anchor_message_id: anchor };
        let result = transition(&state, &test_context(), Event::TextReceived { text, message_id });
        prop_assert_eq!(result.new_state, state);
        prop_assert_eq!(result.effects.len(), 1);
    }

    /// Prompt input either records exactly once and leaves, or stays put
    #[test]
    fn prop_prompt_input_outcomes(anchor in arb_message_id(), text in arb_text(), message_id in arb_message_id()) {
        let state = Phase::AwaitingInput { anchor_message_id: anchor };
        let result = transition(&state, &test_context(), Event::TextReceived { text: text.clone(), message_id });

        let appends = result
            .effects
            .iter()
            .filter(|e| matches!(e, Effect::AppendTransaction { .. }))
            .count();

        if crate::parser::parse_expense(&text).is_ok() {
            prop_assert_eq!(appends, 1);
            prop_assert_eq!(result.new_state, Phase::Dashboard { anchor_message_id: Some(anchor) });
        } else {
            prop_assert_eq!(appends, 0);
            prop_assert_eq!(result.new_state, state);
            prop_assert_eq!(count_persists(&result), 0);
        }
    }

    /// Every change of state (other than /start, which persists once the
    /// new screen exists) is written exactly once
    #[test]
    fn prop_changed_state_is_persisted(state in arb_phase(), event in arb_event()) {
        let is_start = matches!(event, Event::Start { .. });
        let result = transition(&state, &test_context(), event);
        if !is_start && result.new_state != state {
            prop_assert_eq!(count_persists(&result), 1);
        }
        prop_assert!(count_persists(&result) <= 1);
    }

    /// Toast-only buttons never touch state or the chat
    #[test]
    fn prop_informational_buttons_inert(state in arb_phase(), action in arb_informational_action(), message_id in arb_message_id()) {
        let result = transition(&state, &test_context(), Event::ButtonPressed { action, message_id });
        prop_assert_eq!(result.new_state, state);
        prop_assert!(result.effects.is_empty());
    }

    /// Edits only ever target the screen the user is looking at, and only
    /// the refresh path may drop a failed edit
    #[test]
    fn prop_render_targets(state in arb_phase(), event in arb_event()) {
        let pressed = match &event {
            Event::ButtonPressed { message_id, .. } => Some(*message_id),
            _ => None,
        };
        let is_refresh = matches!(&event, Event::ButtonPressed { action: Action::RefreshFinances, .. });
        let result = transition(&state, &test_context(), event);

        for effect in &result.effects {
            if let Effect::Render { target, on_failure, .. } = effect {
                if let RenderTarget::Edit(id) = target {
                    let expected = pressed.or(state.anchor_message_id());
                    prop_assert_eq!(Some(*id), expected);
                }
                if *on_failure == OnEditFailure::Swallow {
                    prop_assert!(is_refresh);
                }
            }
        }
    }

    /// The phase serializes to a form the store can read back
    #[test]
    fn prop_phase_json_stable(state in arb_phase()) {
        let json = serde_json::to_string(&state).unwrap();
        let back: Phase = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, state);
    }
}
