//! Effects produced by state transitions

use super::state::MessageId;
use crate::parser::ParsedExpense;
use crate::screens::View;

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Create missing tables
    EnsureSchema,

    /// Remove the user's inbound message from the transcript (best effort)
    DeleteInbound { message_id: MessageId },

    /// Record the turn's user as a participant
    RegisterParticipant,

    /// Append an expense paid by the turn's user
    AppendTransaction { expense: ParsedExpense },

    /// Persist the new state
    PersistState,

    /// Show a screen
    Render {
        view: View,
        target: RenderTarget,
        on_failure: OnEditFailure,
    },

    /// One-shot message outside the screen (best effort)
    Notify { text: String },
}

/// Where a screen goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// New message; becomes the anchor
    Send,
    /// Edit an existing screen in place
    Edit(MessageId),
}

/// What to do when an in-place edit fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnEditFailure {
    /// Non-critical refresh: drop the failure
    Swallow,
    /// Critical update: send a new screen unless the content is already shown
    SendNew,
}

impl Effect {
    pub fn send(view: View) -> Self {
        Effect::Render {
            view,
            target: RenderTarget::Send,
            on_failure: OnEditFailure::SendNew,
        }
    }

    pub fn edit(view: View, message_id: MessageId) -> Self {
        Effect::Render {
            view,
            target: RenderTarget::Edit(message_id),
            on_failure: OnEditFailure::SendNew,
        }
    }

    pub fn edit_quietly(view: View, message_id: MessageId) -> Self {
        Effect::Render {
            view,
            target: RenderTarget::Edit(message_id),
            on_failure: OnEditFailure::Swallow,
        }
    }
}
