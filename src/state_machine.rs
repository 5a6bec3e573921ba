//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

pub mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, OnEditFailure, RenderTarget};
pub use event::{Action, Event, Toast};
pub use state::{Phase, TurnContext};
pub use transition::{transition, TransitionResult};
