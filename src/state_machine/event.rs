//! Events that can occur in a conversation

use super::state::MessageId;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `/start`: reset to the dashboard on a brand new screen
    Start { message_id: MessageId },

    /// Inline keyboard button on `message_id` was pressed
    ButtonPressed {
        action: Action,
        message_id: MessageId,
    },

    /// Free text typed into the chat
    TextReceived { text: String, message_id: MessageId },

    /// A new screen message was sent (fed back by the router)
    ScreenSent { message_id: MessageId },
}

/// Inline keyboard actions, carried as callback data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    BackHome,
    Finances,
    RefreshFinances,
    AddExpense,
    Members,
    Join,
    Settings,
    History,
    Noop,
    Leave,
    /// Callback data this build does not know
    Unknown(String),
}

/// Transient acknowledgement shown on button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toast {
    pub text: &'static str,
    /// Modal alert instead of a passing notice
    pub alert: bool,
}

impl Toast {
    const fn notice(text: &'static str) -> Self {
        Self { text, alert: false }
    }

    const fn alert(text: &'static str) -> Self {
        Self { text, alert: true }
    }
}

const CALLBACK_PREFIX: &str = "btn_";

impl Action {
    /// Parse callback data. The `btn_` prefix is optional.
    pub fn from_callback_data(data: &str) -> Self {
        let name = data.strip_prefix(CALLBACK_PREFIX).unwrap_or(data);
        match name {
            "back_home" => Action::BackHome,
            "finances" => Action::Finances,
            "refresh_finances" => Action::RefreshFinances,
            "add_expense" => Action::AddExpense,
            "members" => Action::Members,
            "join" => Action::Join,
            "settings" => Action::Settings,
            "history" => Action::History,
            "noop" => Action::Noop,
            "leave" => Action::Leave,
            _ => Action::Unknown(data.to_string()),
        }
    }

    /// Callback data attached to keyboard buttons
    pub fn callback_data(&self) -> String {
        let name = match self {
            Action::BackHome => "back_home",
            Action::Finances => "finances",
            Action::RefreshFinances => "refresh_finances",
            Action::AddExpense => "add_expense",
            Action::Members => "members",
            Action::Join => "join",
            Action::Settings => "settings",
            Action::History => "history",
            Action::Noop => "noop",
            Action::Leave => "leave",
            Action::Unknown(data) => return data.clone(),
        };
        format!("{CALLBACK_PREFIX}{name}")
    }

    /// Acknowledgement sent before any heavier work
    pub fn toast(&self) -> Toast {
        match self {
            Action::Join => Toast::notice("📝 Signing the ledger..."),
            Action::History => Toast::alert("📜 Detailed history is coming in v1.1!"),
            Action::Noop => Toast::notice("Feature coming soon!"),
            Action::Leave => Toast::alert("🚫 Leaving is disabled in this version."),
            Action::Unknown(_) => Toast::notice("🚧 Not yet available"),
            _ => Toast::notice("⏳ Loading..."),
        }
    }
}
