//! Screen copy and inline keyboards
//!
//! Pure rendering: the router loads whatever data a view needs and hands it
//! to the builders here. All user-supplied text is HTML-escaped.

use crate::db::{ChatId, MessageId, Participant};
use crate::ledger::{format_money, render_tree, PayerTotal};
use crate::parser::{ParseFailure, ParsedExpense};
use crate::state_machine::effect::RenderTarget;
use crate::state_machine::event::Action;

/// Which screen to show. Data-less; filled in at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Welcome,
    /// Confirmation of a just-recorded expense, above the main menu
    Recorded(ParsedExpense),
    Finances { refreshed: bool },
    Prompt { failure: Option<ParseFailure> },
    Members,
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

impl Button {
    fn new(label: &str, action: Action) -> Self {
        Self {
            label: label.to_string(),
            action,
        }
    }
}

/// Rows of inline buttons
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

/// Rendered text plus keyboard, not yet addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub keyboard: Keyboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Edit,
    Send,
}

/// Instruction to the messenger: show this screen here
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenDirective {
    pub operation: Operation,
    pub chat_id: ChatId,
    /// Set for edits only
    pub message_id: Option<MessageId>,
    pub text: String,
    pub keyboard: Keyboard,
}

impl Screen {
    pub fn directive(&self, chat_id: ChatId, target: RenderTarget) -> ScreenDirective {
        let (operation, message_id) = match target {
            RenderTarget::Send => (Operation::Send, None),
            RenderTarget::Edit(id) => (Operation::Edit, Some(id)),
        };
        ScreenDirective {
            operation,
            chat_id,
            message_id,
            text: self.text.clone(),
            keyboard: self.keyboard.clone(),
        }
    }
}

// ============================================================================
// Keyboards
// ============================================================================

pub fn main_menu() -> Keyboard {
    Keyboard {
        rows: vec![
            vec![Button::new("💸 Add Expense", Action::AddExpense)],
            vec![
                Button::new("💰 Finances", Action::Finances),
                Button::new("👥 Members", Action::Members),
            ],
            vec![
                Button::new("⚙️ Settings", Action::Settings),
                Button::new("📜 History", Action::History),
            ],
        ],
    }
}

fn home_row() -> Vec<Button> {
    vec![Button::new("🏠 Home", Action::BackHome)]
}

fn finances_keyboard() -> Keyboard {
    Keyboard {
        rows: vec![
            vec![Button::new("🔄 Refresh", Action::RefreshFinances)],
            home_row(),
        ],
    }
}

fn cancel_keyboard() -> Keyboard {
    Keyboard {
        rows: vec![vec![Button::new("❌ Cancel", Action::BackHome)]],
    }
}

fn members_keyboard() -> Keyboard {
    Keyboard {
        rows: vec![
            vec![Button::new("✍️ Join the Guild", Action::Join)],
            vec![Button::new("🚪 Leave", Action::Leave)],
            home_row(),
        ],
    }
}

fn settings_keyboard() -> Keyboard {
    Keyboard {
        rows: vec![
            vec![Button::new("🔔 Notifications: On", Action::Noop)],
            vec![Button::new("💱 Currency", Action::Noop)],
            home_row(),
        ],
    }
}

// ============================================================================
// Screens
// ============================================================================

const WELCOME_TEXT: &str = "<b>🏰 Guild Ledger</b>\n\n\
    Track shared expenses with your guild.\n\
    Choose an option below.";

const PROMPT_TEXT: &str = "<b>💸 Add Expense</b>\n\n\
    Type the amount and what it was for, e.g.\n\
    <code>20 lunch</code>\n\
    <code>15.50 coffee with Alice and Bob</code>";

pub fn welcome() -> Screen {
    Screen {
        text: WELCOME_TEXT.to_string(),
        keyboard: main_menu(),
    }
}

pub fn recorded(expense: &ParsedExpense, currency: &str) -> Screen {
    let mut text = format!(
        "<b>✅ Recorded:</b> {} for {}",
        escape_html(&format_money(expense.amount, currency)),
        escape_html(&expense.description)
    );
    if !expense.involved.is_empty() {
        text.push_str(&format!(" (with {})", escape_html(&expense.involved.join(", "))));
    }
    text.push_str("\n\n");
    text.push_str(WELCOME_TEXT);

    Screen {
        text,
        keyboard: main_menu(),
    }
}

pub fn prompt(failure: Option<ParseFailure>) -> Screen {
    let text = match failure {
        None => PROMPT_TEXT.to_string(),
        Some(failure) => format!(
            "⚠️ <b>Could not parse that.</b> {}\nTry again, e.g. <code>20 lunch</code>\n\n{PROMPT_TEXT}",
            failure_hint(failure)
        ),
    };
    Screen {
        text,
        keyboard: cancel_keyboard(),
    }
}

fn failure_hint(failure: ParseFailure) -> &'static str {
    match failure {
        ParseFailure::NoAmount => "I couldn't find an amount in that message.",
        ParseFailure::InvalidAmount => {
            "Amounts must be positive, without thousands separators, with at most two decimals."
        }
    }
}

pub fn finances(totals: &[PayerTotal], refreshed: bool, currency: &str) -> Screen {
    let mut text = format!(
        "<b>💰 Finances</b>\n\n<pre>{}</pre>",
        escape_html(&render_tree(totals, currency))
    );
    if refreshed {
        text.push_str("\n\n<i>Last updated: just now</i>");
    }
    Screen {
        text,
        keyboard: finances_keyboard(),
    }
}

pub fn members(participants: &[Participant]) -> Screen {
    let mut text = String::from("<b>👥 Guild Members</b>\n\n");
    if participants.is_empty() {
        text.push_str("<i>No members yet. Be the first to join!</i>");
    } else {
        let lines: Vec<String> = participants
            .iter()
            .map(|p| match &p.full_name {
                Some(full_name) => format!(
                    "👤 <b>{}</b> ({})",
                    escape_html(&p.display_name),
                    escape_html(full_name)
                ),
                None => format!("👤 <b>{}</b>", escape_html(&p.display_name)),
            })
            .collect();
        text.push_str(&lines.join("\n"));
    }
    Screen {
        text,
        keyboard: members_keyboard(),
    }
}

pub fn settings() -> Screen {
    Screen {
        text: "<b>⚙️ Settings</b>\n\nPreferences are shared by the whole guild.".to_string(),
        keyboard: settings_keyboard(),
    }
}

/// Escape text for the chat platform's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
