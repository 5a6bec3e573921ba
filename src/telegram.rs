//! Chat platform integration (Telegram Bot API)

mod client;
mod error;
pub mod update;

pub use client::TelegramClient;
pub use error::{Ignorable, MessagingError, MessagingErrorKind};
pub use update::{parse_update, MalformedEvent};
