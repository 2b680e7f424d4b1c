//! Bot error taxonomy
//!
//! Every failure that reaches a user is a `BotError`. The mapping to
//! user-facing text lives in `messages::user_message`.

use crate::telegram::ChatError;
use crate::voice_api::GatewayError;
use thiserror::Error;

/// Errors surfaced at the dispatch boundary
#[derive(Debug, Clone, Error)]
pub enum BotError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("voice API call failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("session expired")]
    SessionExpired,

    #[error("chat transport failed: {0}")]
    Chat(#[from] ChatError),
}

impl BotError {
    /// Short label for structured logs
    pub fn kind_label(&self) -> &'static str {
        match self {
            BotError::InvalidInput(_) => "invalid_input",
            BotError::Gateway(e) => e.kind.label(),
            BotError::SessionExpired => "session_expired",
            BotError::Chat(_) => "chat",
        }
    }
}

/// Rejected user input. Never changes the session step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("text is empty")]
    EmptyText,

    #[error("text is {len} characters, limit is {max}")]
    TextTooLong { len: usize, max: usize },

    #[error("attachment is not audio ({mime})")]
    NotAudio { mime: String },

    #[error("unsupported audio format ({mime})")]
    UnsupportedFormat { mime: String },

    #[error("sample is {size} bytes, limit is {max}")]
    SampleTooLarge { size: u64, max: u64 },

    #[error("message has no text or audio")]
    UnsupportedContent,

    #[error("unknown command /{0}")]
    UnknownCommand(String),

    #[error("unknown style {0:?}")]
    UnknownStyle(String),

    #[error("a synthesis request is still running")]
    Busy,
}
