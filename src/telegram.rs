//! Telegram Bot API transport
//!
//! Long-polls for updates, turns them into state machine events and carries
//! replies, keyboards and audio back to the chat.

mod client;
mod poller;
pub mod types;
mod updates;

pub use client::TelegramClient;
pub use poller::poll_updates;
pub use updates::Inbound;

use thiserror::Error;

/// Chat transport failure
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ChatError {
    /// HTTP status or Bot API error code, when there was one
    pub status: Option<u16>,
    pub message: String,
}

impl ChatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// The URL is stripped because it embeds the bot token
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        Self {
            status,
            message: e.without_url().to_string(),
        }
    }
}
