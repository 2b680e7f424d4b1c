//! Flow configuration and inbound payload types

use crate::config::{BotConfig, FlowVariant, DEFAULT_MAX_SAMPLE_BYTES, DEFAULT_MAX_TEXT_CHARS};
use serde::{Deserialize, Serialize};

/// Immutable settings consulted by every transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowContext {
    pub variant: FlowVariant,
    pub max_text_chars: usize,
    pub max_sample_bytes: u64,
}

impl FlowContext {
    pub fn new(variant: FlowVariant) -> Self {
        Self {
            variant,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            max_sample_bytes: DEFAULT_MAX_SAMPLE_BYTES,
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            variant: config.flow_variant,
            max_text_chars: config.max_text_chars,
            max_sample_bytes: config.max_sample_bytes,
        }
    }
}

impl Default for FlowContext {
    fn default() -> Self {
        Self::new(FlowVariant::Guided)
    }
}

/// A file the user attached, as described by the chat platform.
/// The bytes are downloaded only after the metadata passes validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_id: String,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
    pub duration_secs: Option<u32>,
}

/// Slash commands, handled outside the sample/text/style sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Reset,
    Help,
    Cancel,
    Unknown(String),
}

impl Command {
    /// Parse `/name`, `/name@BotName` or `/name args`. Non-commands give `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix('/')?;
        // The name must follow the slash directly
        let word = rest.split(char::is_whitespace).next().unwrap_or_default();
        let name = word.split('@').next().unwrap_or_default();
        if name.is_empty() {
            return None;
        }
        Some(match name.to_ascii_lowercase().as_str() {
            "start" => Self::Start,
            "reset" => Self::Reset,
            "help" => Self::Help,
            "cancel" => Self::Cancel,
            _ => Self::Unknown(name.to_string()),
        })
    }
}
