//! Events that can occur in a user's conversation

use super::state::{Attachment, Command};
use crate::voice_api::{GatewayError, SynthesizedAudio, VoiceReference};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Command(Command),
    SampleReceived {
        attachment: Attachment,
    },
    TextReceived {
        text: String,
    },
    StylePressed {
        callback_id: String,
        data: String,
        /// Message that carried the keyboard, if still known
        message_id: Option<i64>,
    },
    /// Sticker, photo, location or anything else without text or audio
    UnsupportedContent,

    // Voice API events
    VoiceEstablished {
        reference: VoiceReference,
    },
    VoiceFailed {
        error: GatewayError,
    },
    SynthesisCompleted {
        audio: SynthesizedAudio,
    },
    SynthesisFailed {
        error: GatewayError,
    },
}

impl Event {
    /// Map a plain text message to a command or text event
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        match Command::parse(&text) {
            Some(command) => Event::Command(command),
            None => Event::TextReceived { text },
        }
    }

    /// Short label for structured logs
    pub fn label(&self) -> &'static str {
        match self {
            Event::Command(_) => "command",
            Event::SampleReceived { .. } => "sample_received",
            Event::TextReceived { .. } => "text_received",
            Event::StylePressed { .. } => "style_pressed",
            Event::UnsupportedContent => "unsupported_content",
            Event::VoiceEstablished { .. } => "voice_established",
            Event::VoiceFailed { .. } => "voice_failed",
            Event::SynthesisCompleted { .. } => "synthesis_completed",
            Event::SynthesisFailed { .. } => "synthesis_failed",
        }
    }
}
