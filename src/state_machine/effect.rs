//! Effects produced by state transitions

use super::state::Attachment;
use crate::error::BotError;
use crate::voice_api::{AudioFormat, SynthesisRequest, SynthesizedAudio};

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Send a plain text message
    SendText { text: String },

    /// Send a message with the style keyboard attached
    PresentStyles { text: String },

    /// Stop the button's loading indicator
    AnswerButton { callback_id: String },

    /// Replace the text of the message that carried the keyboard
    EditButtonMessage { message_id: i64, text: String },

    /// Download the attachment and upload it to the voice API.
    /// Produces `VoiceEstablished` or `VoiceFailed`.
    EstablishVoice {
        attachment: Attachment,
        format: AudioFormat,
    },

    /// Request synthesis. Produces `SynthesisCompleted` or `SynthesisFailed`.
    Synthesize { request: SynthesisRequest },

    /// Send synthesized audio to the user
    DeliverAudio { audio: SynthesizedAudio },

    /// Tell the user what went wrong
    ReportError { error: BotError },

    /// Remove the session from the store
    DeleteSession,
}

impl Effect {
    pub fn send(text: impl Into<String>) -> Self {
        Effect::SendText { text: text.into() }
    }

    pub fn report(error: impl Into<BotError>) -> Self {
        Effect::ReportError {
            error: error.into(),
        }
    }

    pub fn answer(callback_id: impl Into<String>) -> Self {
        Effect::AnswerButton {
            callback_id: callback_id.into(),
        }
    }

    /// Whether executing this effect calls the voice API
    pub fn calls_gateway(&self) -> bool {
        matches!(self, Effect::EstablishVoice { .. } | Effect::Synthesize { .. })
    }
}
