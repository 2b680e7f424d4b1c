//! Per-user session records and the in-memory session store

mod store;

pub use store::SessionStore;

use crate::voice_api::VoiceReference;
use serde::{Deserialize, Serialize};

/// Chat platform user identifier
pub type UserId = i64;

/// Where a user currently is in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// No voice yet, waiting for a sample
    #[default]
    AwaitingSample,
    /// Voice established, waiting for text to speak
    AwaitingText,
    /// Text accepted, waiting for a style button
    AwaitingStyleChoice,
    /// Synthesis request in flight
    Ready,
}

/// Emotion and speed applied during synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleParameters {
    pub emotion: String,
    pub speed: f32,
}

impl StyleParameters {
    pub fn new(emotion: impl Into<String>, speed: f32) -> Self {
        Self {
            emotion: emotion.into(),
            speed,
        }
    }
}

/// Conversation progress for one user
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Session {
    pub step: Step,
    pub voice_reference: Option<VoiceReference>,
    pub pending_text: Option<String>,
    pub style: Option<StyleParameters>,
}

impl Session {
    /// Session with an established voice, waiting for text
    pub fn with_voice(reference: VoiceReference) -> Self {
        Self {
            step: Step::AwaitingText,
            voice_reference: Some(reference),
            pending_text: None,
            style: None,
        }
    }

    /// Drop pending text and style, keeping the voice if there is one
    pub fn settle(&self) -> Self {
        match &self.voice_reference {
            Some(reference) => Self::with_voice(reference.clone()),
            None => Self::default(),
        }
    }

    pub fn is_fresh(&self) -> bool {
        *self == Self::default()
    }
}
