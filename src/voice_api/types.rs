//! Common types for voice API interactions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque id of a cloned voice profile held by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceReference(String);

impl VoiceReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Audio container formats the bot accepts and requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Ogg,
    Wav,
    M4a,
    Flac,
}

impl AudioFormat {
    /// Resolve a MIME type such as `audio/ogg; codecs=opus`
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "audio/mpeg" | "audio/mp3" | "audio/mpeg3" => Some(Self::Mp3),
            "audio/ogg" | "audio/opus" | "audio/x-opus+ogg" => Some(Self::Ogg),
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Some(Self::Wav),
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Some(Self::M4a),
            "audio/flac" | "audio/x-flac" => Some(Self::Flac),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Wav => "wav",
            Self::M4a => "m4a",
            Self::Flac => "flac",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::Wav => "audio/wav",
            Self::M4a => "audio/mp4",
            Self::Flac => "audio/flac",
        }
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "ogg" | "opus" => Ok(Self::Ogg),
            "wav" => Ok(Self::Wav),
            "m4a" | "mp4" => Ok(Self::M4a),
            "flac" => Ok(Self::Flac),
            other => Err(format!("unknown audio format {other:?}")),
        }
    }
}

/// A user's voice sample ready for upload
#[derive(Debug, Clone)]
pub struct VoiceSample {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    /// Label attached to the cloned voice on the remote side
    pub label: String,
}

impl VoiceSample {
    pub fn new(bytes: Vec<u8>, format: AudioFormat) -> Self {
        Self {
            bytes,
            format,
            label: format!("voice-{}", uuid::Uuid::new_v4().simple()),
        }
    }
}

/// Synthesis request
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: VoiceReference,
    pub emotion: String,
    pub speed: f32,
}

/// Synthesized audio, normalized to raw bytes
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

impl SynthesizedAudio {
    pub fn file_name(&self) -> String {
        format!("speech.{}", self.format.extension())
    }
}
