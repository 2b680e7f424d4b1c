//! Voice-cloning / TTS API abstraction
//!
//! The state machine only ever sees this interface: upload a sample to get a
//! reference, synthesize text with a reference to get audio bytes. All
//! assumptions about the remote schema stay behind it.

mod error;
mod http;
mod normalize;
mod scratch;
mod types;

pub use error::{GatewayError, GatewayErrorKind};
pub use http::HttpVoiceGateway;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for voice providers
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Upload a sample and get a reusable voice reference
    async fn establish_voice_reference(
        &self,
        sample: &VoiceSample,
    ) -> Result<VoiceReference, GatewayError>;

    /// Speak text with a previously established voice
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio, GatewayError>;
}

/// Logging wrapper for voice providers
pub struct LoggingGateway {
    inner: Arc<dyn VoiceGateway>,
}

impl LoggingGateway {
    pub fn new(inner: Arc<dyn VoiceGateway>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl VoiceGateway for LoggingGateway {
    async fn establish_voice_reference(
        &self,
        sample: &VoiceSample,
    ) -> Result<VoiceReference, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.establish_voice_reference(sample).await;
        let duration = start.elapsed();

        match &result {
            Ok(reference) => {
                tracing::info!(
                    duration_ms = %duration.as_millis(),
                    sample_bytes = sample.bytes.len(),
                    format = ?sample.format,
                    voice = %reference,
                    "Voice reference established"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    sample_bytes = sample.bytes.len(),
                    kind = e.kind.label(),
                    error = %e.message,
                    "Voice upload failed"
                );
            }
        }

        result
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.synthesize(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(audio) => {
                tracing::info!(
                    duration_ms = %duration.as_millis(),
                    voice = %request.voice,
                    text_chars = request.text.chars().count(),
                    emotion = %request.emotion,
                    audio_bytes = audio.bytes.len(),
                    "Synthesis completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    voice = %request.voice,
                    kind = e.kind.label(),
                    error = %e.message,
                    "Synthesis failed"
                );
            }
        }

        result
    }
}
