//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the worker with mock implementations.

use crate::styles::PRESETS;
use crate::telegram::types::InlineKeyboardMarkup;
use crate::telegram::{ChatError, TelegramClient};
use crate::voice_api::{
    GatewayError, SynthesisRequest, SynthesizedAudio, VoiceGateway, VoiceReference, VoiceSample,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatOutbound: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChatError>;

    /// Send text with one button per style preset
    async fn send_style_keyboard(&self, chat_id: i64, text: &str) -> Result<(), ChatError>;

    async fn edit_text(&self, chat_id: i64, message_id: i64, text: &str)
        -> Result<(), ChatError>;

    async fn answer_button(&self, callback_id: &str) -> Result<(), ChatError>;

    async fn send_audio(&self, chat_id: i64, audio: &SynthesizedAudio) -> Result<(), ChatError>;

    /// Download an attachment the user sent
    async fn fetch_file(&self, file_id: &str, max_bytes: u64) -> Result<Vec<u8>, ChatError>;
}

#[async_trait]
impl ChatOutbound for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChatError> {
        self.send_message(chat_id, text, None).await.map(|_| ())
    }

    async fn send_style_keyboard(&self, chat_id: i64, text: &str) -> Result<(), ChatError> {
        let keyboard = InlineKeyboardMarkup::styles(PRESETS);
        self.send_message(chat_id, text, Some(&keyboard))
            .await
            .map(|_| ())
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), ChatError> {
        self.edit_message_text(chat_id, message_id, text).await
    }

    async fn answer_button(&self, callback_id: &str) -> Result<(), ChatError> {
        self.answer_callback_query(callback_id).await
    }

    async fn send_audio(&self, chat_id: i64, audio: &SynthesizedAudio) -> Result<(), ChatError> {
        TelegramClient::send_audio(self, chat_id, audio)
            .await
            .map(|_| ())
    }

    async fn fetch_file(&self, file_id: &str, max_bytes: u64) -> Result<Vec<u8>, ChatError> {
        self.download(file_id, max_bytes).await
    }
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ChatOutbound + ?Sized> ChatOutbound for Arc<T> {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChatError> {
        (**self).send_text(chat_id, text).await
    }

    async fn send_style_keyboard(&self, chat_id: i64, text: &str) -> Result<(), ChatError> {
        (**self).send_style_keyboard(chat_id, text).await
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), ChatError> {
        (**self).edit_text(chat_id, message_id, text).await
    }

    async fn answer_button(&self, callback_id: &str) -> Result<(), ChatError> {
        (**self).answer_button(callback_id).await
    }

    async fn send_audio(&self, chat_id: i64, audio: &SynthesizedAudio) -> Result<(), ChatError> {
        (**self).send_audio(chat_id, audio).await
    }

    async fn fetch_file(&self, file_id: &str, max_bytes: u64) -> Result<Vec<u8>, ChatError> {
        (**self).fetch_file(file_id, max_bytes).await
    }
}

#[async_trait]
impl<T: VoiceGateway + ?Sized> VoiceGateway for Arc<T> {
    async fn establish_voice_reference(
        &self,
        sample: &VoiceSample,
    ) -> Result<VoiceReference, GatewayError> {
        (**self).establish_voice_reference(sample).await
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio, GatewayError> {
        (**self).synthesize(request).await
    }
}
