//! Bot API HTTP client

use super::types::{ApiResponse, File, InlineKeyboardMarkup, Message, Update};
use super::ChatError;
use crate::voice_api::SynthesizedAudio;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;

/// Slack on top of the long-poll timeout before the request itself gives up
const POLL_GRACE: Duration = Duration::from_secs(15);

/// Timeout for ordinary method calls and file transfers
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Telegram Bot API client
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    /// `{api}/bot{token}`; never logged
    method_base: String,
    /// `{api}/file/bot{token}`; never logged
    file_base: String,
}

impl TelegramClient {
    pub fn new(token: &str, api_url: &str) -> Result<Self, ChatError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ChatError::new(format!("Failed to create HTTP client: {e}")))?;
        let api_url = api_url.trim_end_matches('/');
        Ok(Self {
            client,
            method_base: format!("{api_url}/bot{token}"),
            file_base: format!("{api_url}/file/bot{token}"),
        })
    }

    /// POST a JSON method call and unwrap the response envelope
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<T, ChatError> {
        let response = self
            .client
            .post(format!("{}/{method}", self.method_base))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(ChatError::from_reqwest)?;
        Self::unwrap_envelope(method, response).await
    }

    async fn unwrap_envelope<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, ChatError> {
        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            ChatError::with_status(
                status.as_u16(),
                format!("{method}: unreadable response: {}", e.without_url()),
            )
        })?;

        if !envelope.ok {
            let code = envelope.error_code.unwrap_or_else(|| status.as_u16());
            let description = envelope
                .description
                .unwrap_or_else(|| "no description".to_string());
            return Err(ChatError::with_status(code, format!("{method}: {description}")));
        }

        envelope
            .result
            .ok_or_else(|| ChatError::new(format!("{method}: response without result")))
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, ChatError> {
        let mut body = json!({
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", &body, timeout + POLL_GRACE).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message, ChatError> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = json!(keyboard);
        }
        self.call("sendMessage", &body, REQUEST_TIMEOUT).await
    }

    /// Replace a message's text, dropping its keyboard
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), ChatError> {
        let body = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        // Returns the edited Message, or `true` for inline messages
        let _: Value = self.call("editMessageText", &body, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_id: &str) -> Result<(), ChatError> {
        let body = json!({ "callback_query_id": callback_id });
        let _: bool = self
            .call("answerCallbackQuery", &body, REQUEST_TIMEOUT)
            .await?;
        Ok(())
    }

    pub async fn send_audio(
        &self,
        chat_id: i64,
        audio: &SynthesizedAudio,
    ) -> Result<Message, ChatError> {
        let part = Part::bytes(audio.bytes.clone())
            .file_name(audio.file_name())
            .mime_str(audio.format.mime())
            .map_err(|e| ChatError::new(format!("Invalid audio MIME type: {e}")))?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("audio", part);

        let response = self
            .client
            .post(format!("{}/sendAudio", self.method_base))
            .timeout(REQUEST_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(ChatError::from_reqwest)?;
        Self::unwrap_envelope("sendAudio", response).await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File, ChatError> {
        self.call("getFile", &json!({ "file_id": file_id }), REQUEST_TIMEOUT)
            .await
    }

    /// Resolve and download a file, refusing anything over `max_bytes`
    pub async fn download(&self, file_id: &str, max_bytes: u64) -> Result<Vec<u8>, ChatError> {
        let file = self.get_file(file_id).await?;
        if file.file_size.is_some_and(|size| size > max_bytes) {
            return Err(ChatError::new(format!(
                "file {} exceeds {max_bytes} bytes",
                file.file_id
            )));
        }
        let path = file
            .file_path
            .ok_or_else(|| ChatError::new(format!("file {} has no download path", file.file_id)))?;

        let response = self
            .client
            .get(format!("{}/{path}", self.file_base))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(ChatError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::with_status(
                status.as_u16(),
                format!("file download failed with HTTP {status}"),
            ));
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ChatError::from_reqwest)?;
            if (bytes.len() + chunk.len()) as u64 > max_bytes {
                return Err(ChatError::new(format!("file exceeds {max_bytes} bytes")));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}
