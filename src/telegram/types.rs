//! Bot API wire types
//!
//! Only the fields the bot reads are modelled; serde ignores the rest.

use crate::styles::{StylePreset, BUTTONS_PER_ROW};
use serde::{Deserialize, Serialize};

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub voice: Option<Voice>,
    pub audio: Option<Audio>,
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Voice note recorded in the app (always OGG/Opus)
#[derive(Debug, Clone, Deserialize)]
pub struct Voice {
    pub file_id: String,
    pub duration: Option<u32>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

/// Audio file sent as music
#[derive(Debug, Clone, Deserialize)]
pub struct Audio {
    pub file_id: String,
    pub duration: Option<u32>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

/// Generic file attachment
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// Result of `getFile`
#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_size: Option<u64>,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardMarkup {
    /// One button per preset, laid out in rows
    pub fn styles(presets: &[StylePreset]) -> Self {
        let inline_keyboard = presets
            .chunks(BUTTONS_PER_ROW)
            .map(|row| {
                row.iter()
                    .map(|preset| InlineKeyboardButton {
                        text: preset.label.to_string(),
                        callback_data: preset.callback_data(),
                    })
                    .collect()
            })
            .collect();
        Self { inline_keyboard }
    }
}
