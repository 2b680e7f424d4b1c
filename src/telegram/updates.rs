//! Update to event conversion

use super::types::{Message, Update};
use crate::session::UserId;
use crate::state_machine::{Attachment, Event};

/// An event addressed to one user's conversation
#[derive(Debug, Clone)]
pub struct Inbound {
    pub user_id: UserId,
    pub chat_id: i64,
    pub event: Event,
}

/// Convert an update into an event. Updates the bot does not handle
/// (edited messages, channel posts, messages from other bots) give `None`.
pub fn to_inbound(update: Update) -> Option<Inbound> {
    if let Some(query) = update.callback_query {
        let chat_id = query
            .message
            .as_ref()
            .map_or(query.from.id, |message| message.chat.id);
        return Some(Inbound {
            user_id: query.from.id,
            chat_id,
            event: Event::StylePressed {
                callback_id: query.id,
                data: query.data.unwrap_or_default(),
                message_id: query.message.map(|message| message.message_id),
            },
        });
    }

    let message = update.message?;
    let from = message.from.as_ref()?;
    if from.is_bot {
        return None;
    }
    let user_id = from.id;

    Some(Inbound {
        user_id,
        chat_id: message.chat.id,
        event: message_event(message),
    })
}

fn message_event(message: Message) -> Event {
    if let Some(voice) = message.voice {
        return Event::SampleReceived {
            attachment: Attachment {
                file_id: voice.file_id,
                mime_type: Some(voice.mime_type.unwrap_or_else(|| "audio/ogg".to_string())),
                file_size: voice.file_size,
                duration_secs: voice.duration,
            },
        };
    }

    if let Some(audio) = message.audio {
        return Event::SampleReceived {
            attachment: Attachment {
                file_id: audio.file_id,
                mime_type: audio
                    .mime_type
                    .or_else(|| mime_from_file_name(audio.file_name.as_deref())),
                file_size: audio.file_size,
                duration_secs: audio.duration,
            },
        };
    }

    if let Some(document) = message.document {
        return Event::SampleReceived {
            attachment: Attachment {
                file_id: document.file_id,
                mime_type: document
                    .mime_type
                    .or_else(|| mime_from_file_name(document.file_name.as_deref())),
                file_size: document.file_size,
                duration_secs: None,
            },
        };
    }

    match message.text {
        Some(text) => Event::from_text(text),
        None => Event::UnsupportedContent,
    }
}

/// Guess a MIME type from the file name when the client sent none
fn mime_from_file_name(name: Option<&str>) -> Option<String> {
    mime_guess::from_path(name?)
        .first()
        .map(|mime| mime.essence_str().to_string())
}
