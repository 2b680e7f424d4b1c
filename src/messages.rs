//! User-facing texts
//!
//! Every string a user can see is defined here so the transition function and
//! the dispatcher never format prose themselves.

use crate::error::{BotError, InputError};

pub const WELCOME: &str = "Hi! I can speak any text in your voice.\n\n\
    1. Send me a voice message or an audio file with a sample of your voice (10 seconds or more works best).\n\
    2. Send the text you want me to say.\n\
    3. Pick a speaking style.\n\n\
    /help shows this again, /reset forgets your voice.";

pub const HELP: &str = "How it works:\n\
    • Send a voice message or audio file to set your voice.\n\
    • Send text and choose a style to get it spoken in that voice.\n\
    • Send a new sample at any time to change the voice.\n\n\
    Commands:\n\
    /start - start over\n\
    /reset - forget your voice and any pending text\n\
    /cancel - drop the pending text but keep your voice\n\
    /help - show this message";

pub const RESET_DONE: &str = "Done, I forgot everything. Send a new voice sample to begin.";

pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel. Send a voice sample to begin.";

pub const PROCESSING_SAMPLE: &str = "Got it, analysing your voice…";

pub const CHOOSE_STYLE: &str = "Choose a speaking style:";

pub const MORE_TEXT: &str = "Send more text to hear it in the same voice, or a new sample to change it.";

pub const SEND_SAMPLE_FIRST: &str = "Please send a voice sample first (a voice message or an audio file).";

/// Prompt after a voice was accepted
pub fn voice_saved(max_text_chars: usize) -> String {
    format!("Your voice is ready! Now send the text you want me to say (up to {max_text_chars} characters).")
}

/// Confirmation of /cancel when a voice is kept
pub fn cancelled(max_text_chars: usize) -> String {
    format!("Cancelled. Send new text (up to {max_text_chars} characters).")
}

/// Status shown while synthesis runs
pub fn generating(style_label: &str) -> String {
    format!("Generating speech ({style_label})…")
}

/// Map an error to the text shown to the user
pub fn user_message(error: &BotError) -> String {
    match error {
        BotError::InvalidInput(input) => input_message(input),
        // Provider details stay in the logs
        BotError::Gateway(_) => {
            "Something went wrong while processing your request. Please try again.".to_string()
        }
        BotError::SessionExpired => format!("Your session has expired. {SEND_SAMPLE_FIRST}"),
        BotError::Chat(_) => "Could not fetch your file. Please send it again.".to_string(),
    }
}

fn input_message(error: &InputError) -> String {
    match error {
        InputError::EmptyText => "The text is empty. Please send some words to speak.".to_string(),
        InputError::TextTooLong { len, max } => {
            format!("That text is too long ({len} characters). The limit is {max} characters.")
        }
        InputError::NotAudio { .. } => {
            "That file is not audio. Please send a voice message or an audio file.".to_string()
        }
        InputError::UnsupportedFormat { .. } => {
            "That audio format is not supported. Please use mp3, ogg, wav, m4a or flac.".to_string()
        }
        InputError::SampleTooLarge { max, .. } => {
            format!(
                "That sample is too large. Please send one under {} MB.",
                max / (1024 * 1024)
            )
        }
        InputError::UnsupportedContent => {
            "I can only handle voice samples and text.".to_string()
        }
        InputError::UnknownCommand(name) => {
            format!("Unknown command /{name}. Send /help to see what I can do.")
        }
        InputError::UnknownStyle(_) => "Unknown style. Please pick one of the buttons.".to_string(),
        InputError::Busy => "Still working on your previous request, please wait.".to_string(),
    }
}
