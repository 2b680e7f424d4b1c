//! Pure state transition function
//!
//! Given the same session, context and event this always produces the same
//! session and effects. No I/O happens here.

use super::{Attachment, Command, Effect, Event, FlowContext};
use crate::config::FlowVariant;
use crate::error::{BotError, InputError};
use crate::messages;
use crate::session::{Session, Step};
use crate::styles::{self, StylePreset};
use crate::voice_api::{AudioFormat, SynthesisRequest};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub session: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Events that cannot occur in the current step.
/// User input never produces these; it is answered with `Effect::ReportError`.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    session: &Session,
    context: &FlowContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (session.step, event) {
        // ============================================================
        // Commands
        // ============================================================
        (_, Event::Command(Command::Start)) => Ok(TransitionResult::new(Session::default())
            .with_effect(Effect::DeleteSession)
            .with_effect(Effect::send(messages::WELCOME))),

        (_, Event::Command(Command::Reset)) => Ok(TransitionResult::new(Session::default())
            .with_effect(Effect::DeleteSession)
            .with_effect(Effect::send(messages::RESET_DONE))),

        (_, Event::Command(Command::Help)) => {
            Ok(TransitionResult::new(session.clone()).with_effect(Effect::send(messages::HELP)))
        }

        (Step::Ready, Event::Command(Command::Cancel)) => {
            Ok(TransitionResult::new(session.clone()).with_effect(Effect::report(InputError::Busy)))
        }

        (_, Event::Command(Command::Cancel)) => {
            let settled = session.settle();
            let reply = if settled.is_fresh() {
                messages::NOTHING_TO_CANCEL.to_string()
            } else {
                messages::cancelled(context.max_text_chars)
            };
            Ok(TransitionResult::new(settled).with_effect(Effect::send(reply)))
        }

        (_, Event::Command(Command::Unknown(name))) => Ok(TransitionResult::new(session.clone())
            .with_effect(Effect::report(InputError::UnknownCommand(name)))),

        // ============================================================
        // Input while synthesis is in flight
        // ============================================================
        (Step::Ready, Event::StylePressed { callback_id, .. }) => {
            Ok(TransitionResult::new(session.clone())
                .with_effect(Effect::answer(callback_id))
                .with_effect(Effect::report(InputError::Busy)))
        }

        (
            Step::Ready,
            Event::SampleReceived { .. } | Event::TextReceived { .. } | Event::UnsupportedContent,
        ) => {
            Ok(TransitionResult::new(session.clone()).with_effect(Effect::report(InputError::Busy)))
        }

        // ============================================================
        // Voice samples
        // ============================================================
        (_, Event::SampleReceived { attachment }) => match validate_sample(&attachment, context) {
            Ok(format) => Ok(TransitionResult::new(session.clone())
                .with_effect(Effect::send(messages::PROCESSING_SAMPLE))
                .with_effect(Effect::EstablishVoice { attachment, format })),
            Err(e) => Ok(TransitionResult::new(session.clone()).with_effect(Effect::report(e))),
        },

        (_, Event::UnsupportedContent) => Ok(TransitionResult::new(session.clone())
            .with_effect(Effect::report(InputError::UnsupportedContent))
            .with_effect(Effect::send(next_step_hint(session, context)))),

        (Step::Ready, Event::VoiceEstablished { .. } | Event::VoiceFailed { .. }) => Err(
            TransitionError::InvalidTransition("voice result while synthesizing".to_string()),
        ),

        // A new voice replaces the old one and drops any pending text
        (_, Event::VoiceEstablished { reference }) => {
            Ok(TransitionResult::new(Session::with_voice(reference))
                .with_effect(Effect::send(messages::voice_saved(context.max_text_chars))))
        }

        // The previous voice, if any, stays usable
        (_, Event::VoiceFailed { error }) => Ok(TransitionResult::new(session.clone())
            .with_effect(Effect::report(BotError::Gateway(error)))),

        // ============================================================
        // Text
        // ============================================================
        (Step::AwaitingSample, Event::TextReceived { .. }) => {
            Ok(TransitionResult::new(Session::default())
                .with_effect(Effect::report(BotError::SessionExpired)))
        }

        (Step::AwaitingText | Step::AwaitingStyleChoice, Event::TextReceived { text }) => {
            let text = match validate_text(&text, context) {
                Ok(text) => text,
                Err(e) => {
                    return Ok(
                        TransitionResult::new(session.clone()).with_effect(Effect::report(e))
                    );
                }
            };

            match context.variant {
                FlowVariant::Guided => Ok(TransitionResult::new(Session {
                    step: Step::AwaitingStyleChoice,
                    voice_reference: session.voice_reference.clone(),
                    pending_text: Some(text),
                    style: None,
                })
                .with_effect(Effect::PresentStyles {
                    text: messages::CHOOSE_STYLE.to_string(),
                })),
                FlowVariant::Quick => {
                    let preset = styles::default_preset();
                    let Some(mut result) = begin_synthesis(session, text, preset) else {
                        return Ok(expired(None));
                    };
                    result
                        .effects
                        .insert(0, Effect::send(messages::generating(preset.label)));
                    Ok(result)
                }
            }
        }

        // ============================================================
        // Style buttons
        // ============================================================
        (
            Step::AwaitingStyleChoice,
            Event::StylePressed {
                callback_id,
                data,
                message_id,
            },
        ) => {
            let pending = session
                .pending_text
                .as_deref()
                .filter(|text| !text.is_empty() && text.chars().count() <= context.max_text_chars);
            let Some(pending) = pending else {
                return Ok(expired(Some(callback_id)));
            };

            let Some(preset) = styles::parse_callback(&data).and_then(styles::find) else {
                let id = styles::parse_callback(&data).unwrap_or(&data).to_string();
                return Ok(TransitionResult::new(session.clone())
                    .with_effect(Effect::answer(callback_id))
                    .with_effect(Effect::report(InputError::UnknownStyle(id))));
            };

            let Some(mut result) = begin_synthesis(session, pending.to_string(), preset) else {
                return Ok(expired(Some(callback_id)));
            };

            let status = messages::generating(preset.label);
            let status_effect = match message_id {
                Some(message_id) => Effect::EditButtonMessage {
                    message_id,
                    text: status,
                },
                None => Effect::send(status),
            };
            result
                .effects
                .splice(0..0, [Effect::answer(callback_id), status_effect]);
            Ok(result)
        }

        // Buttons from a keyboard that no longer matches the session
        (_, Event::StylePressed { callback_id, .. }) => Ok(expired(Some(callback_id))),

        // ============================================================
        // Synthesis results
        // ============================================================
        (Step::Ready, Event::SynthesisCompleted { audio }) => {
            Ok(TransitionResult::new(session.settle())
                .with_effect(Effect::DeliverAudio { audio })
                .with_effect(Effect::send(messages::MORE_TEXT)))
        }

        // The voice survives, the text has to be sent again
        (Step::Ready, Event::SynthesisFailed { error }) => {
            Ok(TransitionResult::new(session.settle())
                .with_effect(Effect::report(BotError::Gateway(error))))
        }

        (step, Event::SynthesisCompleted { .. } | Event::SynthesisFailed { .. }) => Err(
            TransitionError::InvalidTransition(format!("synthesis result in step {step:?}")),
        ),
    }
}

/// Check attachment metadata before anything is downloaded
pub fn validate_sample(
    attachment: &Attachment,
    context: &FlowContext,
) -> Result<AudioFormat, InputError> {
    let mime = attachment.mime_type.as_deref().unwrap_or_default();
    if !mime.to_ascii_lowercase().starts_with("audio/") {
        let mime = if mime.is_empty() { "unknown" } else { mime };
        return Err(InputError::NotAudio {
            mime: mime.to_string(),
        });
    }

    let format = AudioFormat::from_mime(mime).ok_or_else(|| InputError::UnsupportedFormat {
        mime: mime.to_string(),
    })?;

    if let Some(size) = attachment.file_size {
        if size > context.max_sample_bytes {
            return Err(InputError::SampleTooLarge {
                size,
                max: context.max_sample_bytes,
            });
        }
    }

    Ok(format)
}

/// Enforce the length limit on the message as sent, counted in characters,
/// and return it trimmed
pub fn validate_text(text: &str, context: &FlowContext) -> Result<String, InputError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyText);
    }

    let len = text.chars().count();
    if len > context.max_text_chars {
        return Err(InputError::TextTooLong {
            len,
            max: context.max_text_chars,
        });
    }

    Ok(trimmed.to_string())
}

fn begin_synthesis(
    session: &Session,
    text: String,
    preset: &StylePreset,
) -> Option<TransitionResult> {
    let voice = session.voice_reference.clone()?;
    let style = preset.parameters();
    let request = SynthesisRequest {
        text: text.clone(),
        voice: voice.clone(),
        emotion: style.emotion.clone(),
        speed: style.speed,
    };

    Some(
        TransitionResult::new(Session {
            step: Step::Ready,
            voice_reference: Some(voice),
            pending_text: Some(text),
            style: Some(style),
        })
        .with_effect(Effect::Synthesize { request }),
    )
}

fn expired(callback_id: Option<String>) -> TransitionResult {
    TransitionResult::new(Session::default())
        .with_effects(callback_id.map(Effect::answer))
        .with_effect(Effect::report(BotError::SessionExpired))
}

fn next_step_hint(session: &Session, context: &FlowContext) -> String {
    match session.step {
        Step::AwaitingSample => messages::SEND_SAMPLE_FIRST.to_string(),
        Step::AwaitingText | Step::Ready => messages::voice_saved(context.max_text_chars),
        Step::AwaitingStyleChoice => messages::CHOOSE_STYLE.to_string(),
    }
}
