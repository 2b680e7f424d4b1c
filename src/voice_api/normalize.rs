//! Response normalization
//!
//! The remote contract is not fixed. Synthesis may answer with raw audio,
//! with JSON carrying base64 audio, or with JSON pointing at a URL to fetch.
//! Voice ids may sit at the top level or under `data`. Everything that
//! guesses at field names lives here.

use super::{GatewayError, VoiceReference};
use crate::config::InlineAudioEncoding;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::Value;

const REFERENCE_KEYS: &[&str] = &["voice_id", "id", "reference_id"];
const INLINE_AUDIO_KEYS: &[&str] = &["audio", "audio_base64", "audio_content", "audioContent"];
const URL_KEYS: &[&str] = &["audio_url", "url", "audio_file", "download_url"];
const NESTED_KEYS: &[&str] = &["data", "result"];

/// Where the synthesized audio can be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioLocation {
    Inline(Vec<u8>),
    Remote(String),
}

/// Whether a response body should be taken as audio bytes as-is
pub fn is_binary_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("audio/") || essence == "application/octet-stream"
}

/// Some APIs report failures with a 200 status and an error envelope
pub fn check_embedded_status(value: &Value) -> Result<(), GatewayError> {
    if let Some(base) = value.get("base_resp") {
        let code = base.get("status_code").and_then(Value::as_i64).unwrap_or(0);
        if code != 0 {
            let message = base
                .get("status_msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(GatewayError::rejected(
                u16::try_from(code).unwrap_or(0),
                format!("Remote status {code}: {message}"),
            ));
        }
    }

    match value.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(message)) => Err(GatewayError::rejected(0, message.clone())),
        Some(other) => {
            let message = other
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| other.to_string(), ToString::to_string);
            Err(GatewayError::rejected(0, message))
        }
    }
}

/// Extract the voice reference from a clone response
pub fn extract_reference(value: &Value, preferred_key: &str) -> Option<VoiceReference> {
    let keys: Vec<&str> = std::iter::once(preferred_key)
        .chain(REFERENCE_KEYS.iter().copied())
        .collect();

    candidates(value).find_map(|object| {
        keys.iter()
            .find_map(|key| object.get(*key).and_then(scalar_to_string))
            .map(VoiceReference::new)
    })
}

/// Find the audio in a JSON synthesis response
pub fn locate_audio(
    value: &Value,
    encoding: InlineAudioEncoding,
) -> Result<AudioLocation, GatewayError> {
    for object in candidates(value) {
        for key in INLINE_AUDIO_KEYS {
            if let Some(Value::String(data)) = object.get(*key) {
                if is_url(data) {
                    return Ok(AudioLocation::Remote(data.clone()));
                }
                return decode_inline(data, encoding).map(AudioLocation::Inline);
            }
        }
        for key in URL_KEYS {
            if let Some(Value::String(url)) = object.get(*key) {
                if is_url(url) {
                    return Ok(AudioLocation::Remote(url.clone()));
                }
            }
        }
    }
    Err(GatewayError::malformed(
        "Response carries neither inline audio nor an audio URL",
    ))
}

/// The top-level object followed by any nested `data`/`result` objects
fn candidates(value: &Value) -> impl Iterator<Item = &Value> {
    std::iter::once(value)
        .chain(NESTED_KEYS.iter().filter_map(move |key| value.get(*key)))
        .filter(|v| v.is_object())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}

/// Decode inline audio in the configured encoding. A
/// `data:audio/...;base64,` URI is always base64.
fn decode_inline(data: &str, encoding: InlineAudioEncoding) -> Result<Vec<u8>, GatewayError> {
    let (payload, encoding) = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => (rest, InlineAudioEncoding::Base64),
        _ => (data, encoding),
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = match encoding {
        InlineAudioEncoding::Base64 => BASE64.decode(cleaned.as_bytes()).map_err(|e| {
            GatewayError::malformed(format!("Inline audio is not valid base64: {e}"))
        })?,
        InlineAudioEncoding::Hex => decode_hex(&cleaned)
            .ok_or_else(|| GatewayError::malformed("Inline audio is not valid hex"))?,
    };
    if bytes.is_empty() {
        return Err(GatewayError::malformed("Inline audio is empty"));
    }
    Ok(bytes)
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    s.as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = char::from(pair[0]).to_digit(16)?;
            let lo = char::from(pair[1]).to_digit(16)?;
            u8::try_from(hi * 16 + lo).ok()
        })
        .collect()
}
