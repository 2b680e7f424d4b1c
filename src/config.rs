//! Bot configuration, read from environment variables
//!
//! Only the bot token and the API key are required. Everything else has a
//! default matching the public MiniMax-style endpoints; the schema knobs exist
//! because the remote contract is not pinned down.

use crate::voice_api::AudioFormat;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MAX_TEXT_CHARS: usize = 1000;
pub const DEFAULT_MAX_SAMPLE_BYTES: u64 = 20 * 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_WORKER_IDLE: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which conversation flow the bot runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowVariant {
    /// sample -> text -> style buttons -> audio
    #[default]
    Guided,
    /// sample -> text -> audio, default style, no buttons
    Quick,
}

impl FromStr for FlowVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guided" => Ok(Self::Guided),
            "quick" => Ok(Self::Quick),
            _ => Err("expected \"guided\" or \"quick\"".to_string()),
        }
    }
}

/// How the voice sample is sent to the clone endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadEncoding {
    /// multipart/form-data with `file` and `label` parts
    #[default]
    Multipart,
    /// JSON body with base64 `audio`
    Base64Json,
}

impl FromStr for UploadEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multipart" => Ok(Self::Multipart),
            "base64" | "json" => Ok(Self::Base64Json),
            _ => Err("expected \"multipart\" or \"base64\"".to_string()),
        }
    }
}

/// Text encoding of audio embedded in a JSON synthesis response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InlineAudioEncoding {
    #[default]
    Base64,
    /// MiniMax `t2a_v2` returns hex
    Hex,
}

impl FromStr for InlineAudioEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            _ => Err("expected \"base64\" or \"hex\"".to_string()),
        }
    }
}

/// Schema assumptions about the remote API, kept out of the gateway code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSchema {
    pub upload_path: String,
    pub synthesis_path: String,
    pub upload_encoding: UploadEncoding,
    /// Preferred key for the voice id in requests and responses
    pub voice_id_field: String,
    pub inline_audio: InlineAudioEncoding,
    pub model: Option<String>,
}

impl Default for ApiSchema {
    fn default() -> Self {
        Self {
            upload_path: "/v1/voice_clone".to_string(),
            synthesis_path: "/v1/t2a_v2".to_string(),
            upload_encoding: UploadEncoding::Multipart,
            voice_id_field: "voice_id".to_string(),
            inline_audio: InlineAudioEncoding::Base64,
            model: None,
        }
    }
}

/// Voice API connection settings
#[derive(Debug, Clone)]
pub struct VoiceApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub schema: ApiSchema,
    pub output_format: AudioFormat,
    pub timeout: Duration,
    pub scratch_dir: PathBuf,
}

impl VoiceApiConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            schema: ApiSchema::default(),
            output_format: AudioFormat::Mp3,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Join the base URL and an endpoint path
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Complete bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub telegram_api_url: String,
    pub voice_api: VoiceApiConfig,
    pub flow_variant: FlowVariant,
    pub max_text_chars: usize,
    pub max_sample_bytes: u64,
    pub session_ttl: Duration,
    pub worker_idle: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        let api_key = get("VOICE_API_KEY").ok_or(ConfigError::Missing("VOICE_API_KEY"))?;

        let defaults = ApiSchema::default();
        let schema = ApiSchema {
            upload_path: get("VOICE_API_UPLOAD_PATH").unwrap_or(defaults.upload_path),
            synthesis_path: get("VOICE_API_SYNTHESIS_PATH").unwrap_or(defaults.synthesis_path),
            upload_encoding: parse_or(
                "VOICE_API_UPLOAD_ENCODING",
                get("VOICE_API_UPLOAD_ENCODING"),
                defaults.upload_encoding,
            )?,
            voice_id_field: get("VOICE_API_VOICE_ID_FIELD").unwrap_or(defaults.voice_id_field),
            inline_audio: parse_or(
                "VOICE_API_INLINE_AUDIO",
                get("VOICE_API_INLINE_AUDIO"),
                defaults.inline_audio,
            )?,
            model: get("VOICE_API_MODEL"),
        };

        let voice_api = VoiceApiConfig {
            api_key,
            base_url: get("VOICE_API_BASE_URL")
                .unwrap_or_else(|| "https://api.minimax.io".to_string()),
            schema,
            output_format: parse_or(
                "VOICE_API_OUTPUT_FORMAT",
                get("VOICE_API_OUTPUT_FORMAT"),
                AudioFormat::Mp3,
            )?,
            timeout: secs_or(
                "VOICE_API_TIMEOUT_SECS",
                get("VOICE_API_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT,
            )?,
            scratch_dir: get("SCRATCH_DIR").map_or_else(std::env::temp_dir, PathBuf::from),
        };

        Ok(Self {
            bot_token,
            telegram_api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| "https://api.telegram.org".to_string()),
            voice_api,
            flow_variant: parse_or("FLOW_VARIANT", get("FLOW_VARIANT"), FlowVariant::Guided)?,
            max_text_chars: parse_or(
                "MAX_TEXT_CHARS",
                get("MAX_TEXT_CHARS"),
                DEFAULT_MAX_TEXT_CHARS,
            )?,
            max_sample_bytes: parse_or(
                "MAX_SAMPLE_BYTES",
                get("MAX_SAMPLE_BYTES"),
                DEFAULT_MAX_SAMPLE_BYTES,
            )?,
            session_ttl: secs_or("SESSION_TTL_SECS", get("SESSION_TTL_SECS"), DEFAULT_SESSION_TTL)?,
            worker_idle: secs_or(
                "WORKER_IDLE_SECS",
                get("WORKER_IDLE_SECS"),
                DEFAULT_WORKER_IDLE,
            )?,
        })
    }
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
        },
    }
}

fn secs_or(
    var: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_or(var, value, default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
