//! Voice API error types

use thiserror::Error;

/// Voice API error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Transport, message)
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::RemoteRejected { status }, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::MalformedResponse, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Io, message)
    }

    /// Map a reqwest send/read failure. Timeouts count as transport errors.
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::transport(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            Self::transport(format!("Connection failed: {e}"))
        } else {
            Self::transport(format!("Request failed: {e}"))
        }
    }
}

/// Error classification, used for diagnostics only.
/// Users see the same message for every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Network failure or timeout
    Transport,
    /// Non-success status (HTTP or embedded in the body)
    RemoteRejected { status: u16 },
    /// Success status but no usable payload
    MalformedResponse,
    /// Scratch file could not be written or read
    Io,
}

impl GatewayErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::RemoteRejected { .. } => "remote_rejected",
            Self::MalformedResponse => "malformed_response",
            Self::Io => "io",
        }
    }
}
