//! REST error types

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use crate::ratelimit::BucketKey;
use crate::transport::{HttpResponse, TransportError};

/// Errors returned by the request governor and the REST client
#[derive(Debug, Error)]
pub enum RestError {
    /// The request never produced a response and retries ran out
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server rejected the request with a structured error body
    #[error("API error: {0}")]
    Api(ApiError),

    /// The bucket kept answering 429
    #[error("Rate limit retries exhausted for {bucket} after {attempts} attempts")]
    RateLimitExhausted { bucket: BucketKey, attempts: u32 },

    /// The server kept answering with a transient failure (e.g. 502)
    #[error("Transient failure {status} persisted after {attempts} attempts")]
    TransientExhausted { status: u16, attempts: u32 },

    /// A success body could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RestError {
    /// Check if retrying the same call later could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RateLimitExhausted { .. } | Self::TransientExhausted { .. }
        )
    }

    /// The API error code, if the server returned one
    pub fn api_code(&self) -> Option<ApiErrorCode> {
        match self {
            Self::Api(err) => Some(err.code),
            _ => None,
        }
    }
}

/// Result alias for REST calls
pub type RestResult<T> = Result<T, RestError>;

/// Decoded error body: `{"code": 50013, "message": "Missing Permissions"}`
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: u16,
    pub code: ApiErrorCode,
    pub message: String,
    /// Field-level details for form errors
    pub errors: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawApiError {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

impl ApiError {
    /// Decode an error response. Bodies that are not JSON keep their text as the message.
    pub fn from_response(response: &HttpResponse) -> Self {
        match serde_json::from_str::<RawApiError>(&response.body) {
            Ok(raw) => Self {
                status: response.status,
                code: ApiErrorCode::from_code(raw.code),
                message: raw
                    .message
                    .unwrap_or_else(|| format!("HTTP {}", response.status)),
                errors: raw.errors,
            },
            Err(_) => Self {
                status: response.status,
                code: ApiErrorCode::General,
                message: if response.body.trim().is_empty() {
                    format!("HTTP {}", response.status)
                } else {
                    response.body.trim().to_string()
                },
                errors: None,
            },
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, code {}): {}",
            self.code.name(),
            self.status,
            self.code.as_u32(),
            self.message
        )
    }
}

impl std::error::Error for ApiError {}

/// Numeric API error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorCode {
    General,
    UnknownAccount,
    UnknownChannel,
    UnknownGuild,
    UnknownMember,
    UnknownMessage,
    UnknownRole,
    UnknownUser,
    UnknownEmoji,
    BotsCannotUseEndpoint,
    Unauthorized,
    MissingAccess,
    CannotSendEmptyMessage,
    CannotSendMessagesToUser,
    MissingPermissions,
    InvalidToken,
    InvalidFormBody,
    ReactionBlocked,
    /// A code this library does not name
    Other(u32),
}

impl ApiErrorCode {
    pub const fn from_code(code: u32) -> Self {
        match code {
            0 => Self::General,
            10001 => Self::UnknownAccount,
            10003 => Self::UnknownChannel,
            10004 => Self::UnknownGuild,
            10007 => Self::UnknownMember,
            10008 => Self::UnknownMessage,
            10011 => Self::UnknownRole,
            10013 => Self::UnknownUser,
            10014 => Self::UnknownEmoji,
            20001 => Self::BotsCannotUseEndpoint,
            40001 => Self::Unauthorized,
            50001 => Self::MissingAccess,
            50006 => Self::CannotSendEmptyMessage,
            50007 => Self::CannotSendMessagesToUser,
            50013 => Self::MissingPermissions,
            50014 => Self::InvalidToken,
            50035 => Self::InvalidFormBody,
            90001 => Self::ReactionBlocked,
            other => Self::Other(other),
        }
    }

    pub const fn as_u32(self) -> u32 {
        match self {
            Self::General => 0,
            Self::UnknownAccount => 10001,
            Self::UnknownChannel => 10003,
            Self::UnknownGuild => 10004,
            Self::UnknownMember => 10007,
            Self::UnknownMessage => 10008,
            Self::UnknownRole => 10011,
            Self::UnknownUser => 10013,
            Self::UnknownEmoji => 10014,
            Self::BotsCannotUseEndpoint => 20001,
            Self::Unauthorized => 40001,
            Self::MissingAccess => 50001,
            Self::CannotSendEmptyMessage => 50006,
            Self::CannotSendMessagesToUser => 50007,
            Self::MissingPermissions => 50013,
            Self::InvalidToken => 50014,
            Self::InvalidFormBody => 50035,
            Self::ReactionBlocked => 90001,
            Self::Other(code) => code,
        }
    }

    /// Get the error name
    pub const fn name(self) -> &'static str {
        match self {
            Self::General => "GENERAL",
            Self::UnknownAccount => "UNKNOWN_ACCOUNT",
            Self::UnknownChannel => "UNKNOWN_CHANNEL",
            Self::UnknownGuild => "UNKNOWN_GUILD",
            Self::UnknownMember => "UNKNOWN_MEMBER",
            Self::UnknownMessage => "UNKNOWN_MESSAGE",
            Self::UnknownRole => "UNKNOWN_ROLE",
            Self::UnknownUser => "UNKNOWN_USER",
            Self::UnknownEmoji => "UNKNOWN_EMOJI",
            Self::BotsCannotUseEndpoint => "BOTS_CANNOT_USE_ENDPOINT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::MissingAccess => "MISSING_ACCESS",
            Self::CannotSendEmptyMessage => "CANNOT_SEND_EMPTY_MESSAGE",
            Self::CannotSendMessagesToUser => "CANNOT_SEND_MESSAGES_TO_USER",
            Self::MissingPermissions => "MISSING_PERMISSIONS",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::InvalidFormBody => "INVALID_FORM_BODY",
            Self::ReactionBlocked => "REACTION_BLOCKED",
            Self::Other(_) => "OTHER",
        }
    }

    /// Check if this is an "unknown resource" error
    pub const fn is_unknown_resource(self) -> bool {
        matches!(self.as_u32(), 10001..=10999)
    }
}

impl From<u32> for ApiErrorCode {
    fn from(code: u32) -> Self {
        Self::from_code(code)
    }
}
