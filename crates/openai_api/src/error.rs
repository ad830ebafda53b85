use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

use crate::response::ResponseStatus;

#[derive(Debug)]
pub enum OpenAiApiError {
    MissingApiKey,
    InvalidHeader(String),
    InvalidRequestPayload(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Serde(JsonError),
    ResponseNotCompleted {
        status: ResponseStatus,
        message: Option<String>,
    },
    EmptyReply,
    Unknown(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(rename = "error")]
    pub value: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

impl ErrorPayloadFields {
    pub fn quota_message(&self, status: StatusCode) -> Option<String> {
        let code = self
            .code
            .as_deref()
            .and_then(non_empty_string)
            .or_else(|| self.type_.as_deref().and_then(non_empty_string))
            .unwrap_or("");
        if !matches_quota_exhausted(code, status) {
            return None;
        }

        let detail = self
            .message
            .as_deref()
            .and_then(non_empty_string)
            .map(|message| format!(": {message}"))
            .unwrap_or_default();
        Some(format!("Rate limit or quota exceeded{detail}"))
    }

    pub fn message_or_fallback(&self) -> Option<String> {
        let explicit = self.message.as_deref().and_then(non_empty_string)?;
        Some(explicit.to_owned())
    }
}

impl fmt::Display for OpenAiApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "API key is required"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::InvalidRequestPayload(message) => {
                write!(f, "invalid request payload: {message}")
            }
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::ResponseNotCompleted { status, message } => match message {
                Some(message) if !message.trim().is_empty() => {
                    write!(f, "response ended with status '{}': {message}", status.as_str())
                }
                _ => write!(f, "response ended with status '{}'", status.as_str()),
            },
            Self::EmptyReply => write!(f, "response contained no output text"),
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for OpenAiApiError {}

impl From<reqwest::Error> for OpenAiApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for OpenAiApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let parsed = match serde_json::from_str::<ErrorPayload>(body) {
        Ok(payload) => payload,
        Err(_) => return body_or_reason(status, body),
    };

    if let Some(error) = parsed.value {
        if let Some(message) = error.quota_message(status) {
            return message;
        }
        if let Some(message) = error.message_or_fallback() {
            return message;
        }
    }

    body_or_reason(status, body)
}

fn body_or_reason(status: StatusCode, body: &str) -> String {
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

fn matches_quota_exhausted(code: &str, status: StatusCode) -> bool {
    matches!(status, StatusCode::TOO_MANY_REQUESTS)
        || code.eq_ignore_ascii_case("insufficient_quota")
        || code.eq_ignore_ascii_case("rate_limit_exceeded")
}

fn non_empty_string(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
