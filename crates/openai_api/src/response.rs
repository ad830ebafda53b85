use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state reported by the Responses endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Completed,
    Incomplete,
    Failed,
    Cancelled,
    Queued,
    InProgress,
}

impl ResponseStatus {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "completed" => Self::Completed,
            "incomplete" => Self::Incomplete,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
        }
    }
}

/// Normalized view of one Responses endpoint reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseReply {
    pub id: Option<String>,
    pub status: Option<ResponseStatus>,
    /// Concatenated `output_text` parts of every `message` output item.
    pub output_text: String,
    pub error_message: Option<String>,
}

impl ResponseReply {
    pub fn from_value(value: &Value) -> Self {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        let status = value
            .get("status")
            .and_then(Value::as_str)
            .and_then(ResponseStatus::parse);
        let error_message = value
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
            .or_else(|| {
                value
                    .get("incomplete_details")
                    .and_then(|details| details.get("reason"))
                    .and_then(Value::as_str)
            })
            .map(ToString::to_string);

        Self {
            id,
            status,
            output_text: extract_output_text(value),
            error_message,
        }
    }
}

/// Collects the assistant text from an `output` array, skipping tool-call items.
pub fn extract_output_text(value: &Value) -> String {
    let Some(items) = value.get("output").and_then(Value::as_array) else {
        return String::new();
    };

    let mut text = String::new();
    for item in items {
        if item.get("type").and_then(Value::as_str) != Some("message") {
            continue;
        }
        let Some(parts) = item.get("content").and_then(Value::as_array) else {
            continue;
        };
        for part in parts {
            if part.get("type").and_then(Value::as_str) == Some("output_text") {
                if let Some(part_text) = part.get("text").and_then(Value::as_str) {
                    text.push_str(part_text);
                }
            }
        }
    }
    text
}

/// Reply body of the transcription endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranscriptionReply {
    pub text: String,
}
