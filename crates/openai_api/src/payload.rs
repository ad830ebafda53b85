use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Hosted tool type enabling server-side web search.
pub const WEB_SEARCH_TOOL_TYPE: &str = "web_search_preview";

/// Default model for the transcription endpoint.
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Request payload for the Responses endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Ordered input items; must be a JSON array.
    pub input: Value,
    /// Default: false. Conversation state lives with the caller.
    #[serde(default)]
    pub store: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
}

impl ResponsesRequest {
    pub fn new(
        model: impl Into<String>,
        input: impl Into<Value>,
        instructions: Option<String>,
    ) -> Self {
        Self {
            model: model.into(),
            instructions,
            input: input.into(),
            store: false,
            tools: Vec::new(),
        }
    }

    /// Adds the hosted web search tool unless it is already present.
    pub fn with_web_search(mut self) -> Self {
        let present = self
            .tools
            .iter()
            .any(|tool| tool.get("type").and_then(Value::as_str) == Some(WEB_SEARCH_TOOL_TYPE));
        if !present {
            self.tools.push(json!({ "type": WEB_SEARCH_TOOL_TYPE }));
        }
        self
    }
}

/// Multipart request for the transcription endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionRequest {
    pub model: String,
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl TranscriptionRequest {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            filename: filename.into(),
            mime_type: None,
            bytes,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}
