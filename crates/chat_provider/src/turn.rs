use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// MIME type used for image blocks when neither the upload nor the file
/// extension yields an `image/*` type.
pub const DEFAULT_IMAGE_MIME_TYPE: &str = "image/png";

/// MIME type carried by every file block.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Speaker of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Typed unit of structured turn content.
///
/// `base64_data` is always standard (padded) base64 of the original bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        value: String,
    },
    Image {
        mime_type: String,
        base64_data: String,
    },
    File {
        filename: String,
        mime_type: String,
        base64_data: String,
    },
}

impl ContentBlock {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    /// Encodes raw image bytes into an image block.
    #[must_use]
    pub fn image_from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::Image {
            mime_type: mime_type.into(),
            base64_data: general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Encodes raw PDF bytes into a file block.
    #[must_use]
    pub fn pdf_from_bytes(filename: impl Into<String>, bytes: &[u8]) -> Self {
        Self::File {
            filename: filename.into(),
            mime_type: PDF_MIME_TYPE.to_string(),
            base64_data: general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Returns the `data:` URL for image and file blocks.
    pub fn data_url(&self) -> Option<String> {
        match self {
            Self::Text { .. } => None,
            Self::Image {
                mime_type,
                base64_data,
            }
            | Self::File {
                mime_type,
                base64_data,
                ..
            } => Some(data_url(mime_type, base64_data)),
        }
    }

    /// Decodes the attachment payload back into bytes.
    pub fn decode_payload(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        match self {
            Self::Text { .. } => None,
            Self::Image { base64_data, .. } | Self::File { base64_data, .. } => {
                Some(general_purpose::STANDARD.decode(base64_data))
            }
        }
    }
}

/// Formats `data:<mime-type>;base64,<payload>`.
pub fn data_url(mime_type: &str, base64_data: &str) -> String {
    format!("data:{mime_type};base64,{base64_data}")
}

/// Content of one turn: a bare string when no attachment is carried, an
/// ordered block sequence otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TurnContent {
    PlainText(String),
    StructuredBlocks(Vec<ContentBlock>),
}

impl TurnContent {
    pub fn as_plain_text(&self) -> Option<&str> {
        match self {
            Self::PlainText(text) => Some(text),
            Self::StructuredBlocks(_) => None,
        }
    }

    pub fn blocks(&self) -> Option<&[ContentBlock]> {
        match self {
            Self::PlainText(_) => None,
            Self::StructuredBlocks(blocks) => Some(blocks),
        }
    }
}

impl From<String> for TurnContent {
    fn from(text: String) -> Self {
        Self::PlainText(text)
    }
}

impl From<&str> for TurnContent {
    fn from(text: &str) -> Self {
        Self::PlainText(text.to_string())
    }
}

impl From<Vec<ContentBlock>> for TurnContent {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        Self::StructuredBlocks(blocks)
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

impl Turn {
    #[must_use]
    pub fn user(content: impl Into<TurnContent>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Assistant replies are always plain text.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::PlainText(text.into()),
        }
    }
}
