use multimodal_chat::{ContentBlock, Conversation, TurnContent};
use serde::Serialize;

/// One rendered conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub role: &'static str,
    pub parts: Vec<HistoryPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryPart {
    Text { text: String },
    Image { url: String },
    Attachment { label: String },
}

pub fn history_view(conversation: &Conversation) -> Vec<HistoryEntry> {
    conversation
        .turns()
        .iter()
        .map(|turn| HistoryEntry {
            role: turn.role.as_str(),
            parts: match &turn.content {
                TurnContent::PlainText(text) => vec![HistoryPart::Text { text: text.clone() }],
                TurnContent::StructuredBlocks(blocks) => blocks.iter().map(block_part).collect(),
            },
        })
        .collect()
}

fn block_part(block: &ContentBlock) -> HistoryPart {
    match block {
        ContentBlock::Text { value } => HistoryPart::Text {
            text: value.clone(),
        },
        ContentBlock::Image { .. } => HistoryPart::Image {
            url: block.data_url().unwrap_or_default(),
        },
        ContentBlock::File { filename, .. } => HistoryPart::Attachment {
            label: format!("📎 PDF: {filename}"),
        },
    }
}
