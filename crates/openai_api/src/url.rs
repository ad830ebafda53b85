/// Default base URL for API requests.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const RESPONSES_PATH: &str = "/responses";
const TRANSCRIPTIONS_PATH: &str = "/audio/transcriptions";

/// Normalize a configured base URL.
///
/// Normalization rules:
/// 1) blank input falls back to [`DEFAULT_OPENAI_BASE_URL`]
/// 2) trailing slashes are removed
/// 3) a full `/responses` or `/audio/transcriptions` endpoint is cut back to its base
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_OPENAI_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    for suffix in [RESPONSES_PATH, TRANSCRIPTIONS_PATH] {
        if let Some(stripped) = trimmed.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    trimmed.to_string()
}

pub fn responses_endpoint(base_url: &str) -> String {
    format!("{}{RESPONSES_PATH}", normalize_base_url(base_url))
}

pub fn transcription_endpoint(base_url: &str) -> String {
    format!("{}{TRANSCRIPTIONS_PATH}", normalize_base_url(base_url))
}
