use std::collections::BTreeMap;

use crate::config::OpenAiApiConfig;
use crate::error::OpenAiApiError;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_ORGANIZATION: &str = "openai-organization";
pub const HEADER_PROJECT: &str = "openai-project";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Build a deterministic header map shared by every endpoint.
///
/// `content-type` is left to the body encoder (JSON or multipart).
pub fn build_headers(
    config: &OpenAiApiConfig,
    user_agent: Option<&str>,
) -> Result<BTreeMap<String, String>, OpenAiApiError> {
    let api_key = config.api_key.trim();
    if api_key.is_empty() {
        return Err(OpenAiApiError::MissingApiKey);
    }

    let mut headers = BTreeMap::new();
    headers.insert(HEADER_AUTHORIZATION.to_owned(), format!("Bearer {api_key}"));
    headers.insert(HEADER_ACCEPT.to_owned(), "application/json".to_owned());

    if let Some(organization) = config.organization.as_deref().and_then(sanitize_nonempty) {
        headers.insert(HEADER_ORGANIZATION.to_owned(), organization);
    }
    if let Some(project) = config.project.as_deref().and_then(sanitize_nonempty) {
        headers.insert(HEADER_PROJECT.to_owned(), project);
    }

    let ua = user_agent
        .and_then(sanitize_nonempty)
        .or_else(|| config.user_agent.as_deref().and_then(sanitize_nonempty))
        .unwrap_or_else(default_user_agent);
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    Ok(headers)
}

pub fn default_user_agent() -> String {
    format!("multimodal-chat/{}", env!("CARGO_PKG_VERSION"))
}

fn sanitize_nonempty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
