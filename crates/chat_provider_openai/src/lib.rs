//! Hosted-API implementation of the shared `chat_provider` contract.
//!
//! This adapter renders provider-neutral [`Turn`]s into Responses `input`
//! items and resolves each call into a single reply string. The same
//! provider also serves as the audio [`Transcriber`].

use std::sync::Arc;
use std::time::Duration;

use chat_provider::{
    AudioClip, ChatProvider, CompletionRequest, ContentBlock, ProviderError, ProviderInitError,
    ProviderProfile, Transcriber, Turn, TurnContent,
};
pub use openai_api::payload::DEFAULT_TRANSCRIPTION_MODEL;
use openai_api::{
    OpenAiApiClient, OpenAiApiConfig, OpenAiApiError, ResponseReply, ResponsesRequest,
    TranscriptionRequest,
};
use serde_json::{json, Value};
use tracing::warn;

/// Stable provider identifier used by startup selection.
pub const OPENAI_PROVIDER_ID: &str = "openai";

/// Model used when configuration names none.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Runtime configuration for the hosted provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiProviderConfig {
    pub api_key: String,
    pub model: String,
    pub transcription_model: String,
    pub base_url: Option<String>,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub timeout: Option<Duration>,
    pub web_search: bool,
}

impl OpenAiProviderConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            base_url: None,
            organization: None,
            project: None,
            timeout: None,
            web_search: true,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_transcription_model(mut self, model: impl Into<String>) -> Self {
        self.transcription_model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    fn into_api_config(self) -> OpenAiApiConfig {
        let mut config = OpenAiApiConfig::new(self.api_key);

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }

        if let Some(organization) = self.organization {
            config = config.with_organization(organization);
        }

        if let Some(project) = self.project {
            config = config.with_project(project);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

trait ApiClient: Send + Sync {
    fn create_response(&self, request: &ResponsesRequest) -> Result<ResponseReply, OpenAiApiError>;

    fn transcribe(&self, request: &TranscriptionRequest) -> Result<String, OpenAiApiError>;
}

#[derive(Debug)]
struct DefaultApiClient {
    client: OpenAiApiClient,
}

impl DefaultApiClient {
    fn block_on<F: std::future::Future>(&self, future: F) -> Result<F::Output, OpenAiApiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                OpenAiApiError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })?;

        Ok(runtime.block_on(future))
    }
}

impl ApiClient for DefaultApiClient {
    fn create_response(&self, request: &ResponsesRequest) -> Result<ResponseReply, OpenAiApiError> {
        self.block_on(self.client.create_response(request))?
    }

    fn transcribe(&self, request: &TranscriptionRequest) -> Result<String, OpenAiApiError> {
        self.block_on(self.client.transcribe(request))?
    }
}

/// `ChatProvider` + `Transcriber` backed by `openai_api` transport primitives.
pub struct OpenAiProvider {
    model: String,
    transcription_model: String,
    web_search: bool,
    api: Arc<dyn ApiClient>,
}

impl OpenAiProvider {
    /// Creates a provider using real HTTP transport.
    ///
    /// A blank API key is rejected here, before any remote call is attempted.
    pub fn new(config: OpenAiProviderConfig) -> Result<Self, ProviderInitError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderInitError::new(
                "OPENAI_API_KEY is not set; the openai provider needs an API key",
            ));
        }

        let model = sanitize_model(&config.model, DEFAULT_MODEL);
        let transcription_model =
            sanitize_model(&config.transcription_model, DEFAULT_TRANSCRIPTION_MODEL);
        let web_search = config.web_search;
        let api = Arc::new(DefaultApiClient {
            client: OpenAiApiClient::new(config.into_api_config()).map_err(map_init_error)?,
        });

        Ok(Self {
            model,
            transcription_model,
            web_search,
            api,
        })
    }

    fn build_request(&self, request: CompletionRequest) -> ResponsesRequest {
        let instructions = Some(request.instructions).filter(|text| !text.trim().is_empty());
        let payload = ResponsesRequest::new(
            self.model.clone(),
            turns_to_input(&request.turns),
            instructions,
        );
        if self.web_search {
            payload.with_web_search()
        } else {
            payload
        }
    }

    #[cfg(test)]
    fn with_api_client_for_tests(model: &str, web_search: bool, api: Arc<dyn ApiClient>) -> Self {
        Self {
            model: sanitize_model(model, DEFAULT_MODEL),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            web_search,
            api,
        }
    }
}

impl ChatProvider for OpenAiProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: OPENAI_PROVIDER_ID.to_string(),
            model_id: self.model.clone(),
        }
    }

    fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let payload = self.build_request(request);
        match self.api.create_response(&payload) {
            Ok(reply) => Ok(reply.output_text),
            Err(error) => {
                warn!(%error, model = %self.model, "agent completion failed");
                Err(ProviderError::new(format!("Agent request failed: {error}")))
            }
        }
    }
}

impl Transcriber for OpenAiProvider {
    fn transcribe(&self, clip: AudioClip) -> Result<String, ProviderError> {
        let mut request = TranscriptionRequest::new(clip.filename, clip.bytes)
            .with_model(self.transcription_model.clone());
        if let Some(mime_type) = clip.mime_type {
            request = request.with_mime_type(mime_type);
        }

        self.api.transcribe(&request).map_err(|error| {
            warn!(%error, "audio transcription failed");
            ProviderError::new(format!("Transcription failed: {error}"))
        })
    }
}

/// Renders the conversation as a Responses `input` array.
pub fn turns_to_input(turns: &[Turn]) -> Value {
    Value::Array(turns.iter().map(turn_to_item).collect())
}

fn turn_to_item(turn: &Turn) -> Value {
    let content = match &turn.content {
        TurnContent::PlainText(text) => Value::String(text.clone()),
        TurnContent::StructuredBlocks(blocks) => {
            Value::Array(blocks.iter().map(block_to_part).collect())
        }
    };

    json!({
        "role": turn.role.as_str(),
        "content": content,
    })
}

fn block_to_part(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Text { value } => json!({
            "type": "input_text",
            "text": value,
        }),
        ContentBlock::Image { .. } => json!({
            "type": "input_image",
            "image_url": block.data_url(),
        }),
        ContentBlock::File { filename, .. } => json!({
            "type": "input_file",
            "file_data": block.data_url(),
            "filename": filename,
        }),
    }
}

fn sanitize_model(model: &str, fallback: &str) -> String {
    let trimmed = model.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn map_init_error(error: OpenAiApiError) -> ProviderInitError {
    ProviderInitError::new(format!("Failed to initialize openai provider: {error}"))
}
