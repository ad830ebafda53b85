//! Provider bootstrap from configuration.

use std::sync::Arc;

use chat_provider::{ChatProvider, ProviderInitError, Transcriber};
use chat_provider_mock::{MockProvider, MockTranscriber, MOCK_PROVIDER_ID};
use chat_provider_openai::{OpenAiProvider, OpenAiProviderConfig, OPENAI_PROVIDER_ID};
use tracing::info;

use crate::config::ChatConfig;

/// The two remote collaborators a session needs.
#[derive(Clone)]
pub struct ProviderHandles {
    pub chat: Arc<dyn ChatProvider>,
    pub transcriber: Arc<dyn Transcriber>,
}

pub fn providers_for_config(config: &ChatConfig) -> Result<ProviderHandles, ProviderInitError> {
    match config.provider_id.as_str() {
        OPENAI_PROVIDER_ID => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ProviderInitError::new(
                    "OPENAI_API_KEY is not set; the openai provider needs an API key",
                )
            })?;
            let provider = Arc::new(OpenAiProvider::new(openai_config(config, api_key))?);
            info!(model = %config.model, "using openai provider");
            Ok(ProviderHandles {
                chat: Arc::clone(&provider) as Arc<dyn ChatProvider>,
                transcriber: provider,
            })
        }
        MOCK_PROVIDER_ID => {
            info!("using mock provider");
            Ok(ProviderHandles {
                chat: Arc::new(MockProvider::new()),
                transcriber: Arc::new(MockTranscriber::new()),
            })
        }
        unknown => Err(ProviderInitError::new(format!(
            "Unsupported provider '{unknown}'. Available providers: {OPENAI_PROVIDER_ID}, {MOCK_PROVIDER_ID}"
        ))),
    }
}

fn openai_config(config: &ChatConfig, api_key: String) -> OpenAiProviderConfig {
    let mut provider_config = OpenAiProviderConfig::new(api_key)
        .with_model(config.model.clone())
        .with_transcription_model(config.transcription_model.clone())
        .with_timeout(config.timeout)
        .with_web_search(config.web_search);

    if let Some(base_url) = &config.base_url {
        provider_config = provider_config.with_base_url(base_url.clone());
    }
    if let Some(organization) = &config.organization {
        provider_config = provider_config.with_organization(organization.clone());
    }
    if let Some(project) = &config.project {
        provider_config = provider_config.with_project(project.clone());
    }

    provider_config
}
