//! Environment configuration.
//!
//! | Variable | Default |
//! | --- | --- |
//! | `MULTIMODAL_CHAT_PROVIDER` | `openai` (`mock` for local runs) |
//! | `OPENAI_API_KEY` | required by `openai` |
//! | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
//! | `OPENAI_ORGANIZATION`, `OPENAI_PROJECT` | unset |
//! | `MULTIMODAL_CHAT_MODEL` | `gpt-4o` |
//! | `MULTIMODAL_CHAT_TRANSCRIPTION_MODEL` | `whisper-1` |
//! | `MULTIMODAL_CHAT_TIMEOUT_SEC` | `120` (must be > 0) |
//! | `MULTIMODAL_CHAT_INSTRUCTIONS` | built-in assistant instructions |
//! | `MULTIMODAL_CHAT_WEB_SEARCH` | enabled; `0`, `false`, `no`, `off` disable |
//! | `MULTIMODAL_CHAT_FAILED_TURNS` | `discard` (or `keep`) |
//!
//! Blank values count as unset.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::session::FailedTurnPolicy;

/// `tracing` filter directive read by the binaries (default `warn`).
pub const LOG_ENV_VAR: &str = "MULTIMODAL_CHAT_LOG";
pub const DEFAULT_LOG_FILTER: &str = "warn";

pub const PROVIDER_ENV_VAR: &str = "MULTIMODAL_CHAT_PROVIDER";
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV_VAR: &str = "OPENAI_BASE_URL";
pub const ORGANIZATION_ENV_VAR: &str = "OPENAI_ORGANIZATION";
pub const PROJECT_ENV_VAR: &str = "OPENAI_PROJECT";
pub const MODEL_ENV_VAR: &str = "MULTIMODAL_CHAT_MODEL";
pub const TRANSCRIPTION_MODEL_ENV_VAR: &str = "MULTIMODAL_CHAT_TRANSCRIPTION_MODEL";
pub const TIMEOUT_ENV_VAR: &str = "MULTIMODAL_CHAT_TIMEOUT_SEC";
pub const INSTRUCTIONS_ENV_VAR: &str = "MULTIMODAL_CHAT_INSTRUCTIONS";
pub const WEB_SEARCH_ENV_VAR: &str = "MULTIMODAL_CHAT_WEB_SEARCH";
pub const FAILED_TURNS_ENV_VAR: &str = "MULTIMODAL_CHAT_FAILED_TURNS";

pub const DEFAULT_PROVIDER_ID: &str = chat_provider_openai::OPENAI_PROVIDER_ID;
pub const DEFAULT_TIMEOUT_SEC: u64 = 120;
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful AI assistant capable of processing text, audio, images, and PDF files. You can search the web and read files to help the user.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MULTIMODAL_CHAT_TIMEOUT_SEC must be a whole number of seconds greater than 0, got '{value}'")]
    InvalidTimeout { value: String },
    #[error("MULTIMODAL_CHAT_FAILED_TURNS must be 'discard' or 'keep', got '{value}'")]
    InvalidFailedTurnPolicy { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub provider_id: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub model: String,
    pub transcription_model: String,
    pub timeout: Duration,
    pub instructions: String,
    pub web_search: bool,
    pub failed_turn_policy: FailedTurnPolicy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider_id: DEFAULT_PROVIDER_ID.to_string(),
            api_key: None,
            base_url: None,
            organization: None,
            project: None,
            model: chat_provider_openai::DEFAULT_MODEL.to_string(),
            transcription_model: chat_provider_openai::DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SEC),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            web_search: true,
            failed_turn_policy: FailedTurnPolicy::default(),
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| non_blank(lookup(key));
        let defaults = Self::default();

        let timeout = match value(TIMEOUT_ENV_VAR) {
            Some(raw) => parse_timeout(&raw)?,
            None => defaults.timeout,
        };

        let failed_turn_policy = match value(FAILED_TURNS_ENV_VAR) {
            Some(raw) => FailedTurnPolicy::parse(&raw)
                .ok_or(ConfigError::InvalidFailedTurnPolicy { value: raw })?,
            None => defaults.failed_turn_policy,
        };

        Ok(Self {
            provider_id: value(PROVIDER_ENV_VAR)
                .map(|id| id.to_ascii_lowercase())
                .unwrap_or(defaults.provider_id),
            api_key: value(API_KEY_ENV_VAR),
            base_url: value(BASE_URL_ENV_VAR),
            organization: value(ORGANIZATION_ENV_VAR),
            project: value(PROJECT_ENV_VAR),
            model: value(MODEL_ENV_VAR).unwrap_or(defaults.model),
            transcription_model: value(TRANSCRIPTION_MODEL_ENV_VAR)
                .unwrap_or(defaults.transcription_model),
            timeout,
            instructions: value(INSTRUCTIONS_ENV_VAR).unwrap_or(defaults.instructions),
            web_search: value(WEB_SEARCH_ENV_VAR).map_or(true, |raw| !is_disabled_flag(&raw)),
            failed_turn_policy,
        })
    }

    /// Applies command-line overrides on top of the environment.
    #[must_use]
    pub fn with_overrides(mut self, provider_id: Option<String>, model: Option<String>) -> Self {
        if let Some(provider_id) = non_blank(provider_id) {
            self.provider_id = provider_id.to_ascii_lowercase();
        }
        if let Some(model) = non_blank(model) {
            self.model = model;
        }
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(ConfigError::InvalidTimeout {
            value: raw.to_string(),
        }),
    }
}

fn is_disabled_flag(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    use super::*;

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    fn config_from(pairs: &[(&str, &str)]) -> Result<ChatConfig, ConfigError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ChatConfig::from_lookup(|key| values.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = config_from(&[]).expect("defaults are valid");

        assert_eq!(config, ChatConfig::default());
        assert_eq!(config.provider_id, "openai");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.transcription_model, "whisper-1");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.web_search);
        assert_eq!(config.failed_turn_policy, FailedTurnPolicy::Discard);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn values_are_trimmed_and_blank_values_ignored() {
        let config = config_from(&[
            (PROVIDER_ENV_VAR, " Mock "),
            (API_KEY_ENV_VAR, "  "),
            (MODEL_ENV_VAR, " gpt-4o-mini "),
            (INSTRUCTIONS_ENV_VAR, ""),
        ])
        .expect("config parses");

        assert_eq!(config.provider_id, "mock");
        assert!(config.api_key.is_none());
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.instructions, DEFAULT_INSTRUCTIONS);
    }

    #[test]
    fn web_search_can_be_disabled() {
        for raw in ["0", "false", "NO", "off"] {
            let config = config_from(&[(WEB_SEARCH_ENV_VAR, raw)]).expect("config parses");
            assert!(!config.web_search, "{raw} should disable web search");
        }
        let config = config_from(&[(WEB_SEARCH_ENV_VAR, "1")]).expect("config parses");
        assert!(config.web_search);
    }

    #[test]
    fn timeout_must_be_positive_seconds() {
        let config = config_from(&[(TIMEOUT_ENV_VAR, "30")]).expect("config parses");
        assert_eq!(config.timeout, Duration::from_secs(30));

        for raw in ["0", "-5", "soon"] {
            let error = config_from(&[(TIMEOUT_ENV_VAR, raw)]).expect_err("invalid timeout");
            assert_eq!(
                error,
                ConfigError::InvalidTimeout {
                    value: raw.to_string()
                }
            );
        }
    }

    #[test]
    fn failed_turn_policy_is_parsed() {
        let config = config_from(&[(FAILED_TURNS_ENV_VAR, "KEEP")]).expect("config parses");
        assert_eq!(config.failed_turn_policy, FailedTurnPolicy::Keep);

        let error = config_from(&[(FAILED_TURNS_ENV_VAR, "retry")]).expect_err("invalid policy");
        assert!(error.to_string().contains("'retry'"));
    }

    #[test]
    fn command_line_overrides_win_over_environment() {
        let config = config_from(&[(PROVIDER_ENV_VAR, "openai"), (MODEL_ENV_VAR, "gpt-4o")])
            .expect("config parses")
            .with_overrides(Some("MOCK".to_string()), Some(" ".to_string()));

        assert_eq!(config.provider_id, "mock");
        assert_eq!(config.model, "gpt-4o");
    }

    #[test]
    fn from_env_reads_process_environment() {
        let _lock = env_lock();
        let _g1 = set_env_guard(PROVIDER_ENV_VAR, Some("mock"));
        let _g2 = set_env_guard(API_KEY_ENV_VAR, Some("sk-env"));
        let _g3 = set_env_guard(TIMEOUT_ENV_VAR, None);

        let config = ChatConfig::from_env().expect("env config parses");
        assert_eq!(config.provider_id, "mock");
        assert_eq!(config.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SEC));
    }
}
