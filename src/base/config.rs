//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use crate::base::prompts;

use super::types::{Res, TriageError, Void};

/// Default model used for classification.
fn default_openai_classifier_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default model used to write replies.
fn default_openai_responder_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default sampling temperature for replies.
fn default_openai_responder_temperature() -> f32 {
    0.0
}

/// Default max output tokens for OpenAI model
fn default_openai_max_tokens() -> u32 {
    512
}

/// Default gateway timeout, in seconds.
fn default_openai_timeout_secs() -> u64 {
    120
}

/// Default on-disk location of the ticket store.
fn default_db_path() -> String {
    "data/support.db".to_string()
}

/// Default system directive for the classifier.
fn default_classifier_directive() -> String {
    prompts::CLASSIFIER_SYSTEM_DIRECTIVE.to_string()
}

/// Configuration for the support-triage application.
#[derive(Debug, Clone)]
pub struct Config {
    /// The shared configuration values.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

/// Configuration values, as deserialized from file and environment.
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// OpenAI API key (`OPENAI_API_KEY`).
    ///
    /// Only required by code paths that talk to the gateway.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    /// Alternate OpenAI-compatible endpoint (`OPENAI_BASE_URL`).
    #[serde(default)]
    pub openai_base_url: Option<String>,
    /// Model used for classification (`SUPPORT_TRIAGE_OPENAI_CLASSIFIER_MODEL`).
    #[serde(default = "default_openai_classifier_model")]
    pub openai_classifier_model: String,
    /// Model used to write replies (`SUPPORT_TRIAGE_OPENAI_RESPONDER_MODEL`).
    #[serde(default = "default_openai_responder_model")]
    pub openai_responder_model: String,
    /// Sampling temperature for replies (`SUPPORT_TRIAGE_OPENAI_RESPONDER_TEMPERATURE`).
    /// Value between 0 and 2. Classification always runs at 0.
    #[serde(default = "default_openai_responder_temperature")]
    pub openai_responder_temperature: f32,
    /// Max output tokens for OpenAI model (`SUPPORT_TRIAGE_OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// Per-call gateway timeout in seconds (`SUPPORT_TRIAGE_OPENAI_TIMEOUT_SECS`).
    #[serde(default = "default_openai_timeout_secs")]
    pub openai_timeout_secs: u64,
    /// Ticket store location (`SUPPORT_TRIAGE_DB_PATH`); `memory` keeps it in-process.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Optional custom classifier directive to override the default (`SUPPORT_TRIAGE_CLASSIFIER_DIRECTIVE`).
    #[serde(default = "default_classifier_directive")]
    pub classifier_directive: String,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: None,
            openai_classifier_model: default_openai_classifier_model(),
            openai_responder_model: default_openai_responder_model(),
            openai_responder_temperature: default_openai_responder_temperature(),
            openai_max_tokens: default_openai_max_tokens(),
            openai_timeout_secs: default_openai_timeout_secs(),
            db_path: default_db_path(),
            classifier_directive: default_classifier_directive(),
        }
    }
}

impl Config {
    /// Load from an explicit file (or `.hidden/config.toml`) plus environment overrides.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder();

        // The well-known OpenAI variables are the weakest source.
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            cfg = cfg.set_default("openai_api_key", key)?;
        }

        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            cfg = cfg.set_default("openai_base_url", url)?;
        }

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        cfg = cfg.add_source(config::Environment::default().prefix("SUPPORT_TRIAGE"));

        let result: Config = cfg.build()?.try_deserialize::<ConfigInner>()?.into();

        result.validate()?;

        Ok(result)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Void {
        if self.openai_responder_temperature < 0.0 || self.openai_responder_temperature > 2.0 {
            return Err(TriageError::Configuration("OpenAI responder temperature must be between 0 and 2.".to_string()).into());
        }

        if self.openai_max_tokens < 1 || self.openai_max_tokens > 128000 {
            return Err(TriageError::Configuration("OpenAI max tokens must be between 1 and 128000.".to_string()).into());
        }

        if self.openai_timeout_secs == 0 {
            return Err(TriageError::Configuration("OpenAI timeout must be at least 1 second.".to_string()).into());
        }

        Ok(())
    }

    /// The API credential, or a configuration error when it is absent.
    pub fn require_openai_api_key(&self) -> Res<&str> {
        match self.openai_api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(TriageError::Configuration("Set OPENAI_API_KEY (or `openai_api_key` in the config file) to use the language-model gateway.".to_string()).into()),
        }
    }
}
