// SPDX-License-Identifier: MIT

//! Content generator configuration
//!
//! The adapter itself never reads the environment or the filesystem; a
//! [`ContentGeneratorConfig`] is handed to it. The loaders here are for the
//! binary and for embedders that want the same conventions.

use crate::adk::error::{AdapterError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2";

/// How the content generator authenticates with its backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AuthType {
    /// Local Ollama server, no credentials
    #[default]
    Ollama,
    GeminiApiKey,
    VertexAi,
    LoginWithGoogle,
}

/// Sampling parameters forwarded to the provider's options block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SamplingParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl SamplingParams {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentGeneratorConfig {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub auth_type: AuthType,
    /// Model used for embeddings; falls back to `model`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<SamplingParams>,
}

impl ContentGeneratorConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: None,
            auth_type: AuthType::Ollama,
            embedding_model: None,
            sampling: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = Some(sampling);
        self
    }

    /// Base URL without a trailing slash, defaulting to the local server
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn embedding_model(&self) -> &str {
        self.embedding_model.as_deref().unwrap_or(&self.model)
    }

    /// Build a config from `OLLAMA_*` environment variables.
    ///
    /// Reads `OLLAMA_MODEL`, `OLLAMA_BASE_URL`, `OLLAMA_EMBEDDING_MODEL`
    /// and the sampling variables `OLLAMA_TEMPERATURE`, `OLLAMA_TOP_P`,
    /// `OLLAMA_TOP_K`, `OLLAMA_REPEAT_PENALTY`, `OLLAMA_NUM_PREDICT`.
    pub fn from_env() -> Result<Self> {
        let model = env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let sampling = SamplingParams {
            temperature: parse_env("OLLAMA_TEMPERATURE")?,
            top_p: parse_env("OLLAMA_TOP_P")?,
            top_k: parse_env("OLLAMA_TOP_K")?,
            repetition_penalty: parse_env("OLLAMA_REPEAT_PENALTY")?,
            max_tokens: parse_env("OLLAMA_NUM_PREDICT")?,
        };

        Ok(Self {
            model,
            base_url: env::var("OLLAMA_BASE_URL").ok(),
            auth_type: AuthType::Ollama,
            embedding_model: env::var("OLLAMA_EMBEDDING_MODEL").ok(),
            sampling: (!sampling.is_empty()).then_some(sampling),
        })
    }

    /// Load a config from a YAML file
    pub fn load_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse a config from a YAML string
    pub fn parse_yaml(content: &str) -> Result<Self> {
        let config: ContentGeneratorConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AdapterError::config(format!("{} has an invalid value: {}", key, raw))),
        _ => Ok(None),
    }
}
