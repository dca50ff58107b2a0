// SPDX-License-Identifier: MIT

//! Ollama content generator - local `/api/chat` and `/api/embeddings`
//!
//! Translation is split by direction:
//! - [request] - generic request -> chat request
//! - [stream] - NDJSON byte stream -> chat records
//! - [response] - chat record -> generic response
//! - [estimate] - token estimate and embedding prompt

pub mod estimate;
pub mod request;
pub mod response;
pub mod stream;
pub mod types;

use self::estimate::{embedding_prompt, estimate_tokens};
use self::request::to_chat_request;
use self::response::to_generate_response;
use self::stream::decode_stream;
use self::types::{ChatResponse, EmbeddingRequest, EmbeddingResponse};
use crate::adk::config::{AuthType, ContentGeneratorConfig};
use crate::adk::error::{AdapterError, Result};
use crate::adk::model::{
    ContentEmbedding, ContentGenerator, CountTokensResponse, EmbedContentResponse,
    GenerateContentParameters, GenerateContentResponse, ResponseStream,
};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use url::Url;

const CHAT_PATH: &str = "/api/chat";
const EMBEDDINGS_PATH: &str = "/api/embeddings";

/// Content generator backed by an Ollama server
pub struct OllamaContentGenerator {
    client: Client,
    config: ContentGeneratorConfig,
    base_url: String,
}

impl OllamaContentGenerator {
    /// Create a generator for `config`.
    ///
    /// Fails with [`AdapterError::Config`] unless the auth type is
    /// [`AuthType::Ollama`] and the base URL parses.
    pub fn new(config: ContentGeneratorConfig) -> Result<Self> {
        Self::with_client(Client::new(), config)
    }

    /// Same as [`OllamaContentGenerator::new`] with a caller-built HTTP client
    pub fn with_client(client: Client, config: ContentGeneratorConfig) -> Result<Self> {
        if config.auth_type != AuthType::Ollama {
            return Err(AdapterError::config(format!(
                "Ollama content generator requires auth type {:?}, got {:?}",
                AuthType::Ollama,
                config.auth_type
            )));
        }

        let base_url = config.base_url().to_string();
        Url::parse(&base_url).map_err(|e| {
            AdapterError::config(format!("Invalid Ollama base URL {:?}: {}", base_url, e))
        })?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn config(&self) -> &ContentGeneratorConfig {
        &self.config
    }

    /// POST a JSON body and fail on any non-2xx status
    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);

        log::debug!(
            "Ollama request to {}: {}",
            url,
            serde_json::to_string_pretty(body).unwrap_or_default()
        );

        let resp = self.client.post(&url).json(body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            log::error!("Ollama API error {} from {}: {}", status, url, text);
            return Err(AdapterError::status(status, text));
        }

        Ok(resp)
    }
}

#[async_trait]
impl ContentGenerator for OllamaContentGenerator {
    async fn generate_content(
        &self,
        request: &GenerateContentParameters,
        user_prompt_id: &str,
    ) -> Result<GenerateContentResponse> {
        let chat = to_chat_request(request, &self.config);
        log::info!(
            "Ollama generate [{}]: model={} messages={}",
            user_prompt_id,
            chat.model,
            chat.messages.len()
        );

        let resp = self.post(CHAT_PATH, &chat).await?;
        let body = resp.text().await?;
        log::debug!("Ollama response: {}", body);

        let record: ChatResponse = serde_json::from_str(&body)?;
        if !record.has_content() {
            return Err(AdapterError::EmptyResponse(format!(
                "no message content from model {}",
                chat.model
            )));
        }

        Ok(to_generate_response(&record))
    }

    async fn generate_content_stream(
        &self,
        request: &GenerateContentParameters,
        user_prompt_id: &str,
    ) -> Result<ResponseStream> {
        let mut chat = to_chat_request(request, &self.config);
        chat.stream = true;
        log::info!(
            "Ollama stream [{}]: model={} messages={}",
            user_prompt_id,
            chat.model,
            chat.messages.len()
        );

        let resp = self.post(CHAT_PATH, &chat).await?;
        Ok(decode_stream(resp.bytes_stream()))
    }

    /// Heuristic estimate, see [`estimate`]; no request is sent.
    async fn count_tokens(
        &self,
        request: &GenerateContentParameters,
    ) -> Result<CountTokensResponse> {
        Ok(estimate_tokens(&request.contents))
    }

    async fn embed_content(
        &self,
        request: &GenerateContentParameters,
    ) -> Result<EmbedContentResponse> {
        let model = request
            .model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.config.embedding_model())
            .to_string();
        let body = EmbeddingRequest {
            model,
            prompt: embedding_prompt(&request.contents),
        };

        let resp = self.post(EMBEDDINGS_PATH, &body).await?;
        let embedding: EmbeddingResponse = resp.json().await?;

        Ok(EmbedContentResponse {
            embeddings: vec![ContentEmbedding {
                values: embedding.into_first(),
            }],
        })
    }
}
