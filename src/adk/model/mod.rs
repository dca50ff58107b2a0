// SPDX-License-Identifier: MIT

//! Model module - generic content generation types and trait
//!
//! This module provides the [`ContentGenerator`] trait and the generic,
//! provider-neutral request/response shapes it speaks. Provider adapters
//! live in their own submodules:
//! - [ollama] - a locally hosted Ollama server

mod normalize;
pub mod ollama;

use crate::adk::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    System,
    /// Any role string this crate does not know
    #[serde(other)]
    Other,
}

/// Sampling and tool configuration attached to a request
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
    #[serde(
        default,
        deserialize_with = "normalize::system_instruction",
        skip_serializing_if = "Option::is_none"
    )]
    pub system_instruction: Option<Content>,
    #[serde(
        default,
        deserialize_with = "normalize::tools",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tools: Vec<Tool>,
}

/// A turn in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// The key must be present; `null` is read as no role
    #[serde(deserialize_with = "normalize::role")]
    pub role: Option<Role>,
    #[serde(deserialize_with = "normalize::parts")]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            role: Some(role),
            parts,
        }
    }

    /// A user turn holding a single text part
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::Text(text.into())])
    }

    /// A model turn holding a single text part
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::Text(text.into())])
    }

    /// Text of every text part, in order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(Part::as_text)
    }
}

/// Parts of a turn - text, function calls, function results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    /// Plain text
    Text(String),
    /// Function/tool call requested by the model
    FunctionCall(FunctionCall),
    /// Response from executing a function/tool
    FunctionResponse(FunctionResponse),
}

impl Part {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub response: Value,
}

/// A tool exposed to the model.
///
/// Deserialization never fails on a malformed tool entry: anything without
/// a usable shape becomes a tool with no declarations, which the provider
/// mappers drop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_declarations: Option<Vec<FunctionDeclaration>>,
}

impl Tool {
    pub fn function(declaration: FunctionDeclaration) -> Self {
        Self {
            function_declarations: Some(vec![declaration]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// A generic content generation request.
///
/// `contents` accepts a plain string, a single turn or a list of turns on
/// the wire; turns missing the `role` key or a usable `parts` value are
/// dropped while deserializing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateContentParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "normalize::contents")]
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<GenerationConfig>,
}

impl GenerateContentParameters {
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            model: None,
            contents,
            config: None,
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn tools(&self) -> &[Tool] {
        self.config.as_ref().map(|c| c.tools.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    Stop,
    Length,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: u32,
    pub candidates_token_count: u32,
    pub total_token_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Content,
    pub finish_reason: FinishReason,
    pub index: u32,
}

/// A generic content generation response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
    pub usage_metadata: UsageMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| c.content.texts().collect())
            .unwrap_or_default()
    }

    /// Function calls of the first candidate
    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| match p {
                        Part::FunctionCall(fc) => Some(fc),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.candidates.first().map(|c| c.finish_reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensResponse {
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentEmbedding {
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedContentResponse {
    pub embeddings: Vec<ContentEmbedding>,
}

/// Stream of generic responses produced by a streaming call
pub type ResponseStream = BoxStream<'static, Result<GenerateContentResponse>>;

/// Core trait for content generator implementations
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate one complete response.
    ///
    /// `user_prompt_id` correlates the call in logs and is not interpreted.
    async fn generate_content(
        &self,
        request: &GenerateContentParameters,
        user_prompt_id: &str,
    ) -> Result<GenerateContentResponse>;

    /// Generate a response as a stream of deltas
    async fn generate_content_stream(
        &self,
        request: &GenerateContentParameters,
        user_prompt_id: &str,
    ) -> Result<ResponseStream>;

    /// Count the tokens of a request
    async fn count_tokens(&self, request: &GenerateContentParameters)
        -> Result<CountTokensResponse>;

    /// Embed the text of a request
    async fn embed_content(
        &self,
        request: &GenerateContentParameters,
    ) -> Result<EmbedContentResponse>;
}
