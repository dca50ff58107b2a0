// SPDX-License-Identifier: MIT

//! Ollama wire types for `/api/chat` and `/api/embeddings`

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Role of a flattened chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Request body for `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OllamaTool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ChatOptions>,
}

/// Model options block; only the fields that were set are sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// A tool in Ollama's function-calling shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: OllamaFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaFunction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl OllamaTool {
    pub fn function(name: String, description: Option<String>, parameters: Option<Value>) -> Self {
        Self {
            kind: "function".to_string(),
            function: OllamaFunction {
                name,
                description,
                parameters,
            },
        }
    }

    /// Placeholder for a tool that could not be mapped
    pub fn sentinel() -> Self {
        Self {
            kind: String::new(),
            function: OllamaFunction {
                name: String::new(),
                description: None,
                parameters: None,
            },
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.kind.is_empty() || self.function.name.is_empty()
    }
}

/// One decoded unit of `/api/chat` output.
///
/// Every field is optional on the wire; streaming deltas routinely omit
/// everything except `message` and `done`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub message: ResponseMessage,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
}

impl ChatResponse {
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.message.tool_calls.as_deref().unwrap_or(&[])
    }

    /// True when the record carries text or tool calls
    pub fn has_content(&self) -> bool {
        !self.message.content.is_empty() || !self.tool_calls().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: ToolCallFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: ToolCallArguments,
}

/// Tool call arguments as sent by the server: a raw JSON string or an
/// already-decoded object, depending on server version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolCallArguments {
    Raw(String),
    Decoded(Value),
}

impl Default for ToolCallArguments {
    fn default() -> Self {
        Self::Raw(String::new())
    }
}

impl ToolCallArguments {
    /// Arguments as a JSON value; empty or unparsable input yields `{}`
    pub fn parse(&self) -> Value {
        match self {
            Self::Raw(raw) if raw.trim().is_empty() => json!({}),
            Self::Raw(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                log::warn!("Unparsable tool call arguments {:?}: {}", raw, e);
                json!({})
            }),
            Self::Decoded(Value::Null) => json!({}),
            Self::Decoded(value) => value.clone(),
        }
    }
}

/// Request body for `POST /api/embeddings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub prompt: String,
}

/// Response of the embeddings endpoints, in either the single-vector or
/// the list shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<Vec<Vec<f32>>>,
}

impl EmbeddingResponse {
    /// The first vector returned, or an empty vector
    pub fn into_first(self) -> Vec<f32> {
        self.embeddings
            .and_then(|list| list.into_iter().next())
            .or(self.embedding)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_omits_unset_fields() {
        let request = ChatRequest {
            model: "llama3.2".to_string(),
            messages: vec![ChatMessage {
                role: MessageRole::Assistant,
                content: "hi".to_string(),
            }],
            stream: false,
            tools: None,
            options: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "llama3.2",
                "messages": [{ "role": "assistant", "content": "hi" }],
                "stream": false
            })
        );
    }

    #[test]
    fn test_minimal_stream_record_parses() {
        let record: ChatResponse =
            serde_json::from_str(r#"{"message":{"content":"a"},"done":false}"#).unwrap();
        assert_eq!(record.message.content, "a");
        assert!(!record.done);
        assert!(record.tool_calls().is_empty());
        assert!(record.has_content());
    }

    #[test]
    fn test_tool_call_arguments_string_and_object() {
        let raw = ToolCallArguments::Raw(r#"{"city":"London"}"#.to_string());
        assert_eq!(raw.parse(), json!({ "city": "London" }));

        let decoded: ToolCallArguments = serde_json::from_value(json!({ "city": "Paris" })).unwrap();
        assert_eq!(decoded.parse(), json!({ "city": "Paris" }));

        assert_eq!(ToolCallArguments::Raw(String::new()).parse(), json!({}));
        assert_eq!(ToolCallArguments::Raw("{oops".to_string()).parse(), json!({}));
    }

    #[test]
    fn test_embedding_response_shapes() {
        let single: EmbeddingResponse =
            serde_json::from_value(json!({ "embedding": [0.1, 0.2] })).unwrap();
        assert_eq!(single.into_first(), vec![0.1, 0.2]);

        let list: EmbeddingResponse =
            serde_json::from_value(json!({ "embeddings": [[1.0], [2.0]] })).unwrap();
        assert_eq!(list.into_first(), vec![1.0]);

        let empty: EmbeddingResponse = serde_json::from_value(json!({ "embeddings": [] })).unwrap();
        assert!(empty.into_first().is_empty());
    }

    #[test]
    fn test_sentinel_tool() {
        assert!(OllamaTool::sentinel().is_sentinel());
        assert!(!OllamaTool::function("search".to_string(), None, None).is_sentinel());
    }
}
