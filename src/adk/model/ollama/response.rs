// SPDX-License-Identifier: MIT

//! Ollama chat record -> generic response

use super::types::ChatResponse;
use crate::adk::model::{
    Candidate, Content, FinishReason, FunctionCall, GenerateContentResponse, Part, Role,
    UsageMetadata,
};
use chrono::{DateTime, Utc};

/// Map one chat record onto a single-candidate response. Never fails.
pub fn to_generate_response(record: &ChatResponse) -> GenerateContentResponse {
    let mut parts = Vec::new();

    if !record.message.content.is_empty() {
        parts.push(Part::Text(record.message.content.clone()));
    }

    for call in record.tool_calls() {
        parts.push(Part::FunctionCall(FunctionCall {
            id: None,
            name: call.function.name.clone(),
            args: call.function.arguments.parse(),
        }));
    }

    let finish_reason = if record.done {
        FinishReason::Stop
    } else {
        FinishReason::Length
    };

    let prompt = record.prompt_eval_count.unwrap_or(0);
    let candidates = record.eval_count.unwrap_or(0);

    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Content::new(Role::Model, parts),
            finish_reason,
            index: 0,
        }],
        usage_metadata: UsageMetadata {
            prompt_token_count: prompt,
            candidates_token_count: candidates,
            total_token_count: prompt.saturating_add(candidates),
        },
        model_version: Some(record.model.clone()).filter(|m| !m.is_empty()),
        create_time: record
            .created_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> ChatResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_text_record() {
        let response = to_generate_response(&record(json!({
            "model": "llama3.2",
            "created_at": "2023-12-12T14:13:43.416799Z",
            "message": { "role": "assistant", "content": "Hello!" },
            "done": true,
            "prompt_eval_count": 26,
            "eval_count": 298
        })));

        assert_eq!(response.text(), "Hello!");
        assert_eq!(response.finish_reason(), Some(FinishReason::Stop));
        assert_eq!(response.candidates[0].content.role, Some(Role::Model));
        assert_eq!(
            response.usage_metadata,
            UsageMetadata {
                prompt_token_count: 26,
                candidates_token_count: 298,
                total_token_count: 324,
            }
        );
        assert_eq!(response.model_version.as_deref(), Some("llama3.2"));
        assert!(response.create_time.is_some());
    }

    #[test]
    fn test_finish_reason_follows_done_flag() {
        for done in [true, false] {
            let response = to_generate_response(&ChatResponse {
                done,
                ..Default::default()
            });
            let expected = if done {
                FinishReason::Stop
            } else {
                FinishReason::Length
            };
            assert_eq!(response.finish_reason(), Some(expected));
        }
    }

    #[test]
    fn test_text_then_tool_calls() {
        let response = to_generate_response(&record(json!({
            "message": {
                "role": "assistant",
                "content": "Checking.",
                "tool_calls": [
                    { "function": { "name": "get_weather", "arguments": "{\"city\":\"London\"}" } },
                    { "function": { "name": "get_time", "arguments": "" } },
                    { "function": { "name": "get_date", "arguments": { "tz": "UTC" } } }
                ]
            },
            "done": false
        })));

        let parts = &response.candidates[0].content.parts;
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], Part::Text("Checking.".to_string()));

        let calls = response.function_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].name, "get_weather");
        assert_eq!(calls[0].args, json!({ "city": "London" }));
        assert_eq!(calls[1].args, json!({}));
        assert_eq!(calls[2].args, json!({ "tz": "UTC" }));
    }

    #[test]
    fn test_empty_record_maps_to_empty_parts() {
        let response = to_generate_response(&ChatResponse::default());
        assert!(response.candidates[0].content.parts.is_empty());
        assert_eq!(response.usage_metadata, UsageMetadata::default());
        assert!(response.model_version.is_none());
        assert!(response.create_time.is_none());
    }

    #[test]
    fn test_unparsable_timestamp_is_ignored() {
        let response = to_generate_response(&ChatResponse {
            created_at: Some("yesterday".to_string()),
            ..Default::default()
        });
        assert!(response.create_time.is_none());
    }
}
