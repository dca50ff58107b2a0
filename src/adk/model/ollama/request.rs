// SPDX-License-Identifier: MIT

//! Generic request -> Ollama `/api/chat` request

use super::types::{ChatMessage, ChatOptions, ChatRequest, MessageRole, OllamaTool};
use crate::adk::config::{ContentGeneratorConfig, SamplingParams};
use crate::adk::model::{Content, GenerateContentParameters, GenerationConfig, Role, Tool};

/// Map a generic request onto a chat request.
///
/// The result always has `stream=false`; the streaming path flips it.
pub fn to_chat_request(
    request: &GenerateContentParameters,
    config: &ContentGeneratorConfig,
) -> ChatRequest {
    let generation = request.config.as_ref();

    let system = generation
        .and_then(|g| g.system_instruction.as_ref())
        .map(flatten_text)
        .filter(|text| !text.is_empty())
        .map(|content| ChatMessage {
            role: MessageRole::System,
            content,
        });

    let messages = system
        .into_iter()
        .chain(request.contents.iter().filter_map(to_chat_message))
        .collect();

    let model = request
        .model
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(&config.model)
        .to_string();

    ChatRequest {
        model,
        messages,
        stream: false,
        tools: to_ollama_tools(request.tools()),
        options: to_chat_options(generation, config.sampling.as_ref()),
    }
}

/// Flatten one turn into a single message; `None` when it has no text
fn to_chat_message(content: &Content) -> Option<ChatMessage> {
    let text = flatten_text(content);
    if text.is_empty() {
        return None;
    }
    Some(ChatMessage {
        role: map_role(content.role),
        content: text,
    })
}

fn map_role(role: Option<Role>) -> MessageRole {
    match role {
        Some(Role::Model) => MessageRole::Assistant,
        _ => MessageRole::User,
    }
}

/// Text parts joined by a single space, then trimmed. Other parts are dropped.
pub(crate) fn flatten_text(content: &Content) -> String {
    content.texts().collect::<Vec<_>>().join(" ").trim().to_string()
}

fn to_ollama_tools(tools: &[Tool]) -> Option<Vec<OllamaTool>> {
    if tools.is_empty() {
        return None;
    }

    let mapped: Vec<OllamaTool> = tools
        .iter()
        .map(to_ollama_tool)
        .filter(|tool| !tool.is_sentinel())
        .collect();

    if mapped.len() < tools.len() {
        log::warn!(
            "Dropped {} tool(s) without a usable function declaration",
            tools.len() - mapped.len()
        );
    }
    if mapped.is_empty() {
        return None;
    }

    log::info!(
        "Sending tools to Ollama: {}",
        mapped
            .iter()
            .map(|t| t.function.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Some(mapped)
}

fn to_ollama_tool(tool: &Tool) -> OllamaTool {
    let declaration = tool
        .function_declarations
        .as_ref()
        .and_then(|decls| decls.first());

    match declaration {
        Some(decl) => match decl.name.as_deref() {
            Some(name) if !name.trim().is_empty() => OllamaTool::function(
                name.to_string(),
                decl.description.clone(),
                decl.parameters.clone(),
            ),
            _ => OllamaTool::sentinel(),
        },
        None => OllamaTool::sentinel(),
    }
}

/// Request-level values win over the adapter's configured sampling
fn to_chat_options(
    generation: Option<&GenerationConfig>,
    sampling: Option<&SamplingParams>,
) -> Option<ChatOptions> {
    let sampling = sampling.copied().unwrap_or_default();
    let (temperature, top_p, top_k, repeat_penalty, num_predict) = match generation {
        Some(g) => (
            g.temperature,
            g.top_p,
            g.top_k,
            g.repetition_penalty,
            g.max_output_tokens,
        ),
        None => (None, None, None, None, None),
    };

    let options = ChatOptions {
        temperature: temperature.or(sampling.temperature),
        top_p: top_p.or(sampling.top_p),
        top_k: top_k.or(sampling.top_k),
        repeat_penalty: repeat_penalty.or(sampling.repetition_penalty),
        num_predict: num_predict.or(sampling.max_tokens),
    };

    (options != ChatOptions::default()).then_some(options)
}
