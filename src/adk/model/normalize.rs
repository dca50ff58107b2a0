// SPDX-License-Identifier: MIT

//! Boundary normalization for generic requests.
//!
//! Callers may send `contents` and `parts` either as a single value or as a
//! list, and may send entries this crate cannot use. Everything is folded
//! here, once, into plain `Vec`s so the mappers only ever see the canonical
//! shape.

use super::{Content, FunctionCall, FunctionResponse, Part, Role, Tool};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Usable(T),
    Unusable(IgnoredAny),
}

/// A field that is dropped instead of failing the whole part when malformed
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Lenient<T>>::deserialize(deserializer)? {
        Some(Lenient::Usable(value)) => Some(value),
        _ => None,
    })
}

/// A part as sent on the wire: text and/or a function payload, with any
/// sibling keys (`thought`, `thoughtSignature`, `inlineData`, ...) ignored
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, deserialize_with = "lenient")]
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    function_call: Option<FunctionCall>,
    #[serde(default, deserialize_with = "lenient")]
    function_response: Option<FunctionResponse>,
}

impl WirePart {
    fn into_parts(self) -> impl Iterator<Item = Part> {
        self.text
            .map(Part::Text)
            .into_iter()
            .chain(self.function_call.map(Part::FunctionCall))
            .chain(self.function_response.map(Part::FunctionResponse))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PartSlot {
    Part(WirePart),
    Text(String),
    Unusable(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TurnSlot {
    Turn(Content),
    Unusable(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsInput {
    Text(String),
    Turns(OneOrMany<TurnSlot>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ToolSlot {
    Tool(Tool),
    Unusable(IgnoredAny),
}

#[derive(Deserialize)]
struct PartsOnly {
    #[serde(deserialize_with = "parts")]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SystemInstructionInput {
    Text(String),
    Turn(Content),
    RolelessTurn(PartsOnly),
    Parts(OneOrMany<PartSlot>),
}

fn usable_parts(slots: OneOrMany<PartSlot>) -> Vec<Part> {
    let mut parts = Vec::new();
    for slot in Vec::from(slots) {
        match slot {
            PartSlot::Part(part) => {
                let before = parts.len();
                parts.extend(part.into_parts());
                if parts.len() == before {
                    log::debug!("Dropping part with no text or function payload");
                }
            }
            PartSlot::Text(text) => parts.push(Part::Text(text)),
            PartSlot::Unusable(_) => {
                log::debug!("Dropping part with no text or function payload");
            }
        }
    }
    parts
}

pub(super) fn parts<'de, D>(deserializer: D) -> Result<Vec<Part>, D::Error>
where
    D: Deserializer<'de>,
{
    OneOrMany::<PartSlot>::deserialize(deserializer).map(usable_parts)
}

/// Used without `default`, so a turn missing the `role` key fails and is skipped
pub(super) fn role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Role>::deserialize(deserializer)
}

pub(super) fn contents<'de, D>(deserializer: D) -> Result<Vec<Content>, D::Error>
where
    D: Deserializer<'de>,
{
    let turns = match Option::<ContentsInput>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(ContentsInput::Text(text)) => vec![Content::user(text)],
        Some(ContentsInput::Turns(slots)) => Vec::from(slots)
            .into_iter()
            .filter_map(|slot| match slot {
                TurnSlot::Turn(content) => Some(content),
                TurnSlot::Unusable(_) => {
                    log::debug!("Skipping turn without both a role and a parts sequence");
                    None
                }
            })
            .collect(),
    };
    Ok(turns)
}

pub(super) fn tools<'de, D>(deserializer: D) -> Result<Vec<Tool>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(slots) = Option::<OneOrMany<ToolSlot>>::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(Vec::from(slots)
        .into_iter()
        .map(|slot| match slot {
            ToolSlot::Tool(tool) => tool,
            ToolSlot::Unusable(_) => Tool::default(),
        })
        .collect())
}

pub(super) fn system_instruction<'de, D>(deserializer: D) -> Result<Option<Content>, D::Error>
where
    D: Deserializer<'de>,
{
    let instruction = match Option::<SystemInstructionInput>::deserialize(deserializer)? {
        None => None,
        Some(SystemInstructionInput::Text(text)) => {
            Some(Content::new(Role::System, vec![Part::Text(text)]))
        }
        Some(SystemInstructionInput::Turn(content)) => Some(content),
        Some(SystemInstructionInput::RolelessTurn(turn)) => {
            Some(Content::new(Role::System, turn.parts))
        }
        Some(SystemInstructionInput::Parts(slots)) => {
            Some(Content::new(Role::System, usable_parts(slots)))
        }
    };
    Ok(instruction)
}
