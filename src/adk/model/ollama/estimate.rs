// SPDX-License-Identifier: MIT

//! Token estimation and embedding prompt construction.
//!
//! Ollama has no token counting endpoint, so counts are estimated from
//! character length. The estimate is a heuristic and can be off by a wide
//! margin for code or non-Latin text; do not use it for hard limits.

use crate::adk::model::{Content, CountTokensResponse};

const CHARS_PER_TOKEN: usize = 4;

/// Text of every part of every turn, space-separated
fn joined_text(contents: &[Content]) -> String {
    contents
        .iter()
        .flat_map(Content::texts)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `ceil(chars / 4)` over the joined text of all turns
pub fn estimate_tokens(contents: &[Content]) -> CountTokensResponse {
    let chars = joined_text(contents).chars().count();
    let tokens = chars.div_ceil(CHARS_PER_TOKEN);
    CountTokensResponse {
        total_tokens: u32::try_from(tokens).unwrap_or(u32::MAX),
    }
}

/// Single trimmed prompt for the embeddings endpoint
pub fn embedding_prompt(contents: &[Content]) -> String {
    joined_text(contents).trim().to_string()
}
