// SPDX-License-Identifier: MIT

//! ollama-bridge: a generic content generation interface spoken to a local
//! Ollama server.
//!
//! The [`adk::ContentGenerator`] trait is the caller-facing surface;
//! [`adk::OllamaContentGenerator`] implements it by translating requests to
//! Ollama's `/api/chat` schema and decoding its NDJSON stream.

pub mod adk;
