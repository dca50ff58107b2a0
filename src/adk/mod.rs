// SPDX-License-Identifier: MIT

//! Generic content generation interface and its Ollama adapter

pub mod config;
pub mod error;
pub mod model;

pub use config::{AuthType, ContentGeneratorConfig, SamplingParams};
pub use error::AdapterError;
pub use model::ollama::OllamaContentGenerator;
pub use model::ContentGenerator;
