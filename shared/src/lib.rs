//! Shared building blocks for the lead-scoring backend: configuration
//! handling, the error taxonomy, domain DTOs and the chat-completion client.

pub mod config;
pub mod dto;
pub mod error;
pub mod llm;
pub mod llm_json;
