//! `llm-agent`: client for OpenAI-compatible model endpoints.
//!
//! Two calls are supported: a single-turn chat completion (system prompt +
//! user prompt, deterministic temperature) and audio transcription against a
//! Whisper-compatible `/audio/transcriptions` endpoint. Model replies that
//! are meant to be JSON go through [`parse::extract_json`], which tolerates
//! the markdown fencing models like to add.
//!
//! # Architecture
//!
//! ```text
//! ClientConfig
//!     │
//!     ▼
//! LlmClient       ← POST {base_url}/chat/completions     (Bearer auth)
//!     │             POST {base_url}/audio/transcriptions (multipart)
//!     ▼
//! String reply
//!     │
//!     ▼
//! extract_json    ← strips ``` fences and a leading `json` tag
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use llm_agent::{ClientConfig, LlmClient};
//!
//! let client = LlmClient::new(ClientConfig {
//!     api_key: Some("gsk-...".into()),
//!     ..Default::default()
//! })?;
//! let value = client
//!     .complete_json("Reply with JSON only.", "classify: close AUTH-7")
//!     .await?;
//! ```

pub mod client;
pub mod error;
pub mod parse;
pub mod types;

pub use client::{mime_for, LlmClient};
pub use error::LlmAgentError;
pub use parse::extract_json;
pub use types::{ChatMessage, ClientConfig, Role};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, LlmAgentError>;
