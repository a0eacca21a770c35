use regex::Regex;
use std::sync::OnceLock;

use crate::{LlmAgentError, Result};

fn fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").unwrap())
}

/// Parse a model reply that should be a JSON document.
///
/// Accepts bare JSON, JSON wrapped in a ``` / ```json fence, and JSON
/// preceded by a stray `json` tag.
pub fn extract_json(reply: &str) -> Result<serde_json::Value> {
    let mut text = reply.trim();
    if let Some(caps) = fence().captures(text) {
        if let Some(inner) = caps.get(1) {
            text = inner.as_str();
        }
    }
    let text = text.strip_prefix("json").unwrap_or(text).trim();

    serde_json::from_str(text).map_err(|source| LlmAgentError::Parse {
        output: reply.to_string(),
        source,
    })
}
