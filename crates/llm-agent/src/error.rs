use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmAgentError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limited by model endpoint")]
    RateLimited,

    #[error("Model response had no content")]
    EmptyResponse,

    #[error("Failed to parse model output as JSON: {source}\n  output: {output}")]
    Parse {
        output: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No API key configured")]
    MissingApiKey,
}
