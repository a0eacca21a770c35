use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoiceOpsError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("no pending action found for command: {0}")]
    PendingNotFound(String),

    #[error("command already staged: {0}")]
    AlreadyStaged(String),

    #[error("{service} error: {message}")]
    Collaborator {
        service: &'static str,
        message: String,
    },

    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Unknown action: {0}")]
    UnknownActionKind(String),

    #[error("step execution failed: {0}")]
    StepExecution(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl VoiceOpsError {
    /// Shorthand for a transport or protocol fault in an external service.
    pub fn collaborator(service: &'static str, message: impl ToString) -> Self {
        Self::Collaborator {
            service,
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VoiceOpsError>;
