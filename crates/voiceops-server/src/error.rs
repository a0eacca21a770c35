use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use voiceops_core::VoiceOpsError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(VoiceOpsError::Validation(msg.into()).into())
    }
}

/// Unwrap a JSON request body, reporting a rejected body as 400 instead of
/// axum's plain-text 415/422.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

fn status_for(err: &VoiceOpsError) -> StatusCode {
    match err {
        VoiceOpsError::Validation(_) => StatusCode::BAD_REQUEST,
        VoiceOpsError::PendingNotFound(_) => StatusCode::NOT_FOUND,
        VoiceOpsError::AlreadyStaged(_) => StatusCode::CONFLICT,
        VoiceOpsError::Collaborator { .. } | VoiceOpsError::MalformedOutput(_) => {
            StatusCode::BAD_GATEWAY
        }
        VoiceOpsError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        VoiceOpsError::UnknownActionKind(_)
        | VoiceOpsError::StepExecution(_)
        | VoiceOpsError::Io(_)
        | VoiceOpsError::Yaml(_)
        | VoiceOpsError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self
            .0
            .downcast_ref::<VoiceOpsError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{:#}", self.0);
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
