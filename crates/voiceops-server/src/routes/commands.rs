use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Deserialize;
use voiceops_core::pipeline::{ConfirmResponse, QuickExecuteResponse, SubmitResponse};

use crate::error::{json_body, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommandBody {
    #[serde(default)]
    pub transcript: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmBody {
    #[serde(default)]
    pub command_id: String,
    pub approved: bool,
}

/// POST /api/process-command: propose a plan and stage it for confirmation.
pub async fn process_command(
    State(app): State<AppState>,
    body: Result<Json<CommandBody>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let body = json_body(body)?;
    let response = app.pipeline.submit(&body.transcript).await?;
    Ok(Json(response))
}

/// POST /api/confirm-action: approve or reject a staged plan.
pub async fn confirm_action(
    State(app): State<AppState>,
    body: Result<Json<ConfirmBody>, JsonRejection>,
) -> Result<Json<ConfirmResponse>, AppError> {
    let body = json_body(body)?;
    let response = app.pipeline.confirm(&body.command_id, body.approved).await?;
    Ok(Json(response))
}

/// POST /api/quick-execute: propose and execute without a confirmation round.
pub async fn quick_execute(
    State(app): State<AppState>,
    body: Result<Json<CommandBody>, JsonRejection>,
) -> Result<Json<QuickExecuteResponse>, AppError> {
    let body = json_body(body)?;
    let response = app.pipeline.quick_execute(&body.transcript).await?;
    Ok(Json(response))
}

/// POST /api/transcribe: speech to text for the multipart field `audio`.
pub async fn transcribe(
    State(app): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?
    {
        if field.name() != Some("audio") {
            continue;
        }
        let filename = field.file_name().unwrap_or("audio.webm").to_string();
        let audio = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;
        if audio.is_empty() {
            return Err(AppError::bad_request("audio file is empty"));
        }

        tracing::info!(bytes = audio.len(), %filename, "transcribing upload");
        let transcript = app.transcriber.transcribe(audio.to_vec(), &filename).await?;
        return Ok(Json(serde_json::json!({ "transcript": transcript })));
    }
    Err(AppError::bad_request("multipart field 'audio' is required"))
}
