use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use voiceops_core::plan::{TicketUpdates, UpdateTicketParams};

use crate::error::{json_body, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TicketUpdateBody {
    pub ticket_id: String,
    #[serde(default)]
    pub updates: TicketUpdates,
}

/// POST /api/tickets/update: apply field changes to the tracker and the index.
pub async fn update_ticket(
    State(app): State<AppState>,
    body: Result<Json<TicketUpdateBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let body = json_body(body)?;
    let ticket_id = body.ticket_id.trim();
    if ticket_id.is_empty() {
        return Err(AppError::bad_request("ticket_id is required"));
    }
    let params = UpdateTicketParams {
        ticket_id: ticket_id.to_string(),
        updates: body.updates,
    };
    let result = app.handler.update_ticket(&params).await?;
    Ok(Json(result))
}

/// GET /api/tickets/jira/{key}
pub async fn get_jira_issue(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let issue = app.tracker.get_issue(&key).await?;
    Ok(Json(issue))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    5
}

/// GET /api/tickets/jira-search?query=
pub async fn search_jira(
    State(app): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    if params.query.trim().is_empty() {
        return Err(AppError::bad_request("query is required"));
    }
    let results = app
        .tracker
        .search_issues(params.query.trim(), params.max_results)
        .await?;
    Ok(Json(results))
}
