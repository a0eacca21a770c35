use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /api/health: probes the search backend and reports wiring.
pub async fn health(State(app): State<AppState>) -> Json<serde_json::Value> {
    let pending = app.pipeline.pending().len().await;
    let mut body = serde_json::json!({
        "search_backend": app.search_backend,
        "jira_configured": app.tracker.is_configured(),
        "slack_configured": app.notifier.is_configured(),
        "pending_actions": pending,
    });

    match app.search.ticket_stats().await {
        Ok(stats) => {
            body["status"] = "healthy".into();
            body["tickets_by_status"] = serde_json::to_value(stats.by_status).unwrap_or_default();
        }
        Err(e) => {
            tracing::warn!(error = %e, "health probe failed");
            body["status"] = "unhealthy".into();
            body["error"] = e.to_string().into();
        }
    }
    Json(body)
}
