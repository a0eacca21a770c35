pub mod error;
pub mod reasoner;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{AppState, Services};

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Commands
        .route(
            "/api/process-command",
            post(routes::commands::process_command),
        )
        .route("/api/confirm-action", post(routes::commands::confirm_action))
        .route("/api/quick-execute", post(routes::commands::quick_execute))
        .route("/api/transcribe", post(routes::commands::transcribe))
        // Tickets
        .route("/api/tickets/update", post(routes::tickets::update_ticket))
        .route(
            "/api/tickets/jira/{key}",
            get(routes::tickets::get_jira_issue),
        )
        .route(
            "/api/tickets/jira-search",
            get(routes::tickets::search_jira),
        )
        // Health
        .route("/api/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the API server on `host:port`.
pub async fn serve(app_state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    serve_on(app_state, listener).await
}

/// Start the API server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(
    app_state: AppState,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = build_router(app_state);

    tracing::info!("VoiceOps API listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
