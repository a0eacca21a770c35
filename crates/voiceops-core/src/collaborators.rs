//! Contracts for the external services the pipeline consumes.
//!
//! Concrete adapters live in [`crate::connectors`] (and, for the reasoning
//! backend, in the server crate). Tests substitute their own fakes.

use async_trait::async_trait;
use serde::Serialize;

use crate::audit::{ActionLogRecord, CommandLogRecord};
use crate::context::ContextBundle;
use crate::error::Result;
use crate::plan::{Plan, TicketUpdates};
use crate::types::{IntentResult, Priority, Ticket, TicketStats};

// ---------------------------------------------------------------------------
// Reasoning
// ---------------------------------------------------------------------------

#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract_intent(&self, transcript: &str) -> Result<IntentResult>;
}

#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate_plan(
        &self,
        transcript: &str,
        intent: &IntentResult,
        context: &ContextBundle,
    ) -> Result<Plan>;
}

// ---------------------------------------------------------------------------
// Search and indexing
// ---------------------------------------------------------------------------

/// Read side of the operational history used to ground plans.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn similar_tickets(&self, description: &str, limit: usize) -> Result<Vec<Ticket>>;

    async fn ticket_by_id(&self, ticket_id: &str) -> Result<Option<Ticket>>;

    async fn past_commands(&self, transcript: &str, limit: usize)
        -> Result<Vec<CommandLogRecord>>;

    async fn past_actions(&self, action_type: &str, limit: usize) -> Result<Vec<ActionLogRecord>>;

    async fn ticket_stats(&self) -> Result<TicketStats>;
}

/// Write side of the ticket index.
#[async_trait]
pub trait TicketIndex: Send + Sync {
    async fn index_ticket(&self, ticket: &Ticket) -> Result<()>;

    /// Apply `updates` to the ticket and return it as it was before the
    /// change, or `None` if no such ticket is indexed.
    async fn update_ticket(&self, ticket_id: &str, updates: &TicketUpdates)
        -> Result<Option<Ticket>>;
}

// ---------------------------------------------------------------------------
// Issue tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewIssue {
    pub summary: String,
    pub description: String,
    pub priority: Priority,
    pub labels: Vec<String>,
    /// Email or display name, resolved through the tracker's user search.
    pub assignee: Option<String>,
}

/// Issue tracker client. Responses are passed through to step results and
/// HTTP callers, so they stay as JSON payloads.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn create_issue(&self, issue: &NewIssue) -> Result<serde_json::Value>;

    async fn update_issue(&self, key: &str, updates: &TicketUpdates) -> Result<serde_json::Value>;

    async fn get_issue(&self, key: &str) -> Result<serde_json::Value>;

    async fn search_issues(&self, query: &str, max_results: usize) -> Result<serde_json::Value>;
}

// ---------------------------------------------------------------------------
// Notification and transcription
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Notifier: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn notify(&self, channel: &str, message: &str) -> Result<serde_json::Value>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String>;
}
