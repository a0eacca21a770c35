//! Action handlers: the side effects a plan step can have.
//!
//! A handler returns `Ok(payload)` when it ran to completion. A payload
//! carrying a top-level `"error"` field reports a business-level failure
//! (the step is `failed`); `Err` is a fault (the step is `error`).

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::collaborators::{IssueTracker, NewIssue, Notifier, TicketIndex};
use crate::error::Result;
use crate::plan::{CreateTicketParams, NotifyParams, UpdateTicketParams};
use crate::types::{Ticket, TicketStatus};

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn create_ticket(&self, params: &CreateTicketParams) -> Result<serde_json::Value>;

    async fn update_ticket(&self, params: &UpdateTicketParams) -> Result<serde_json::Value>;

    async fn notify(&self, params: &NotifyParams) -> Result<serde_json::Value>;
}

// ---------------------------------------------------------------------------
// Ticket id prefixes
// ---------------------------------------------------------------------------

const PROJECT_PREFIXES: &[(&str, &str)] = &[
    ("AUTH-BACKEND", "AUTH"),
    ("CORE-PLATFORM", "CORE"),
    ("FRONTEND", "FE"),
];

/// Short ticket-id prefix for a project: a known alias, else its first four
/// characters.
pub fn project_prefix(project: &str) -> String {
    PROJECT_PREFIXES
        .iter()
        .find(|(name, _)| *name == project)
        .map(|(_, prefix)| prefix.to_string())
        .unwrap_or_else(|| project.chars().take(4).collect())
}

fn local_ticket_id(project: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..3].to_uppercase();
    format!("{}-{suffix}", project_prefix(project))
}

// ---------------------------------------------------------------------------
// TicketActions
// ---------------------------------------------------------------------------

/// Production handler set: tickets go to the issue tracker and the ticket
/// index, notifications to the notifier.
#[derive(Clone)]
pub struct TicketActions {
    tracker: Arc<dyn IssueTracker>,
    index: Arc<dyn TicketIndex>,
    notifier: Arc<dyn Notifier>,
}

impl TicketActions {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        index: Arc<dyn TicketIndex>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            tracker,
            index,
            notifier,
        }
    }
}

#[async_trait]
impl ActionHandler for TicketActions {
    async fn create_ticket(&self, params: &CreateTicketParams) -> Result<serde_json::Value> {
        let project = params.project.clone().unwrap_or_else(|| "UNKNOWN".into());
        let priority = params.priority.unwrap_or_default();

        let jira = self
            .tracker
            .create_issue(&NewIssue {
                summary: params.summary.clone().unwrap_or_default(),
                description: params.description.clone().unwrap_or_default(),
                priority,
                labels: params.labels.clone(),
                assignee: params.assignee.clone(),
            })
            .await?;
        let jira_key = jira["jira_key"]
            .as_str()
            .filter(|k| !k.is_empty())
            .map(String::from);
        let jira_url = jira_key
            .as_ref()
            .and(jira["jira_url"].as_str())
            .map(String::from);

        let ticket = Ticket {
            ticket_id: jira_key.clone().unwrap_or_else(|| local_ticket_id(&project)),
            project,
            summary: params.summary.clone().unwrap_or_default(),
            description: params.description.clone().unwrap_or_default(),
            priority,
            assignee: Some(
                params
                    .assignee
                    .clone()
                    .unwrap_or_else(|| "unassigned".into()),
            ),
            team: params.team.clone(),
            status: TicketStatus::Open,
            created_at: Some(Utc::now()),
            labels: params.labels.clone(),
            jira_key,
            jira_url,
            relevance_score: None,
        };
        self.index.index_ticket(&ticket).await?;
        tracing::info!(ticket_id = %ticket.ticket_id, "ticket created");

        Ok(json!({
            "ticket_id": ticket.ticket_id,
            "action": "created",
            "jira": jira,
            "data": ticket,
        }))
    }

    async fn update_ticket(&self, params: &UpdateTicketParams) -> Result<serde_json::Value> {
        let ticket_id = params.ticket_id.as_str();

        let jira = if self.tracker.is_configured() {
            Some(self.tracker.update_issue(ticket_id, &params.updates).await?)
        } else {
            None
        };

        let previous = self.index.update_ticket(ticket_id, &params.updates).await?;
        let Some(previous) = previous else {
            return Ok(json!({
                "ticket_id": ticket_id,
                "action": "updated",
                "changes": params.updates,
                "jira": jira,
                "error": format!("Document {ticket_id} not found"),
            }));
        };
        tracing::info!(ticket_id, "ticket updated");

        Ok(json!({
            "ticket_id": ticket_id,
            "action": "updated",
            "changes": params.updates,
            "jira": jira,
            "previous": previous,
        }))
    }

    async fn notify(&self, params: &NotifyParams) -> Result<serde_json::Value> {
        self.notifier.notify(&params.channel, &params.message).await
    }
}
