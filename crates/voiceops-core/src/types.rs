use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CreateTicket,
    UpdateTicket,
    CloseTicket,
    FindSimilar,
    NotifySlack,
    QueryStatus,
    RunWorkflow,
}

impl Intent {
    pub fn all() -> &'static [Intent] {
        &[
            Intent::CreateTicket,
            Intent::UpdateTicket,
            Intent::CloseTicket,
            Intent::FindSimilar,
            Intent::NotifySlack,
            Intent::QueryStatus,
            Intent::RunWorkflow,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::CreateTicket => "create_ticket",
            Intent::UpdateTicket => "update_ticket",
            Intent::CloseTicket => "close_ticket",
            Intent::FindSimilar => "find_similar",
            Intent::NotifySlack => "notify_slack",
            Intent::QueryStatus => "query_status",
            Intent::RunWorkflow => "run_workflow",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Priority name used by the issue tracker.
    pub fn tracker_name(self) -> &'static str {
        match self {
            Priority::Critical => "Highest",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TicketStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    /// Workflow state name the tracker transitions into.
    pub fn tracker_name(self) -> &'static str {
        match self {
            TicketStatus::Open => "To Do",
            TicketStatus::InProgress => "In Progress",
            TicketStatus::Resolved | TicketStatus::Closed => "Done",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CommandStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a submitted command.
///
/// `PendingConfirmation` is transient; every other value is terminal and
/// assigned at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    NeedsClarification,
    PendingConfirmation,
    Rejected,
    Executed,
}

impl CommandStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandStatus::NeedsClarification => "needs_clarification",
            CommandStatus::PendingConfirmation => "pending_confirmation",
            CommandStatus::Rejected => "rejected",
            CommandStatus::Executed => "executed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, CommandStatus::PendingConfirmation)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Entities / IntentResult
// ---------------------------------------------------------------------------

/// Structured facts extracted from a transcript. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ticket_id: Option<String>,
    #[serde(default)]
    pub new_status: Option<TicketStatus>,
}

/// Output of the intent extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,
    #[serde(default)]
    pub entities: Entities,
}

// ---------------------------------------------------------------------------
// Ticket / TicketStats
// ---------------------------------------------------------------------------

/// A ticket document as held by the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub jira_key: Option<String>,
    #[serde(default)]
    pub jira_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

/// Aggregate ticket counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketStats {
    #[serde(default)]
    pub by_project: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_priority: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_status: BTreeMap<String, u64>,
}
