//! Audit records and the sink they are appended to.
//!
//! Records are immutable once built. The core appends them and moves on; a
//! sink failure is logged by the caller, never surfaced to the client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{CommandStatus, Entities, Intent, IntentResult};

/// Principal recorded on every audit record.
pub const AUDIT_USER: &str = "voiceops-user";

// ---------------------------------------------------------------------------
// ActionLogRecord
// ---------------------------------------------------------------------------

/// One record per executed step (and one per rejected plan).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogRecord {
    pub action_id: String,
    pub command_id: String,
    pub action_type: String,
    pub tool_used: String,
    pub success: bool,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub explanation: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl ActionLogRecord {
    pub fn new(command_id: impl Into<String>, action_type: impl Into<String>) -> Self {
        let action_type = action_type.into();
        Self {
            action_id: format!("act-{}", &Uuid::new_v4().simple().to_string()[..8]),
            command_id: command_id.into(),
            tool_used: format!("voiceops_{action_type}"),
            action_type,
            success: false,
            reasoning: String::new(),
            explanation: String::new(),
            timestamp: Utc::now(),
            duration_ms: 0,
            user: AUDIT_USER.to_string(),
            details: serde_json::Value::Null,
        }
    }

    /// The record written when a reviewer turns a plan down.
    pub fn rejection(command_id: impl Into<String>) -> Self {
        Self {
            tool_used: "user_review".to_string(),
            success: true,
            reasoning: "User rejected the proposed plan.".to_string(),
            explanation: "No actions executed.".to_string(),
            ..Self::new(command_id, "rejected")
        }
    }
}

// ---------------------------------------------------------------------------
// CommandLogRecord
// ---------------------------------------------------------------------------

/// One record per finalized command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandLogRecord {
    pub command_id: String,
    pub raw_transcript: String,
    pub intent: Intent,
    #[serde(default)]
    pub entities: Entities,
    pub status: CommandStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user: String,
}

impl CommandLogRecord {
    pub fn new(
        command_id: impl Into<String>,
        transcript: impl Into<String>,
        intent: &IntentResult,
        status: CommandStatus,
    ) -> Self {
        Self {
            command_id: command_id.into(),
            raw_transcript: transcript.into(),
            intent: intent.intent,
            entities: intent.entities.clone(),
            status,
            timestamp: Utc::now(),
            user: AUDIT_USER.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// AuditSink
// ---------------------------------------------------------------------------

/// Append-only store for command and action records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_command(&self, record: CommandLogRecord) -> Result<()>;

    async fn record_action(&self, record: ActionLogRecord) -> Result<()>;
}
