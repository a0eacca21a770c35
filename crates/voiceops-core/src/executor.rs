//! Sequential plan execution.
//!
//! Steps run one at a time in ascending sequence order. Each produces exactly
//! one [`StepResult`] and one [`ActionLogRecord`]; a failing step never stops
//! the steps after it and nothing is rolled back.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audit::{ActionLogRecord, AuditSink};
use crate::elapsed::Stopwatch;
use crate::error::VoiceOpsError;
use crate::handlers::ActionHandler;
use crate::plan::{Action, Plan, Step, UpdateTicketParams};
use crate::types::TicketStatus;

// ---------------------------------------------------------------------------
// StepResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The handler completed and reported no error.
    Success { result: serde_json::Value },
    /// The handler completed but its payload carries an `error` field.
    Failed { result: serde_json::Value },
    /// The step could not be carried out.
    Error { error: String },
}

impl StepOutcome {
    fn from_payload(payload: serde_json::Value) -> Self {
        if payload.get("error").is_some() {
            StepOutcome::Failed { result: payload }
        } else {
            StepOutcome::Success { result: payload }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success { .. })
    }

    fn details(&self) -> serde_json::Value {
        match self {
            StepOutcome::Success { result } | StepOutcome::Failed { result } => result.clone(),
            StepOutcome::Error { error } => serde_json::json!({ "error": error }),
        }
    }
}

/// Serializes as `{step, type, description, status, result | error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl StepResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

pub fn successful_count(results: &[StepResult]) -> usize {
    results.iter().filter(|r| r.is_success()).count()
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Executor {
    handler: Arc<dyn ActionHandler>,
    audit: Arc<dyn AuditSink>,
}

impl Executor {
    pub fn new(handler: Arc<dyn ActionHandler>, audit: Arc<dyn AuditSink>) -> Self {
        Self { handler, audit }
    }

    /// Run every step of `plan` under `command_id`. Never fails as a whole;
    /// per-step problems are reported in the returned results.
    pub async fn execute(&self, command_id: &str, plan: &Plan) -> Vec<StepResult> {
        let clock = Stopwatch::start();
        let mut steps: Vec<&Step> = plan.actions.iter().collect();
        steps.sort_by_key(|s| s.seq);

        let mut results = Vec::with_capacity(steps.len());
        for step in steps {
            let outcome = self.dispatch(&step.action).await;
            let kind = step.action.kind().to_string();

            let record = ActionLogRecord {
                success: outcome.is_success(),
                reasoning: plan.reasoning.clone(),
                explanation: step.description.clone(),
                duration_ms: clock.elapsed_ms(),
                details: outcome.details(),
                ..ActionLogRecord::new(command_id, kind.as_str())
            };
            if let Err(e) = self.audit.record_action(record).await {
                tracing::warn!(command_id, step = step.seq, error = %e, "failed to record action");
            }

            tracing::info!(
                command_id,
                step = step.seq,
                kind = %kind,
                success = outcome.is_success(),
                "step executed"
            );
            results.push(StepResult {
                step: step.seq,
                kind,
                description: step.description.clone(),
                outcome,
            });
        }
        results
    }

    async fn dispatch(&self, action: &Action) -> StepOutcome {
        let payload = match action {
            Action::CreateTicket(params) => self.handler.create_ticket(params).await,
            Action::UpdateTicket(params) => self.handler.update_ticket(params).await,
            Action::CloseTicket(params) => {
                let mut params: UpdateTicketParams = params.clone();
                params.updates.status = Some(TicketStatus::Resolved);
                self.handler.update_ticket(&params).await
            }
            Action::NotifySlack(params) => self.handler.notify(params).await,
            Action::Unsupported { kind, .. } => {
                Err(VoiceOpsError::UnknownActionKind(kind.clone()))
            }
        };
        match payload {
            Ok(payload) => StepOutcome::from_payload(payload),
            Err(e) => StepOutcome::Error {
                error: e.to_string(),
            },
        }
    }
}
