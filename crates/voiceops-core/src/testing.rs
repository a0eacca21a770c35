//! Fakes shared by the unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::audit::{ActionLogRecord, AuditSink, CommandLogRecord};
use crate::collaborators::{IntentExtractor, PlanGenerator};
use crate::context::ContextBundle;
use crate::error::{Result, VoiceOpsError};
use crate::handlers::ActionHandler;
use crate::plan::{CreateTicketParams, NotifyParams, Plan, UpdateTicketParams};
use crate::types::IntentResult;

// ---------------------------------------------------------------------------
// RecordingHandler
// ---------------------------------------------------------------------------

/// Records every dispatched action as `(kind, params)`.
#[derive(Default)]
pub struct RecordingHandler {
    calls: Mutex<Vec<(String, Value)>>,
    fail_on: Option<&'static str>,
}

impl RecordingHandler {
    /// Updating this ticket yields a payload with an `error` field.
    pub const MISSING_TICKET: &'static str = "MISSING-1";

    /// Handler that returns `Err` for actions of `kind`.
    pub fn failing_on(kind: &'static str) -> Self {
        Self {
            fail_on: Some(kind),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, kind: &'static str, params: Value) -> Result<()> {
        self.calls.lock().unwrap().push((kind.to_string(), params));
        if self.fail_on == Some(kind) {
            return Err(VoiceOpsError::StepExecution(format!("{kind} exploded")));
        }
        Ok(())
    }
}

#[async_trait]
impl ActionHandler for RecordingHandler {
    async fn create_ticket(&self, params: &CreateTicketParams) -> Result<Value> {
        self.record("create_ticket", serde_json::to_value(params)?)?;
        Ok(json!({"ticket_id": "AUTH-900", "action": "created"}))
    }

    async fn update_ticket(&self, params: &UpdateTicketParams) -> Result<Value> {
        self.record("update_ticket", serde_json::to_value(params)?)?;
        if params.ticket_id == Self::MISSING_TICKET {
            return Ok(json!({
                "ticket_id": params.ticket_id,
                "error": format!("Document {} not found", params.ticket_id),
            }));
        }
        Ok(json!({"ticket_id": params.ticket_id, "action": "updated"}))
    }

    async fn notify(&self, params: &NotifyParams) -> Result<Value> {
        self.record("notify_slack", serde_json::to_value(params)?)?;
        Ok(json!({"status": "sent", "channel": params.channel}))
    }
}

// ---------------------------------------------------------------------------
// RecordingAudit
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingAudit {
    commands: Mutex<Vec<CommandLogRecord>>,
    actions: Mutex<Vec<ActionLogRecord>>,
    fail: bool,
}

impl RecordingAudit {
    /// Sink whose every write fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn commands(&self) -> Vec<CommandLogRecord> {
        self.commands.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<ActionLogRecord> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record_command(&self, record: CommandLogRecord) -> Result<()> {
        if self.fail {
            return Err(VoiceOpsError::collaborator("audit", "unavailable"));
        }
        self.commands.lock().unwrap().push(record);
        Ok(())
    }

    async fn record_action(&self, record: ActionLogRecord) -> Result<()> {
        if self.fail {
            return Err(VoiceOpsError::collaborator("audit", "unavailable"));
        }
        self.actions.lock().unwrap().push(record);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedReasoner
// ---------------------------------------------------------------------------

/// Reasoning backend that replays a fixed intent and plan.
pub struct ScriptedReasoner {
    intent: IntentResult,
    plan: Value,
    fail_intent: bool,
    plan_calls: AtomicUsize,
}

impl ScriptedReasoner {
    pub fn new(intent: Value, plan: Value) -> Self {
        Self {
            intent: serde_json::from_value(intent).unwrap(),
            plan,
            fail_intent: false,
            plan_calls: AtomicUsize::new(0),
        }
    }

    /// Reasoner whose intent extraction fails.
    pub fn unavailable() -> Self {
        Self {
            fail_intent: true,
            ..Self::new(json!({"intent": "query_status"}), json!({}))
        }
    }

    pub fn plan_calls(&self) -> usize {
        self.plan_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentExtractor for ScriptedReasoner {
    async fn extract_intent(&self, _transcript: &str) -> Result<IntentResult> {
        if self.fail_intent {
            return Err(VoiceOpsError::collaborator("llm", "connection refused"));
        }
        Ok(self.intent.clone())
    }
}

#[async_trait]
impl PlanGenerator for ScriptedReasoner {
    async fn generate_plan(
        &self,
        _transcript: &str,
        _intent: &IntentResult,
        _context: &ContextBundle,
    ) -> Result<Plan> {
        self.plan_calls.fetch_add(1, Ordering::SeqCst);
        Plan::from_value(self.plan.clone())
    }
}
