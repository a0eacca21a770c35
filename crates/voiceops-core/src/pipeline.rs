//! Command pipeline: intent → context → plan, then stage or execute.
//!
//! `submit` proposes and stages, `confirm` resolves a staged proposal, and
//! `quick_execute` proposes and executes in one call. A plan that asks for
//! clarification short-circuits all three with no side effects.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::{ActionLogRecord, AuditSink, CommandLogRecord};
use crate::collaborators::{IntentExtractor, PlanGenerator};
use crate::context::{ContextAssembler, ContextBundle, ContextSummary};
use crate::elapsed::Stopwatch;
use crate::error::{Result, VoiceOpsError};
use crate::executor::{successful_count, Executor, StepResult};
use crate::pending::{PendingEntry, PendingStore};
use crate::plan::Plan;
use crate::types::{CommandStatus, IntentResult};

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// What the pipeline saw and decided, for display to the reviewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineTrace {
    pub step1_intent: IntentResult,
    pub step2_context: ContextSummary,
    pub step3_plan: Plan,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub command_id: String,
    pub transcript: String,
    pub duration_ms: u64,
    pub status: CommandStatus,
    pub pipeline_trace: PipelineTrace,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarification: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmResponse {
    pub command_id: String,
    pub status: CommandStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_results: Option<Vec<StepResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_actions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successful_actions: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuickExecuteResponse {
    pub command_id: String,
    pub transcript: String,
    pub duration_ms: u64,
    pub status: CommandStatus,
    pub pipeline_trace: PipelineTrace,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_results: Option<Vec<StepResult>>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A proposal that has not been staged or executed yet.
struct Proposal {
    command_id: String,
    transcript: String,
    intent: IntentResult,
    context: ContextBundle,
    plan: Plan,
    clock: Stopwatch,
}

impl Proposal {
    fn trace(&self) -> PipelineTrace {
        PipelineTrace {
            step1_intent: self.intent.clone(),
            step2_context: self.context.summary(),
            step3_plan: self.plan.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    extractor: Arc<dyn IntentExtractor>,
    planner: Arc<dyn PlanGenerator>,
    assembler: ContextAssembler,
    pending: Arc<dyn PendingStore>,
    executor: Executor,
    audit: Arc<dyn AuditSink>,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn IntentExtractor>,
        planner: Arc<dyn PlanGenerator>,
        assembler: ContextAssembler,
        pending: Arc<dyn PendingStore>,
        executor: Executor,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            extractor,
            planner,
            assembler,
            pending,
            executor,
            audit,
        }
    }

    pub fn pending(&self) -> &Arc<dyn PendingStore> {
        &self.pending
    }

    /// Propose a plan for `transcript` and stage it for confirmation.
    pub async fn submit(&self, transcript: &str) -> Result<SubmitResponse> {
        let proposal = self.propose(transcript).await?;
        let trace = proposal.trace();

        if let Some(question) = proposal.plan.clarification_needed.clone() {
            tracing::info!(command_id = %proposal.command_id, "plan needs clarification");
            return Ok(SubmitResponse {
                command_id: proposal.command_id,
                transcript: proposal.transcript,
                duration_ms: proposal.clock.elapsed_ms(),
                status: CommandStatus::NeedsClarification,
                pipeline_trace: trace,
                clarification: Some(question),
            });
        }

        let duration_ms = proposal.clock.elapsed_ms();
        self.pending
            .stage(
                &proposal.command_id,
                PendingEntry {
                    transcript: proposal.transcript.clone(),
                    intent: proposal.intent,
                    context: proposal.context,
                    plan: proposal.plan,
                    staged_at: chrono::Utc::now(),
                },
            )
            .await?;
        tracing::info!(command_id = %proposal.command_id, "plan staged for confirmation");

        Ok(SubmitResponse {
            command_id: proposal.command_id,
            transcript: proposal.transcript,
            duration_ms,
            status: CommandStatus::PendingConfirmation,
            pipeline_trace: trace,
            clarification: None,
        })
    }

    /// Resolve a staged proposal. The entry is consumed whatever the verdict.
    pub async fn confirm(&self, command_id: &str, approved: bool) -> Result<ConfirmResponse> {
        if command_id.trim().is_empty() {
            return Err(VoiceOpsError::Validation("command_id is required".into()));
        }
        let entry = self
            .pending
            .consume(command_id)
            .await?
            .ok_or_else(|| VoiceOpsError::PendingNotFound(command_id.to_string()))?;

        if !approved {
            self.log_action(ActionLogRecord::rejection(command_id)).await;
            self.log_command(CommandLogRecord::new(
                command_id,
                &entry.transcript,
                &entry.intent,
                CommandStatus::Rejected,
            ))
            .await;
            tracing::info!(command_id, "plan rejected");
            return Ok(ConfirmResponse {
                command_id: command_id.to_string(),
                status: CommandStatus::Rejected,
                execution_results: None,
                total_actions: None,
                successful_actions: None,
            });
        }

        let results = self.executor.execute(command_id, &entry.plan).await;
        self.log_command(CommandLogRecord::new(
            command_id,
            &entry.transcript,
            &entry.intent,
            CommandStatus::Executed,
        ))
        .await;
        tracing::info!(command_id, steps = results.len(), "plan executed");

        Ok(ConfirmResponse {
            command_id: command_id.to_string(),
            status: CommandStatus::Executed,
            total_actions: Some(results.len()),
            successful_actions: Some(successful_count(&results)),
            execution_results: Some(results),
        })
    }

    /// Propose a plan and execute it immediately, skipping confirmation.
    pub async fn quick_execute(&self, transcript: &str) -> Result<QuickExecuteResponse> {
        let proposal = self.propose(transcript).await?;
        let trace = proposal.trace();

        if let Some(question) = proposal.plan.clarification_needed.clone() {
            return Ok(QuickExecuteResponse {
                command_id: proposal.command_id,
                transcript: proposal.transcript,
                duration_ms: proposal.clock.elapsed_ms(),
                status: CommandStatus::NeedsClarification,
                pipeline_trace: trace,
                clarification: Some(question),
                execution_results: None,
            });
        }

        let results = self
            .executor
            .execute(&proposal.command_id, &proposal.plan)
            .await;
        self.log_command(CommandLogRecord::new(
            &proposal.command_id,
            &proposal.transcript,
            &proposal.intent,
            CommandStatus::Executed,
        ))
        .await;
        tracing::info!(command_id = %proposal.command_id, steps = results.len(), "quick execute finished");

        Ok(QuickExecuteResponse {
            duration_ms: proposal.clock.elapsed_ms(),
            command_id: proposal.command_id,
            transcript: proposal.transcript,
            status: CommandStatus::Executed,
            pipeline_trace: trace,
            clarification: None,
            execution_results: Some(results),
        })
    }

    async fn propose(&self, transcript: &str) -> Result<Proposal> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(VoiceOpsError::Validation("transcript is required".into()));
        }
        let clock = Stopwatch::start();
        let command_id = format!("cmd-{}", Uuid::new_v4().simple());

        let intent = self.extractor.extract_intent(transcript).await?;
        tracing::info!(%command_id, intent = %intent.intent, "intent extracted");

        let context = self.assembler.assemble(&intent, transcript).await;
        let plan = self
            .planner
            .generate_plan(transcript, &intent, &context)
            .await?;
        tracing::info!(%command_id, steps = plan.actions.len(), "plan generated");

        Ok(Proposal {
            command_id,
            transcript: transcript.to_string(),
            intent,
            context,
            plan,
            clock,
        })
    }

    async fn log_command(&self, record: CommandLogRecord) {
        let command_id = record.command_id.clone();
        if let Err(e) = self.audit.record_command(record).await {
            tracing::warn!(%command_id, error = %e, "failed to record command");
        }
    }

    async fn log_action(&self, record: ActionLogRecord) {
        let command_id = record.command_id.clone();
        if let Err(e) = self.audit.record_action(record).await {
            tracing::warn!(%command_id, error = %e, "failed to record action");
        }
    }
}
