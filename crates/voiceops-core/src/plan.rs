//! Action plan model.
//!
//! A [`Plan`] is what the plan generator proposes for a command: rationale,
//! a confidence level, optional warnings, and an ordered list of [`Step`]s.
//! Model output arrives as loosely shaped JSON; it is converted here, once,
//! into typed per-kind [`Action`] variants. Kinds the executor does not know
//! are kept as [`Action::Unsupported`] so they can be reported per step
//! instead of failing the whole plan.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, VoiceOpsError};
use crate::types::{Priority, TicketStatus};

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Parameter schemas
// ---------------------------------------------------------------------------

/// Treat an explicit `null` like a missing key. Model output uses both.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTicketParams {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<String>,
}

/// Fields to change on an existing ticket. Keys the schema does not name are
/// carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketUpdates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TicketUpdates {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.summary.is_none()
            && self.assignee.is_none()
            && self.labels.is_none()
            && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTicketParams {
    pub ticket_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updates: TicketUpdates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyParams {
    #[serde(default = "default_channel", deserialize_with = "channel_or_default")]
    pub channel: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

fn default_channel() -> String {
    "general".to_string()
}

fn channel_or_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(default_channel))
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateTicket(CreateTicketParams),
    UpdateTicket(UpdateTicketParams),
    CloseTicket(UpdateTicketParams),
    NotifySlack(NotifyParams),
    /// A kind the executor has no handler for.
    Unsupported {
        kind: String,
        params: serde_json::Value,
    },
}

impl Action {
    pub fn kind(&self) -> &str {
        match self {
            Action::CreateTicket(_) => "create_ticket",
            Action::UpdateTicket(_) => "update_ticket",
            Action::CloseTicket(_) => "close_ticket",
            Action::NotifySlack(_) => "notify_slack",
            Action::Unsupported { kind, .. } => kind,
        }
    }

    fn from_raw(kind: &str, params: serde_json::Value) -> Result<Self> {
        let invalid =
            |e: serde_json::Error| VoiceOpsError::MalformedOutput(format!("{kind} params: {e}"));
        let params = if params.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            params
        };
        Ok(match kind {
            "create_ticket" => Action::CreateTicket(serde_json::from_value(params).map_err(invalid)?),
            "update_ticket" => Action::UpdateTicket(serde_json::from_value(params).map_err(invalid)?),
            "close_ticket" => Action::CloseTicket(serde_json::from_value(params).map_err(invalid)?),
            "notify_slack" => Action::NotifySlack(serde_json::from_value(params).map_err(invalid)?),
            other => Action::Unsupported {
                kind: other.to_string(),
                params,
            },
        })
    }

    fn params_value(&self) -> serde_json::Value {
        let value = match self {
            Action::CreateTicket(p) => serde_json::to_value(p),
            Action::UpdateTicket(p) | Action::CloseTicket(p) => serde_json::to_value(p),
            Action::NotifySlack(p) => serde_json::to_value(p),
            Action::Unsupported { params, .. } => return params.clone(),
        };
        value.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// One proposed action. Serializes as `{step, type, description, params}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawStep", try_from = "RawStep")]
pub struct Step {
    pub seq: u32,
    pub description: String,
    pub action: Action,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawStep {
    #[serde(default)]
    step: Option<u32>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    description: String,
    #[serde(default)]
    params: serde_json::Value,
}

impl TryFrom<RawStep> for Step {
    type Error = VoiceOpsError;

    fn try_from(raw: RawStep) -> Result<Self> {
        Ok(Step {
            seq: raw.step.unwrap_or(0),
            description: raw.description,
            action: Action::from_raw(&raw.kind, raw.params)?,
        })
    }
}

impl From<Step> for RawStep {
    fn from(step: Step) -> Self {
        RawStep {
            step: Some(step.seq),
            kind: step.action.kind().to_string(),
            description: step.description,
            params: step.action.params_value(),
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPlan")]
pub struct Plan {
    pub reasoning: String,
    pub explanation: String,
    pub confidence: Confidence,
    pub duplicate_warning: Option<String>,
    pub clarification_needed: Option<String>,
    pub actions: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default, deserialize_with = "null_as_default")]
    reasoning: String,
    #[serde(default, deserialize_with = "null_as_default")]
    explanation: String,
    #[serde(default)]
    confidence: Option<Confidence>,
    #[serde(default)]
    duplicate_warning: Option<String>,
    #[serde(default)]
    clarification_needed: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    actions: Vec<Step>,
}

impl TryFrom<RawPlan> for Plan {
    type Error = VoiceOpsError;

    fn try_from(raw: RawPlan) -> Result<Self> {
        let mut actions = raw.actions;
        let mut last = 0;
        for (i, step) in actions.iter_mut().enumerate() {
            if step.seq == 0 {
                step.seq = i as u32 + 1;
            }
            if step.seq <= last {
                return Err(VoiceOpsError::MalformedOutput(format!(
                    "step numbers must be strictly increasing (step {} follows {})",
                    step.seq, last
                )));
            }
            last = step.seq;
        }
        Ok(Plan {
            reasoning: raw.reasoning,
            explanation: raw.explanation,
            confidence: raw.confidence.unwrap_or_default(),
            duplicate_warning: non_blank(raw.duplicate_warning),
            clarification_needed: non_blank(raw.clarification_needed),
            actions,
        })
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty() && s.trim() != "null")
}

impl Plan {
    /// Parse a plan from the JSON value the reasoning backend produced.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| VoiceOpsError::MalformedOutput(e.to_string()))
    }

    pub fn needs_clarification(&self) -> bool {
        self.clarification_needed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_typed_actions_per_kind() {
        let plan = Plan::from_value(json!({
            "reasoning": "AUTH-101 is similar",
            "explanation": "Create and notify",
            "confidence": "high",
            "actions": [
                {"step": 1, "type": "create_ticket", "description": "Create",
                 "params": {"project": "AUTH-BACKEND", "priority": "high", "assignee": "sarah.chen"}},
                {"step": 2, "type": "notify_slack", "description": "Tell the team",
                 "params": {"message": "heads up"}}
            ],
            "duplicate_warning": null,
            "clarification_needed": null
        }))
        .unwrap();

        assert_eq!(plan.confidence, Confidence::High);
        assert!(!plan.needs_clarification());
        assert_eq!(plan.actions.len(), 2);
        let Action::CreateTicket(p) = &plan.actions[0].action else {
            panic!("expected CreateTicket")
        };
        assert_eq!(p.priority, Some(Priority::High));
        let Action::NotifySlack(n) = &plan.actions[1].action else {
            panic!("expected NotifySlack")
        };
        assert_eq!(n.channel, "general");
    }

    #[test]
    fn unknown_kind_is_kept_as_unsupported() {
        let plan = Plan::from_value(json!({
            "actions": [{"step": 1, "type": "page_oncall", "params": {"who": "maria"}}]
        }))
        .unwrap();
        assert_eq!(
            plan.actions[0].action,
            Action::Unsupported {
                kind: "page_oncall".into(),
                params: json!({"who": "maria"}),
            }
        );
    }

    #[test]
    fn missing_step_numbers_are_filled_from_position() {
        let plan = Plan::from_value(json!({
            "actions": [
                {"type": "notify_slack", "params": {"message": "a"}},
                {"type": "notify_slack", "params": {"message": "b"}}
            ]
        }))
        .unwrap();
        let seqs: Vec<u32> = plan.actions.iter().map(|s| s.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn non_increasing_step_numbers_are_malformed() {
        let err = Plan::from_value(json!({
            "actions": [
                {"step": 2, "type": "notify_slack", "params": {}},
                {"step": 1, "type": "notify_slack", "params": {}}
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, VoiceOpsError::MalformedOutput(_)));
    }

    #[test]
    fn update_without_ticket_id_is_malformed() {
        let err = Plan::from_value(json!({
            "actions": [{"step": 1, "type": "update_ticket", "params": {"updates": {}}}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("update_ticket"));
    }

    #[test]
    fn blank_clarification_is_treated_as_absent() {
        let plan = Plan::from_value(json!({"clarification_needed": "  "})).unwrap();
        assert!(!plan.needs_clarification());
        let plan = Plan::from_value(json!({"clarification_needed": "Which project?"})).unwrap();
        assert_eq!(plan.clarification_needed.as_deref(), Some("Which project?"));
    }

    #[test]
    fn explicit_nulls_fall_back_to_defaults() {
        let plan = Plan::from_value(json!({
            "reasoning": null,
            "explanation": null,
            "confidence": null,
            "actions": [
                {"step": 1, "type": "create_ticket", "description": null,
                 "params": {"summary": "SSO login broken", "labels": null, "assignee": null}},
                {"step": 2, "type": "close_ticket", "description": "Close it",
                 "params": {"ticket_id": "AUTH-7", "updates": null}},
                {"step": 3, "type": "notify_slack",
                 "params": {"channel": null, "message": null}}
            ]
        }))
        .unwrap();

        assert_eq!(plan.reasoning, "");
        assert_eq!(plan.confidence, Confidence::Medium);
        assert_eq!(plan.actions[0].description, "");
        let Action::CreateTicket(create) = &plan.actions[0].action else {
            panic!("expected CreateTicket")
        };
        assert!(create.labels.is_empty());
        assert_eq!(create.assignee, None);
        let Action::CloseTicket(close) = &plan.actions[1].action else {
            panic!("expected CloseTicket")
        };
        assert_eq!(close.ticket_id, "AUTH-7");
        assert!(close.updates.is_empty());
        let Action::NotifySlack(notify) = &plan.actions[2].action else {
            panic!("expected NotifySlack")
        };
        assert_eq!(notify.channel, "general");
        assert_eq!(notify.message, "");
    }

    #[test]
    fn null_action_list_is_an_empty_plan() {
        let plan = Plan::from_value(json!({"actions": null})).unwrap();
        assert!(plan.actions.is_empty());
    }

    #[test]
    fn step_serializes_in_wire_shape() {
        let step = Step {
            seq: 1,
            description: "Close it".into(),
            action: Action::CloseTicket(UpdateTicketParams {
                ticket_id: "AUTH-7".into(),
                updates: TicketUpdates::default(),
            }),
        };
        let v = serde_json::to_value(&step).unwrap();
        assert_eq!(v["step"], 1);
        assert_eq!(v["type"], "close_ticket");
        assert_eq!(v["params"]["ticket_id"], "AUTH-7");
    }

    #[test]
    fn updates_preserve_unknown_keys() {
        let u: TicketUpdates =
            serde_json::from_value(json!({"status": "in_progress", "component": "sso"})).unwrap();
        assert_eq!(u.status, Some(TicketStatus::InProgress));
        assert_eq!(u.extra["component"], json!("sso"));
        assert!(!u.is_empty());
    }
}
