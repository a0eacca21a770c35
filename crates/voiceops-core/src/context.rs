//! Context assembly: the operational history a plan is grounded on.
//!
//! Five independent lookups against the [`SearchBackend`] run concurrently.
//! Each one degrades to an empty result on failure so a single flaky
//! secondary signal never fails the command.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audit::{ActionLogRecord, CommandLogRecord};
use crate::collaborators::SearchBackend;
use crate::error::Result;
use crate::types::{IntentResult, Ticket, TicketStats};

// ---------------------------------------------------------------------------
// ContextLimits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLimits {
    #[serde(default = "default_similar_tickets")]
    pub similar_tickets: usize,
    #[serde(default = "default_history")]
    pub past_commands: usize,
    #[serde(default = "default_history")]
    pub past_actions: usize,
}

fn default_similar_tickets() -> usize {
    5
}

fn default_history() -> usize {
    3
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            similar_tickets: default_similar_tickets(),
            past_commands: default_history(),
            past_actions: default_history(),
        }
    }
}

// ---------------------------------------------------------------------------
// ContextBundle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextBundle {
    pub similar_tickets: Vec<Ticket>,
    pub target_ticket: Option<Ticket>,
    pub past_commands: Vec<CommandLogRecord>,
    pub past_actions: Vec<ActionLogRecord>,
    pub stats: TicketStats,
}

/// The projection of a [`ContextBundle`] returned to callers: samples and
/// counts rather than the raw history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub similar_tickets: Vec<Ticket>,
    pub target_ticket: Option<Ticket>,
    pub past_commands_found: usize,
    pub past_actions_found: usize,
    pub stats: TicketStats,
}

impl ContextBundle {
    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            similar_tickets: self.similar_tickets.clone(),
            target_ticket: self.target_ticket.clone(),
            past_commands_found: self.past_commands.len(),
            past_actions_found: self.past_actions.len(),
            stats: self.stats.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// ContextAssembler
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ContextAssembler {
    search: Arc<dyn SearchBackend>,
    limits: ContextLimits,
}

impl ContextAssembler {
    pub fn new(search: Arc<dyn SearchBackend>, limits: ContextLimits) -> Self {
        Self { search, limits }
    }

    /// Gather the context bundle for one command. Never fails.
    pub async fn assemble(&self, intent: &IntentResult, transcript: &str) -> ContextBundle {
        let description = intent
            .entities
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or("");
        let ticket_id = intent
            .entities
            .ticket_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        let similar = async {
            if description.is_empty() {
                return Ok(Vec::new());
            }
            self.search
                .similar_tickets(description, self.limits.similar_tickets)
                .await
        };
        let target = async {
            match ticket_id {
                Some(id) => self.search.ticket_by_id(id).await,
                None => Ok(None),
            }
        };
        let commands = self
            .search
            .past_commands(transcript, self.limits.past_commands);
        let actions = self
            .search
            .past_actions(intent.intent.as_str(), self.limits.past_actions);
        let stats = self.search.ticket_stats();

        let (similar, target, commands, actions, stats) =
            tokio::join!(similar, target, commands, actions, stats);

        let bundle = ContextBundle {
            similar_tickets: degrade("similar_tickets", similar),
            target_ticket: degrade("target_ticket", target),
            past_commands: degrade("past_commands", commands),
            past_actions: degrade("past_actions", actions),
            stats: degrade("ticket_stats", stats),
        };
        tracing::debug!(
            similar = bundle.similar_tickets.len(),
            target = bundle.target_ticket.is_some(),
            past_commands = bundle.past_commands.len(),
            past_actions = bundle.past_actions.len(),
            "context assembled"
        );
        bundle
    }
}

fn degrade<T: Default>(query: &str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(query, error = %e, "context lookup failed; continuing without it");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoiceOpsError;
    use crate::types::{Entities, Intent};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend where every lookup can be made to fail independently.
    #[derive(Default)]
    struct FlakySearch {
        fail_similar: bool,
        fail_stats: bool,
        calls: Mutex<Vec<String>>,
    }

    fn ticket(id: &str) -> Ticket {
        serde_json::from_value(serde_json::json!({ "ticket_id": id })).unwrap()
    }

    #[async_trait]
    impl SearchBackend for FlakySearch {
        async fn similar_tickets(&self, description: &str, limit: usize) -> Result<Vec<Ticket>> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("similar:{description}:{limit}"));
            if self.fail_similar {
                return Err(VoiceOpsError::collaborator("search", "timeout"));
            }
            Ok(vec![ticket("AUTH-101")])
        }

        async fn ticket_by_id(&self, ticket_id: &str) -> Result<Option<Ticket>> {
            self.calls.lock().unwrap().push(format!("target:{ticket_id}"));
            Ok(Some(ticket(ticket_id)))
        }

        async fn past_commands(
            &self,
            _transcript: &str,
            _limit: usize,
        ) -> Result<Vec<CommandLogRecord>> {
            self.calls.lock().unwrap().push("commands".into());
            Ok(vec![])
        }

        async fn past_actions(
            &self,
            action_type: &str,
            _limit: usize,
        ) -> Result<Vec<ActionLogRecord>> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("actions:{action_type}"));
            Ok(vec![ActionLogRecord::new("cmd-old", action_type)])
        }

        async fn ticket_stats(&self) -> Result<TicketStats> {
            if self.fail_stats {
                return Err(VoiceOpsError::collaborator("search", "aggregation failed"));
            }
            let mut stats = TicketStats::default();
            stats.by_project.insert("AUTH-BACKEND".into(), 4);
            Ok(stats)
        }
    }

    fn intent(description: Option<&str>, ticket_id: Option<&str>) -> IntentResult {
        IntentResult {
            intent: Intent::CreateTicket,
            entities: Entities {
                description: description.map(String::from),
                ticket_id: ticket_id.map(String::from),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn gathers_all_lookups() {
        let search = Arc::new(FlakySearch::default());
        let assembler = ContextAssembler::new(search.clone(), ContextLimits::default());
        let bundle = assembler
            .assemble(&intent(Some("login failures"), Some("AUTH-7")), "create a ticket")
            .await;

        assert_eq!(bundle.similar_tickets.len(), 1);
        assert_eq!(bundle.target_ticket.unwrap().ticket_id, "AUTH-7");
        assert_eq!(bundle.past_actions.len(), 1);
        assert_eq!(bundle.stats.by_project["AUTH-BACKEND"], 4);

        let calls = search.calls.lock().unwrap();
        assert!(calls.contains(&"similar:login failures:5".to_string()));
        assert!(calls.contains(&"actions:create_ticket".to_string()));
    }

    #[tokio::test]
    async fn failing_lookups_degrade_to_defaults() {
        let search = Arc::new(FlakySearch {
            fail_similar: true,
            fail_stats: true,
            ..Default::default()
        });
        let assembler = ContextAssembler::new(search, ContextLimits::default());
        let bundle = assembler
            .assemble(&intent(Some("login failures"), None), "create a ticket")
            .await;

        assert!(bundle.similar_tickets.is_empty());
        assert_eq!(bundle.stats, TicketStats::default());
        // Unaffected lookups still come through.
        assert_eq!(bundle.past_actions.len(), 1);
    }

    #[tokio::test]
    async fn skips_optional_lookups_without_entities() {
        let search = Arc::new(FlakySearch::default());
        let assembler = ContextAssembler::new(search.clone(), ContextLimits::default());
        let bundle = assembler.assemble(&intent(None, Some("  ")), "status?").await;

        assert!(bundle.similar_tickets.is_empty());
        assert!(bundle.target_ticket.is_none());
        let calls = search.calls.lock().unwrap();
        assert!(!calls.iter().any(|c| c.starts_with("similar") || c.starts_with("target")));
    }

    #[test]
    fn summary_reports_counts_not_history() {
        let bundle = ContextBundle {
            past_commands: vec![],
            past_actions: vec![
                ActionLogRecord::new("c1", "notify_slack"),
                ActionLogRecord::new("c2", "notify_slack"),
            ],
            ..Default::default()
        };
        let summary = bundle.summary();
        assert_eq!(summary.past_actions_found, 2);
        assert_eq!(summary.past_commands_found, 0);
    }
}
