//! In-process store implementing the search, ticket index, and audit
//! contracts. Used when no search cluster is configured.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::RwLock;

use crate::audit::{ActionLogRecord, AuditSink, CommandLogRecord};
use crate::collaborators::{SearchBackend, TicketIndex};
use crate::error::Result;
use crate::plan::TicketUpdates;
use crate::types::{Ticket, TicketStats};

#[derive(Debug, Default)]
pub struct MemoryStore {
    tickets: DashMap<String, Ticket>,
    commands: RwLock<Vec<CommandLogRecord>>,
    actions: RwLock<Vec<ActionLogRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_ticket(&self, ticket: Ticket) {
        self.tickets.insert(ticket.ticket_id.clone(), ticket);
    }

    pub fn ticket(&self, ticket_id: &str) -> Option<Ticket> {
        self.tickets.get(ticket_id).map(|t| t.value().clone())
    }

    pub fn commands(&self) -> Vec<CommandLogRecord> {
        self.commands.read().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<ActionLogRecord> {
        self.actions.read().map(|a| a.clone()).unwrap_or_default()
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Summary matches count double, mirroring the cluster's field boost.
fn relevance(query: &HashSet<String>, ticket: &Ticket) -> f64 {
    let hits = |text: &str| tokens(text).intersection(query).count() as f64;
    2.0 * hits(&ticket.summary) + hits(&ticket.description) + hits(&ticket.labels.join(" "))
}

pub(crate) fn apply_updates(ticket: &mut Ticket, updates: &TicketUpdates) {
    if let Some(status) = updates.status {
        ticket.status = status;
    }
    if let Some(priority) = updates.priority {
        ticket.priority = priority;
    }
    if let Some(summary) = &updates.summary {
        ticket.summary = summary.clone();
    }
    if let Some(assignee) = &updates.assignee {
        ticket.assignee = Some(assignee.clone());
    }
    if let Some(labels) = &updates.labels {
        ticket.labels = labels.clone();
    }
}

#[async_trait]
impl SearchBackend for MemoryStore {
    async fn similar_tickets(&self, description: &str, limit: usize) -> Result<Vec<Ticket>> {
        let query = tokens(description);
        let mut scored: Vec<Ticket> = self
            .tickets
            .iter()
            .filter_map(|entry| {
                let score = relevance(&query, entry.value());
                (score > 0.0).then(|| Ticket {
                    relevance_score: Some(score),
                    ..entry.value().clone()
                })
            })
            .collect();
        scored.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn ticket_by_id(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        Ok(self.ticket(ticket_id))
    }

    async fn past_commands(&self, transcript: &str, limit: usize) -> Result<Vec<CommandLogRecord>> {
        let query = tokens(transcript);
        Ok(self
            .commands()
            .into_iter()
            .rev()
            .filter(|c| !tokens(&c.raw_transcript).is_disjoint(&query))
            .take(limit)
            .collect())
    }

    async fn past_actions(&self, action_type: &str, limit: usize) -> Result<Vec<ActionLogRecord>> {
        Ok(self
            .actions()
            .into_iter()
            .rev()
            .filter(|a| a.action_type == action_type)
            .take(limit)
            .collect())
    }

    async fn ticket_stats(&self) -> Result<TicketStats> {
        let mut stats = TicketStats::default();
        for entry in self.tickets.iter() {
            let t = entry.value();
            *stats.by_project.entry(t.project.clone()).or_default() += 1;
            *stats
                .by_priority
                .entry(t.priority.as_str().to_string())
                .or_default() += 1;
            *stats
                .by_status
                .entry(t.status.as_str().to_string())
                .or_default() += 1;
        }
        Ok(stats)
    }
}

#[async_trait]
impl TicketIndex for MemoryStore {
    async fn index_ticket(&self, ticket: &Ticket) -> Result<()> {
        self.seed_ticket(ticket.clone());
        Ok(())
    }

    async fn update_ticket(
        &self,
        ticket_id: &str,
        updates: &TicketUpdates,
    ) -> Result<Option<Ticket>> {
        let Some(mut entry) = self.tickets.get_mut(ticket_id) else {
            return Ok(None);
        };
        let previous = entry.value().clone();
        apply_updates(entry.value_mut(), updates);
        Ok(Some(previous))
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record_command(&self, record: CommandLogRecord) -> Result<()> {
        if let Ok(mut commands) = self.commands.write() {
            commands.push(record);
        }
        Ok(())
    }

    async fn record_action(&self, record: ActionLogRecord) -> Result<()> {
        if let Ok(mut actions) = self.actions.write() {
            actions.push(record);
        }
        Ok(())
    }
}
