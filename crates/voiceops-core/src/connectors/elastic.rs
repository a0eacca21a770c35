//! Elasticsearch REST adapter for context search, the ticket index, and the
//! audit trail.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::audit::{ActionLogRecord, AuditSink, CommandLogRecord};
use crate::collaborators::{SearchBackend, TicketIndex};
use crate::error::{Result, VoiceOpsError};
use crate::plan::TicketUpdates;
use crate::types::{Ticket, TicketStats};

pub const TICKETS_INDEX: &str = "voiceops-tickets";
pub const COMMANDS_INDEX: &str = "voiceops-commands";
pub const ACTIONS_INDEX: &str = "voiceops-actions";

const SERVICE: &str = "elasticsearch";

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    hits: Hits<T>,
    #[serde(default)]
    aggregations: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Hits<T> {
    #[serde(default = "Vec::new")]
    hits: Vec<Hit<T>>,
}

#[derive(Debug, Deserialize)]
struct Hit<T> {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: T,
}

impl<T> SearchResponse<T> {
    fn empty() -> Self {
        Self {
            hits: Hits { hits: Vec::new() },
            aggregations: None,
        }
    }
}

fn buckets(aggs: &Value, name: &str) -> BTreeMap<String, u64> {
    aggs[name]["buckets"]
        .as_array()
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|b| Some((b["key"].as_str()?.to_string(), b["doc_count"].as_u64()?)))
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// ElasticStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ElasticStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ElasticStore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(method, format!("{}/{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            req = req.header(header::AUTHORIZATION, format!("ApiKey {key}"));
        }
        req
    }

    async fn search<T: DeserializeOwned>(&self, index: &str, body: Value) -> Result<SearchResponse<T>> {
        let resp = self
            .request(reqwest::Method::POST, &format!("{index}/_search"))
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceOpsError::collaborator(SERVICE, e))?;

        // A missing index is an empty history, not a fault.
        if resp.status() == StatusCode::NOT_FOUND {
            tracing::debug!(index, "search against missing index");
            return Ok(SearchResponse::empty());
        }
        let resp = check(resp).await?;
        resp.json()
            .await
            .map_err(|e| VoiceOpsError::collaborator(SERVICE, format!("bad search response: {e}")))
    }

    async fn index_document(&self, index: &str, document: &impl serde::Serialize) -> Result<()> {
        let resp = self
            .request(reqwest::Method::POST, &format!("{index}/_doc?refresh=true"))
            .json(document)
            .send()
            .await
            .map_err(|e| VoiceOpsError::collaborator(SERVICE, e))?;
        check(resp).await?;
        Ok(())
    }

    async fn find_ticket(&self, ticket_id: &str) -> Result<Option<Hit<Ticket>>> {
        let resp: SearchResponse<Ticket> = self
            .search(
                TICKETS_INDEX,
                json!({"query": {"term": {"ticket_id": ticket_id}}, "size": 1}),
            )
            .await?;
        Ok(resp.hits.hits.into_iter().next())
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(VoiceOpsError::collaborator(SERVICE, format!("HTTP {status}: {body}")))
}

#[async_trait]
impl SearchBackend for ElasticStore {
    async fn similar_tickets(&self, description: &str, limit: usize) -> Result<Vec<Ticket>> {
        if description.is_empty() {
            return Ok(Vec::new());
        }
        let resp: SearchResponse<Ticket> = self
            .search(
                TICKETS_INDEX,
                json!({
                    "query": {
                        "multi_match": {
                            "query": description,
                            "fields": ["summary^2", "description", "labels"],
                            "fuzziness": "AUTO"
                        }
                    },
                    "size": limit
                }),
            )
            .await?;
        Ok(resp
            .hits
            .hits
            .into_iter()
            .map(|hit| Ticket {
                relevance_score: hit.score,
                ..hit.source
            })
            .collect())
    }

    async fn ticket_by_id(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        Ok(self.find_ticket(ticket_id).await?.map(|hit| hit.source))
    }

    async fn past_commands(&self, transcript: &str, limit: usize) -> Result<Vec<CommandLogRecord>> {
        let resp: SearchResponse<CommandLogRecord> = self
            .search(
                COMMANDS_INDEX,
                json!({"query": {"match": {"raw_transcript": transcript}}, "size": limit}),
            )
            .await?;
        Ok(resp.hits.hits.into_iter().map(|h| h.source).collect())
    }

    async fn past_actions(&self, action_type: &str, limit: usize) -> Result<Vec<ActionLogRecord>> {
        if action_type.is_empty() {
            return Ok(Vec::new());
        }
        let resp: SearchResponse<ActionLogRecord> = self
            .search(
                ACTIONS_INDEX,
                json!({"query": {"match": {"action_type": action_type}}, "size": limit}),
            )
            .await?;
        Ok(resp.hits.hits.into_iter().map(|h| h.source).collect())
    }

    async fn ticket_stats(&self) -> Result<TicketStats> {
        let resp: SearchResponse<Value> = self
            .search(
                TICKETS_INDEX,
                json!({
                    "size": 0,
                    "aggs": {
                        "by_project": {"terms": {"field": "project"}},
                        "by_priority": {"terms": {"field": "priority"}},
                        "by_status": {"terms": {"field": "status"}}
                    }
                }),
            )
            .await?;
        let aggs = resp.aggregations.unwrap_or(Value::Null);
        Ok(TicketStats {
            by_project: buckets(&aggs, "by_project"),
            by_priority: buckets(&aggs, "by_priority"),
            by_status: buckets(&aggs, "by_status"),
        })
    }
}

#[async_trait]
impl TicketIndex for ElasticStore {
    async fn index_ticket(&self, ticket: &Ticket) -> Result<()> {
        self.index_document(TICKETS_INDEX, ticket).await
    }

    async fn update_ticket(
        &self,
        ticket_id: &str,
        updates: &TicketUpdates,
    ) -> Result<Option<Ticket>> {
        let Some(hit) = self.find_ticket(ticket_id).await? else {
            return Ok(None);
        };
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("{TICKETS_INDEX}/_update/{}?refresh=true", hit.id),
            )
            .json(&json!({ "doc": updates }))
            .send()
            .await
            .map_err(|e| VoiceOpsError::collaborator(SERVICE, e))?;
        check(resp).await?;
        Ok(Some(hit.source))
    }
}

#[async_trait]
impl AuditSink for ElasticStore {
    async fn record_command(&self, record: CommandLogRecord) -> Result<()> {
        self.index_document(COMMANDS_INDEX, &record).await
    }

    async fn record_action(&self, record: ActionLogRecord) -> Result<()> {
        self.index_document(ACTIONS_INDEX, &record).await
    }
}
