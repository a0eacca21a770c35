//! Jira Cloud REST v3 adapter.
//!
//! Tracker problems never fail a step on their own: HTTP and transport
//! faults come back as `{status: "failed" | "error", error}` payloads so the
//! local ticket index still gets updated.
//!
//! The project's default issue type and the instance's priority names are
//! looked up once and cached for the life of the process. Nothing
//! invalidates them; a priority added in Jira later is not seen until
//! restart.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::collections::HashSet;
use tokio::sync::OnceCell;

use crate::collaborators::{IssueTracker, NewIssue};
use crate::config::JiraConfig;
use crate::error::{Result, VoiceOpsError};
use crate::plan::TicketUpdates;
use crate::types::{Priority, TicketStatus};

const SERVICE: &str = "jira";
const PREFERRED_ISSUE_TYPES: &[&str] = &["Task", "Story", "Bug", "Issue"];
const FALLBACK_ISSUE_TYPE: &str = "Task";

#[derive(Debug, Clone)]
struct Credentials {
    email: String,
    api_token: String,
}

pub struct JiraClient {
    client: Client,
    site_url: String,
    project_key: String,
    credentials: Option<Credentials>,
    issue_type: OnceCell<String>,
    priorities: OnceCell<HashSet<String>>,
}

impl JiraClient {
    pub fn new(
        site_url: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
        project_key: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            site_url: site_url.into().trim_end_matches('/').to_string(),
            project_key: project_key.into(),
            credentials: Some(Credentials {
                email: email.into(),
                api_token: api_token.into(),
            }),
            issue_type: OnceCell::new(),
            priorities: OnceCell::new(),
        }
    }

    /// Client for `config`. Incomplete credentials yield a client whose
    /// every call is skipped.
    pub fn from_config(config: &JiraConfig) -> Self {
        let domain = config.domain.clone().unwrap_or_default();
        let site_url = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain
        } else {
            format!("https://{domain}")
        };
        let mut client = Self::new(
            site_url,
            config.email.clone().unwrap_or_default(),
            config.api_token.clone().unwrap_or_default(),
            config.project_key.clone(),
        );
        if !config.is_configured() {
            client.credentials = None;
        }
        client
    }

    fn api(&self, path: &str) -> String {
        format!("{}/rest/api/3/{}", self.site_url, path)
    }

    fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{key}", self.site_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let req = self
            .client
            .request(method, self.api(path))
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.credentials {
            Some(c) => req.basic_auth(&c.email, Some(&c.api_token)),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        req.send()
            .await
            .map_err(|e| VoiceOpsError::collaborator(SERVICE, e))
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let resp = self.send(self.request(reqwest::Method::GET, path)).await?;
        let resp = check(resp).await?;
        resp.json()
            .await
            .map_err(|e| VoiceOpsError::collaborator(SERVICE, e))
    }

    // -----------------------------------------------------------------------
    // Cached lookups
    // -----------------------------------------------------------------------

    async fn default_issue_type(&self) -> String {
        let lookup = self
            .issue_type
            .get_or_try_init(|| async {
                let project = self.get_json(&format!("project/{}", self.project_key)).await?;
                let available: Vec<String> = project["issueTypes"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter(|t| !t["subtask"].as_bool().unwrap_or(false))
                    .filter_map(|t| t["name"].as_str().map(String::from))
                    .collect();
                PREFERRED_ISSUE_TYPES
                    .iter()
                    .find(|p| available.iter().any(|a| a == *p))
                    .map(|p| p.to_string())
                    .or_else(|| available.into_iter().next())
                    .ok_or_else(|| {
                        VoiceOpsError::collaborator(SERVICE, "project has no usable issue types")
                    })
            })
            .await;
        match lookup {
            Ok(name) => name.clone(),
            Err(e) => {
                tracing::warn!(error = %e, "issue type lookup failed, using {FALLBACK_ISSUE_TYPE}");
                FALLBACK_ISSUE_TYPE.to_string()
            }
        }
    }

    async fn priority_exists(&self, name: &str) -> bool {
        let lookup = self
            .priorities
            .get_or_try_init(|| async {
                let list = self.get_json("priority").await?;
                Ok::<_, VoiceOpsError>(
                    list.as_array()
                        .into_iter()
                        .flatten()
                        .filter_map(|p| p["name"].as_str().map(String::from))
                        .collect(),
                )
            })
            .await;
        match lookup {
            Ok(names) => names.contains(name),
            Err(e) => {
                tracing::warn!(error = %e, "priority lookup failed");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    async fn try_create(&self, issue: &NewIssue) -> Result<Value> {
        let issue_type = self.default_issue_type().await;
        let mut fields = json!({
            "project": {"key": self.project_key},
            "summary": issue.summary,
            "description": adf_paragraph(&issue.description),
            "issuetype": {"name": issue_type},
        });
        let priority = issue.priority.tracker_name();
        if self.priority_exists(priority).await {
            fields["priority"] = json!({"name": priority});
        }
        if !issue.labels.is_empty() {
            fields["labels"] = json!(issue.labels);
        }
        if let Some(assignee) = issue.assignee.as_deref().filter(|a| !a.is_empty()) {
            if let Some(account_id) = self.find_user(assignee).await {
                fields["assignee"] = json!({"accountId": account_id});
            }
        }

        let resp = self
            .send(
                self.request(reqwest::Method::POST, "issue")
                    .json(&json!({ "fields": fields })),
            )
            .await?;
        if !resp.status().is_success() {
            return Ok(failed(resp).await);
        }
        let data: Value = resp
            .json()
            .await
            .map_err(|e| VoiceOpsError::collaborator(SERVICE, e))?;
        let key = data["key"].as_str().unwrap_or_default().to_string();
        tracing::info!(jira_key = %key, "jira issue created");

        Ok(json!({
            "status": "created",
            "jira_key": key,
            "jira_id": data["id"],
            "jira_url": self.browse_url(&key),
            "summary": issue.summary,
            "issue_type": issue_type,
        }))
    }

    async fn try_update(&self, key: &str, updates: &TicketUpdates) -> Result<Value> {
        if let Some(status) = updates.status {
            if let Some(failure) = self.transition(key, status).await? {
                return Ok(failure);
            }
        }

        let mut fields = serde_json::Map::new();
        if let Some(priority) = updates.priority.map(Priority::tracker_name) {
            if self.priority_exists(priority).await {
                fields.insert("priority".into(), json!({"name": priority}));
            }
        }
        if let Some(summary) = &updates.summary {
            fields.insert("summary".into(), json!(summary));
        }
        if let Some(labels) = &updates.labels {
            fields.insert("labels".into(), json!(labels));
        }

        if !fields.is_empty() {
            let resp = self
                .send(
                    self.request(reqwest::Method::PUT, &format!("issue/{key}"))
                        .json(&json!({ "fields": fields })),
                )
                .await?;
            if !resp.status().is_success() {
                return Ok(failed(resp).await);
            }
        }

        Ok(json!({
            "status": "updated",
            "jira_key": key,
            "changes": updates,
            "jira_url": self.browse_url(key),
        }))
    }

    /// Move `key` into the workflow state for `status`. Returns a failure
    /// payload when no matching transition exists.
    async fn transition(&self, key: &str, status: TicketStatus) -> Result<Option<Value>> {
        let target = status.tracker_name();
        let available = self.get_json(&format!("issue/{key}/transitions")).await?;
        let transitions = available["transitions"].as_array().cloned().unwrap_or_default();

        let is_target = |t: &Value| {
            let name = t["name"].as_str().unwrap_or_default();
            let to = t["to"]["name"].as_str().unwrap_or_default();
            name.eq_ignore_ascii_case(target) || to.eq_ignore_ascii_case(target)
        };
        let Some(id) = transitions.iter().find(|t| is_target(t)).map(|t| t["id"].clone()) else {
            let names: Vec<&str> = transitions.iter().filter_map(|t| t["name"].as_str()).collect();
            return Ok(Some(json!({
                "status": "failed",
                "error": format!("No transition to '{target}'. Available: {names:?}"),
            })));
        };

        let resp = self
            .send(
                self.request(reqwest::Method::POST, &format!("issue/{key}/transitions"))
                    .json(&json!({"transition": {"id": id}})),
            )
            .await?;
        if !resp.status().is_success() {
            return Ok(Some(failed(resp).await));
        }
        Ok(None)
    }

    async fn try_get(&self, key: &str) -> Result<Value> {
        let resp = self
            .send(self.request(reqwest::Method::GET, &format!("issue/{key}")))
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(json!({"status": "not_found", "jira_key": key}));
        }
        if !resp.status().is_success() {
            return Ok(failed(resp).await);
        }
        let data: Value = resp
            .json()
            .await
            .map_err(|e| VoiceOpsError::collaborator(SERVICE, e))?;
        let fields = &data["fields"];
        let key = data["key"].as_str().unwrap_or(key);

        Ok(json!({
            "status": "found",
            "jira_key": key,
            "summary": fields["summary"],
            "description": adf_text(&fields["description"]),
            "priority": fields["priority"]["name"],
            "issue_status": fields["status"]["name"],
            "assignee": fields["assignee"]["displayName"],
            "labels": fields.get("labels").cloned().unwrap_or_else(|| json!([])),
            "jira_url": self.browse_url(key),
        }))
    }

    async fn try_search(&self, query: &str, max_results: usize) -> Result<Value> {
        let jql = format!(
            "project = {} AND text ~ \"{}\" ORDER BY created DESC",
            self.project_key,
            query.replace('"', "\\\"")
        );
        let resp = self
            .send(
                self.request(reqwest::Method::GET, "search")
                    .query(&[("jql", jql), ("maxResults", max_results.to_string())]),
            )
            .await?;
        if !resp.status().is_success() {
            return Ok(failed(resp).await);
        }
        let data: Value = resp
            .json()
            .await
            .map_err(|e| VoiceOpsError::collaborator(SERVICE, e))?;

        let issues: Vec<Value> = data["issues"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|issue| {
                let fields = &issue["fields"];
                json!({
                    "jira_key": issue["key"],
                    "summary": fields["summary"],
                    "priority": fields["priority"]["name"],
                    "status": fields["status"]["name"],
                    "assignee": fields["assignee"]["displayName"],
                })
            })
            .collect();

        Ok(json!({
            "status": "success",
            "total": data["total"].as_u64().unwrap_or(0),
            "issues": issues,
        }))
    }

    async fn find_user(&self, query: &str) -> Option<String> {
        let resp = self
            .send(self.request(reqwest::Method::GET, "user/search").query(&[("query", query)]))
            .await
            .ok()?;
        let users: Value = check(resp).await.ok()?.json().await.ok()?;
        users[0]["accountId"].as_str().map(String::from)
    }
}

fn skipped() -> Value {
    json!({"status": "skipped", "reason": "Jira not configured"})
}

fn degraded(result: Result<Value>) -> Value {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "jira request failed");
        json!({"status": "error", "error": e.to_string()})
    })
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(VoiceOpsError::collaborator(SERVICE, format!("HTTP {status}: {body}")))
}

async fn failed(resp: reqwest::Response) -> Value {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    json!({"status": "failed", "error": format!("HTTP {status}: {body}")})
}

/// Single-paragraph Atlassian Document Format body.
fn adf_paragraph(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{
            "type": "paragraph",
            "content": [{"type": "text", "text": text}]
        }]
    })
}

fn adf_text(doc: &Value) -> String {
    doc["content"]
        .as_array()
        .into_iter()
        .flatten()
        .flat_map(|block| block["content"].as_array().cloned().unwrap_or_default())
        .filter(|item| item["type"] == "text")
        .filter_map(|item| item["text"].as_str().map(String::from))
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl IssueTracker for JiraClient {
    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<Value> {
        if !self.is_configured() {
            return Ok(skipped());
        }
        Ok(degraded(self.try_create(issue).await))
    }

    async fn update_issue(&self, key: &str, updates: &TicketUpdates) -> Result<Value> {
        if !self.is_configured() {
            return Ok(skipped());
        }
        Ok(degraded(self.try_update(key, updates).await))
    }

    async fn get_issue(&self, key: &str) -> Result<Value> {
        if !self.is_configured() {
            return Ok(skipped());
        }
        Ok(degraded(self.try_get(key).await))
    }

    async fn search_issues(&self, query: &str, max_results: usize) -> Result<Value> {
        if !self.is_configured() {
            return Ok(skipped());
        }
        Ok(degraded(self.try_search(query, max_results).await))
    }
}
