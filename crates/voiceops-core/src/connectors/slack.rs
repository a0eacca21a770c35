use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};

use crate::collaborators::Notifier;
use crate::error::{Result, VoiceOpsError};

/// Slack incoming-webhook notifier. The webhook decides the destination; the
/// channel name only appears in the message footer.
pub struct SlackNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl SlackNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.filter(|u| !u.trim().is_empty()),
        }
    }
}

fn payload(channel: &str, message: &str) -> Value {
    let stamp = Utc::now().format("%Y-%m-%d %H:%M UTC");
    json!({
        "text": "VoiceOps Agent Alert",
        "blocks": [
            {"type": "header", "text": {"type": "plain_text", "text": "VoiceOps Agent"}},
            {"type": "section", "text": {"type": "mrkdwn", "text": message}},
            {"type": "context", "elements": [
                {"type": "mrkdwn", "text": format!("#{channel} | {stamp}")}
            ]}
        ]
    })
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    async fn notify(&self, channel: &str, message: &str) -> Result<Value> {
        let Some(url) = &self.webhook_url else {
            return Ok(json!({
                "status": "skipped",
                "reason": "No Slack webhook configured",
                "channel": channel,
                "message": message,
            }));
        };

        let resp = self
            .client
            .post(url)
            .json(&payload(channel, message))
            .send()
            .await
            .map_err(|e| VoiceOpsError::collaborator("slack", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(%status, channel, "slack webhook rejected notification");
            return Ok(json!({
                "status": "failed",
                "channel": channel,
                "message": message,
                "error": format!("HTTP {status}: {body}"),
            }));
        }
        tracing::info!(channel, "slack notification sent");
        Ok(json!({"status": "sent", "channel": channel, "message": message}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn missing_webhook_is_skipped() {
        let slack = SlackNotifier::new(Some("  ".into()));
        assert!(!slack.is_configured());
        let out = slack.notify("general", "hello").await.unwrap();
        assert_eq!(out["status"], "skipped");
        assert!(out.get("error").is_none());
    }

    #[tokio::test]
    async fn posts_block_payload() {
        let mut server = mockito::Server::new_async().await;
        let hook = server
            .mock("POST", "/services/T/B/X")
            .match_body(Matcher::PartialJson(json!({
                "blocks": [{"type": "header"}, {"type": "section", "text": {"text": "AUTH-7 closed"}}]
            })))
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let slack = SlackNotifier::new(Some(format!("{}/services/T/B/X", server.url())));
        let out = slack.notify("auth-team", "AUTH-7 closed").await.unwrap();

        hook.assert_async().await;
        assert_eq!(out["status"], "sent");
        assert_eq!(out["channel"], "auth-team");
    }

    #[tokio::test]
    async fn rejected_webhook_reports_failure_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(403)
            .with_body("invalid_token")
            .create_async()
            .await;

        let slack = SlackNotifier::new(Some(format!("{}/hook", server.url())));
        let out = slack.notify("general", "hi").await.unwrap();
        assert_eq!(out["status"], "failed");
        assert!(out["error"].as_str().unwrap().contains("invalid_token"));
    }

    #[tokio::test]
    async fn unreachable_webhook_is_an_error() {
        let slack = SlackNotifier::new(Some("http://127.0.0.1:1/hook".into()));
        let err = slack.notify("general", "hi").await.unwrap_err();
        assert!(matches!(err, VoiceOpsError::Collaborator { service: "slack", .. }));
    }
}
