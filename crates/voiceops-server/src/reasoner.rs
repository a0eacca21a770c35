//! Intent extraction, plan generation, and transcription backed by an
//! OpenAI-compatible model endpoint.

use async_trait::async_trait;
use llm_agent::{LlmAgentError, LlmClient};
use voiceops_core::collaborators::{IntentExtractor, PlanGenerator, Transcriber};
use voiceops_core::context::ContextBundle;
use voiceops_core::plan::Plan;
use voiceops_core::types::IntentResult;
use voiceops_core::{Result, VoiceOpsError};

const INTENT_PROMPT: &str = r#"Extract the intent and entities from this voice command.

Valid intents: create_ticket, update_ticket, close_ticket, find_similar, notify_slack, query_status, run_workflow

Return ONLY valid JSON:
{
    "intent": "one of the intents above",
    "entities": {
        "project": "string or null",
        "description": "string describing the issue",
        "priority": "critical/high/medium/low or null",
        "assignee": "string or null",
        "channel": "slack channel name or null",
        "ticket_id": "existing ticket ID if mentioned, or null",
        "new_status": "open/in_progress/resolved/closed or null"
    }
}"#;

const PLANNING_PROMPT: &str = r#"You are the VoiceOps agent. Build an action plan that will be executed for real once a human approves it.

Return ONLY valid JSON:
{
    "reasoning": "Why these actions. Cite ticket IDs from the search results.",
    "actions": [
        {
            "step": 1,
            "type": "create_ticket | update_ticket | close_ticket | notify_slack",
            "description": "What this step does",
            "params": {}
        }
    ],
    "explanation": "Plain-language summary of the whole plan",
    "confidence": "high/medium/low",
    "duplicate_warning": "Warning if a similar ticket exists, or null",
    "clarification_needed": "Question if the command is ambiguous, or null"
}

create_ticket params: project, summary, description, priority, assignee, team, labels
update_ticket / close_ticket params: ticket_id, updates (object with the fields to change)
notify_slack params: channel, message

Known teams:
- AUTH-BACKEND: login, auth, OAuth, password. People: sarah.chen, james.wu
- CORE-PLATFORM: infrastructure, database, platform. People: maria.garcia
- FRONTEND: UI, browser, dashboard. People: alex.kim

Always cite evidence from the search results. Use several actions when the command calls for it."#;

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

/// The user message sent alongside [`PLANNING_PROMPT`].
fn planning_request(transcript: &str, intent: &IntentResult, context: &ContextBundle) -> String {
    format!(
        "USER COMMAND: \"{transcript}\"\n\
         INTENT: {}\n\
         SIMILAR TICKETS: {}\n\
         TARGET TICKET: {}\n\
         PAST COMMANDS: {}\n\
         PAST ACTIONS: {}\n\
         STATS: {}\n",
        pretty(intent),
        pretty(&context.similar_tickets),
        pretty(&context.target_ticket),
        pretty(&context.past_commands),
        pretty(&context.past_actions),
        pretty(&context.stats),
    )
}

fn llm_error(err: LlmAgentError) -> VoiceOpsError {
    match err {
        LlmAgentError::Parse { .. } => VoiceOpsError::MalformedOutput(err.to_string()),
        LlmAgentError::MissingApiKey => VoiceOpsError::NotConfigured("llm.api_key"),
        other => VoiceOpsError::collaborator("llm", other),
    }
}

// ---------------------------------------------------------------------------
// LlmReasoner
// ---------------------------------------------------------------------------

pub struct LlmReasoner {
    client: LlmClient,
}

impl LlmReasoner {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IntentExtractor for LlmReasoner {
    async fn extract_intent(&self, transcript: &str) -> Result<IntentResult> {
        let value = self
            .client
            .complete_json(INTENT_PROMPT, transcript)
            .await
            .map_err(llm_error)?;
        serde_json::from_value(value)
            .map_err(|e| VoiceOpsError::MalformedOutput(format!("intent: {e}")))
    }
}

#[async_trait]
impl PlanGenerator for LlmReasoner {
    async fn generate_plan(
        &self,
        transcript: &str,
        intent: &IntentResult,
        context: &ContextBundle,
    ) -> Result<Plan> {
        let request = planning_request(transcript, intent, context);
        tracing::debug!(bytes = request.len(), model = self.client.model(), "requesting plan");
        let value = self
            .client
            .complete_json(PLANNING_PROMPT, &request)
            .await
            .map_err(llm_error)?;
        Plan::from_value(value)
    }
}

#[async_trait]
impl Transcriber for LlmReasoner {
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String> {
        self.client
            .transcribe(audio, filename)
            .await
            .map_err(llm_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_agent::ClientConfig;
    use mockito::Matcher;
    use serde_json::json;
    use voiceops_core::types::Intent;

    fn reasoner(server: &mockito::ServerGuard) -> LlmReasoner {
        let client = LlmClient::new(ClientConfig {
            base_url: server.url(),
            api_key: Some("gsk-test".into()),
            ..Default::default()
        })
        .unwrap();
        LlmReasoner::new(client)
    }

    fn reply(content: &str) -> String {
        json!({"choices": [{"message": {"content": content}}]}).to_string()
    }

    #[tokio::test]
    async fn extracts_intent_from_fenced_reply() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("Valid intents".into()))
            .with_status(200)
            .with_body(reply(
                "```json\n{\"intent\": \"close_ticket\", \"entities\": {\"ticket_id\": \"AUTH-7\"}}\n```",
            ))
            .create_async()
            .await;

        let result = reasoner(&server).extract_intent("close AUTH-7").await.unwrap();
        assert_eq!(result.intent, Intent::CloseTicket);
        assert_eq!(result.entities.ticket_id.as_deref(), Some("AUTH-7"));
    }

    #[tokio::test]
    async fn unknown_intent_is_malformed_output() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(reply(r#"{"intent": "order_pizza"}"#))
            .create_async()
            .await;

        let err = reasoner(&server).extract_intent("lunch?").await.unwrap_err();
        assert!(matches!(err, VoiceOpsError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn plan_request_carries_command_and_context() {
        let mut server = mockito::Server::new_async().await;
        let plan = json!({
            "reasoning": "AUTH-7 matches",
            "explanation": "Close it",
            "actions": [{
                "step": 1,
                "type": "close_ticket",
                "description": "Resolve AUTH-7",
                "params": {"ticket_id": "AUTH-7", "updates": {}}
            }]
        });
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("USER COMMAND".into()),
                Matcher::Regex("close AUTH-7".into()),
                Matcher::Regex("SIMILAR TICKETS".into()),
            ]))
            .with_status(200)
            .with_body(reply(&plan.to_string()))
            .create_async()
            .await;

        let intent = IntentResult {
            intent: Intent::CloseTicket,
            entities: Default::default(),
        };
        let plan = reasoner(&server)
            .generate_plan("close AUTH-7", &intent, &ContextBundle::default())
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].action.kind(), "close_ticket");
    }

    #[tokio::test]
    async fn prose_reply_is_malformed_and_outage_is_collaborator_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(reply("I think you should close it."))
            .create_async()
            .await;
        let err = reasoner(&server).extract_intent("close it").await.unwrap_err();
        assert!(matches!(err, VoiceOpsError::MalformedOutput(_)));

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .create_async()
            .await;
        let err = reasoner(&server).extract_intent("close it").await.unwrap_err();
        assert!(matches!(
            err,
            VoiceOpsError::Collaborator { service: "llm", .. }
        ));
    }

    #[test]
    fn missing_key_is_not_configured() {
        let err = llm_error(LlmAgentError::MissingApiKey);
        assert!(matches!(err, VoiceOpsError::NotConfigured(_)));
    }
}
