use reqwest::{header, multipart, Client, StatusCode};

use crate::parse::extract_json;
use crate::types::{ChatMessage, ChatRequest, ChatResponse, ClientConfig, TranscriptionResponse};
use crate::{LlmAgentError, Result};

/// Mime type for an uploaded audio file, by extension. Unknown extensions
/// are sent as WebM, which is what browsers record by default.
pub fn mime_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/m4a",
        "ogg" => "audio/ogg",
        _ => "audio/webm",
    }
}

// ─── LlmClient ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LlmClient {
    http: Client,
    config: ClientConfig,
}

impl LlmClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            config: ClientConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn bearer(&self) -> Result<String> {
        match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(format!("Bearer {key}")),
            _ => Err(LlmAgentError::MissingApiKey),
        }
    }

    /// One system + user exchange at temperature 0. Returns the reply text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: 0.0,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .header(header::AUTHORIZATION, self.bearer()?)
            .json(&request)
            .send()
            .await?;
        let response = check(response).await?;

        let chat: ChatResponse = response.json().await?;
        if let Some(usage) = &chat.usage {
            tracing::debug!(
                model = %self.config.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion"
            );
        }
        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmAgentError::EmptyResponse)
    }

    /// [`LlmClient::complete`] followed by [`extract_json`].
    pub async fn complete_json(&self, system: &str, user: &str) -> Result<serde_json::Value> {
        let reply = self.complete(system, user).await?;
        extract_json(&reply)
    }

    /// Transcribe English speech in `audio`.
    pub async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String> {
        let part = multipart::Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str(mime_for(filename))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("model", self.config.transcription_model.clone())
            .text("language", "en");

        let response = self
            .http
            .post(format!("{}/audio/transcriptions", self.config.base_url))
            .header(header::AUTHORIZATION, self.bearer()?)
            .multipart(form)
            .send()
            .await?;
        let response = check(response).await?;
        let body: TranscriptionResponse = response.json().await?;
        Ok(body.text)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmAgentError::RateLimited);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LlmAgentError::Status {
        status: status.as_u16(),
        body,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client(server: &mockito::ServerGuard) -> LlmClient {
        LlmClient::new(ClientConfig {
            base_url: format!("{}/", server.url()),
            api_key: Some("gsk-test".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn mime_types_by_extension() {
        assert_eq!(mime_for("note.MP3"), "audio/mpeg");
        assert_eq!(mime_for("clip.wav"), "audio/wav");
        assert_eq!(mime_for("recording"), "audio/webm");
        assert_eq!(mime_for("x.flac"), "audio/webm");
    }

    #[tokio::test]
    async fn complete_sends_system_and_user_at_zero_temperature() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer gsk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "llama-3.3-70b-versatile",
                "temperature": 0.0,
                "messages": [
                    {"role": "system", "content": "be terse"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .with_status(200)
            .with_body(
                json!({
                    "choices": [{"message": {"content": "hi"}}],
                    "usage": {"prompt_tokens": 5, "completion_tokens": 1}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let reply = client(&server).complete("be terse", "hello").await.unwrap();
        mock.assert_async().await;
        assert_eq!(reply, "hi");
    }

    #[tokio::test]
    async fn complete_json_strips_fences() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                json!({"choices": [{"message": {"content": "```json\n{\"intent\": \"notify_slack\"}\n```"}}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let value = client(&server).complete_json("s", "u").await.unwrap();
        assert_eq!(value["intent"], "notify_slack");
    }

    #[tokio::test]
    async fn status_errors_are_classified() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .create_async()
            .await;
        let err = client(&server).complete("s", "u").await.unwrap_err();
        assert!(matches!(err, LlmAgentError::RateLimited));

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;
        let err = client(&server).complete("s", "u").await.unwrap_err();
        assert!(matches!(err, LlmAgentError::Status { status: 401, ref body } if body == "invalid api key"));
    }

    #[tokio::test]
    async fn empty_choice_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;
        let err = client(&server).complete("s", "u").await.unwrap_err();
        assert!(matches!(err, LlmAgentError::EmptyResponse));
    }

    #[tokio::test]
    async fn missing_key_fails_before_sending() {
        let client = LlmClient::new(ClientConfig::default()).unwrap();
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, LlmAgentError::MissingApiKey));
    }

    #[tokio::test]
    async fn transcribe_uploads_multipart_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/audio/transcriptions")
            .match_header("authorization", "Bearer gsk-test")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("whisper-large-v3".into()),
                Matcher::Regex(r#"filename="memo.wav""#.into()),
                Matcher::Regex("audio/wav".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"text": "close AUTH-7"}"#)
            .create_async()
            .await;

        let text = client(&server)
            .transcribe(b"RIFF....".to_vec(), "memo.wav")
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(text, "close AUTH-7");
    }
}
