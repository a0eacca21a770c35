use crate::context::ContextLimits;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

const REDACTED: &str = "********";

fn redact(secret: &mut Option<String>) {
    if secret.as_deref().is_some_and(|s| !s.is_empty()) {
        *secret = Some(REDACTED.to_string());
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// OpenAI-compatible reasoning and transcription backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// HTTP timeout for model calls. Unset means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_transcription_model() -> String {
    "whisper-large-v3".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            transcription_model: default_transcription_model(),
            api_key: None,
            timeout_secs: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

// ---------------------------------------------------------------------------
// SearchConfig
// ---------------------------------------------------------------------------

/// Elasticsearch cluster. With no URL the in-memory store is used instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl SearchConfig {
    pub fn is_configured(&self) -> bool {
        is_set(&self.url)
    }
}

// ---------------------------------------------------------------------------
// JiraConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Site host, e.g. `acme.atlassian.net`.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_jira_project_key")]
    pub project_key: String,
}

fn default_jira_project_key() -> String {
    "VO".to_string()
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            domain: None,
            email: None,
            api_token: None,
            project_key: default_jira_project_key(),
        }
    }
}

impl JiraConfig {
    pub fn is_configured(&self) -> bool {
        is_set(&self.domain) && is_set(&self.email) && is_set(&self.api_token)
    }

    fn is_partial(&self) -> bool {
        let set = [&self.domain, &self.email, &self.api_token]
            .into_iter()
            .filter(|v| is_set(v))
            .count();
        set > 0 && set < 3
    }
}

// ---------------------------------------------------------------------------
// SlackConfig / PendingConfig / ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingConfig {
    /// Age after which an unconfirmed plan is discarded. Unset means never.
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl PendingConfig {
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub elasticsearch: SearchConfig,
    #[serde(default)]
    pub jira: JiraConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub context: ContextLimits,
    #[serde(default)]
    pub pending: PendingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Read a YAML config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// [`Config::load`] followed by the process environment overlay.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut cfg = Self::load(path)?;
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Overlay deployment environment variables. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("ELASTICSEARCH_URL") {
            self.elasticsearch.url = Some(v);
        }
        if let Some(v) = get("ELASTICSEARCH_API_KEY") {
            self.elasticsearch.api_key = Some(v);
        }
        if let Some(v) = get("SLACK_WEBHOOK_URL") {
            self.slack.webhook_url = Some(v);
        }
        if let Some(v) = get("JIRA_DOMAIN") {
            self.jira.domain = Some(v);
        }
        if let Some(v) = get("JIRA_EMAIL") {
            self.jira.email = Some(v);
        }
        if let Some(v) = get("JIRA_API_TOKEN") {
            self.jira.api_token = Some(v);
        }
        if let Some(v) = get("JIRA_PROJECT_KEY") {
            self.jira.project_key = v;
        }
    }

    /// Copy with every secret masked, for display.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        redact(&mut cfg.llm.api_key);
        redact(&mut cfg.elasticsearch.api_key);
        redact(&mut cfg.jira.api_token);
        redact(&mut cfg.slack.webhook_url);
        cfg
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !is_set(&self.llm.api_key) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "llm.api_key is not set; commands cannot be processed".to_string(),
            });
        }

        if self.jira.is_partial() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "jira needs domain, email and api_token; tracker calls will be skipped"
                    .to_string(),
            });
        }

        if !self.elasticsearch.is_configured() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "elasticsearch.url is not set; using the in-memory store".to_string(),
            });
        }

        for (name, limit) in [
            ("similar_tickets", self.context.similar_tickets),
            ("past_commands", self.context.past_commands),
            ("past_actions", self.context.past_actions),
        ] {
            if limit == 0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("context.{name} is 0; plans get no {name} context"),
                });
            }
        }

        if self.pending.max_age_secs == Some(0) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "pending.max_age_secs is 0; staged plans expire immediately".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = Config::load(&dir.path().join("voiceops.yaml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(cfg.jira.project_key, "VO");
        assert_eq!(cfg.context.similar_tickets, 5);
        assert_eq!(cfg.pending.max_age(), None);
        assert_eq!(cfg.llm.timeout(), None);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("voiceops.yaml");
        std::fs::write(
            &path,
            "llm:\n  timeout_secs: 30\ncontext:\n  past_commands: 10\npending:\n  max_age_secs: 900\n",
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.llm.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.llm.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(cfg.context.past_commands, 10);
        assert_eq!(cfg.context.past_actions, 3);
        assert_eq!(cfg.pending.max_age(), Some(Duration::from_secs(900)));
        assert_eq!(cfg.server.port, 8000);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("voiceops.yaml");
        std::fs::write(&path, "context: [not, a, map]\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[
            ("LLM_API_KEY", "gsk-123"),
            ("LLM_MODEL", "mixtral"),
            ("JIRA_DOMAIN", "acme.atlassian.net"),
            ("JIRA_EMAIL", "ops@acme.io"),
            ("JIRA_API_TOKEN", "tok"),
            ("JIRA_PROJECT_KEY", "OPS"),
            ("SLACK_WEBHOOK_URL", ""),
        ]));

        assert_eq!(cfg.llm.api_key.as_deref(), Some("gsk-123"));
        assert_eq!(cfg.llm.model, "mixtral");
        assert!(cfg.jira.is_configured());
        assert_eq!(cfg.jira.project_key, "OPS");
        assert_eq!(cfg.slack.webhook_url, None);
    }

    #[test]
    fn redacted_masks_secrets_only() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[
            ("LLM_API_KEY", "gsk-123"),
            ("ELASTICSEARCH_URL", "https://es:9200"),
            ("ELASTICSEARCH_API_KEY", "es-key"),
        ]));
        let shown = cfg.redacted();
        assert_eq!(shown.llm.api_key.as_deref(), Some(REDACTED));
        assert_eq!(shown.elasticsearch.api_key.as_deref(), Some(REDACTED));
        assert_eq!(shown.elasticsearch.url.as_deref(), Some("https://es:9200"));
        assert_eq!(shown.jira.api_token, None);
    }

    #[test]
    fn validate_flags_missing_key_and_partial_jira() {
        let mut cfg = Config::default();
        cfg.jira.domain = Some("acme.atlassian.net".into());
        cfg.context.past_actions = 0;

        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("llm.api_key")));
        assert!(warnings.iter().any(|w| w.message.contains("jira")));
        assert!(warnings.iter().any(|w| w.message.contains("context.past_actions")));
    }

    #[test]
    fn complete_config_has_no_warnings() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[
            ("LLM_API_KEY", "gsk-123"),
            ("ELASTICSEARCH_URL", "https://es:9200"),
        ]));
        assert!(cfg.validate().is_empty(), "{:?}", cfg.validate());
    }
}
