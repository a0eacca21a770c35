use std::sync::Arc;
use std::time::Duration;

use llm_agent::{ClientConfig, LlmClient};
use voiceops_core::audit::AuditSink;
use voiceops_core::collaborators::{
    IntentExtractor, IssueTracker, Notifier, PlanGenerator, SearchBackend, TicketIndex,
    Transcriber,
};
use voiceops_core::config::Config;
use voiceops_core::connectors::{ElasticStore, JiraClient, MemoryStore, SlackNotifier};
use voiceops_core::context::{ContextAssembler, ContextLimits};
use voiceops_core::executor::Executor;
use voiceops_core::handlers::{ActionHandler, TicketActions};
use voiceops_core::pending::InMemoryPendingStore;
use voiceops_core::pipeline::Pipeline;

use crate::reasoner::LlmReasoner;

/// Every collaborator the server talks to. Production wiring comes from
/// [`Services::from_config`]; tests assemble their own.
pub struct Services {
    pub extractor: Arc<dyn IntentExtractor>,
    pub planner: Arc<dyn PlanGenerator>,
    pub transcriber: Arc<dyn Transcriber>,
    pub search: Arc<dyn SearchBackend>,
    pub index: Arc<dyn TicketIndex>,
    pub audit: Arc<dyn AuditSink>,
    pub tracker: Arc<dyn IssueTracker>,
    pub notifier: Arc<dyn Notifier>,
    /// Name reported by the health endpoint.
    pub search_backend: &'static str,
    pub context_limits: ContextLimits,
    pub pending_max_age: Option<Duration>,
}

type StoreHandles = (
    Arc<dyn SearchBackend>,
    Arc<dyn TicketIndex>,
    Arc<dyn AuditSink>,
);

fn store_handles<S>(store: Arc<S>) -> StoreHandles
where
    S: SearchBackend + TicketIndex + AuditSink + 'static,
{
    (store.clone(), store.clone(), store)
}

impl Services {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = LlmClient::new(ClientConfig {
            base_url: config.llm.base_url.clone(),
            api_key: config.llm.api_key.clone(),
            model: config.llm.model.clone(),
            transcription_model: config.llm.transcription_model.clone(),
            timeout: config.llm.timeout(),
        })?;
        let reasoner = Arc::new(LlmReasoner::new(client));

        let ((search, index, audit), search_backend) = match &config.elasticsearch.url {
            Some(url) if config.elasticsearch.is_configured() => {
                let store = ElasticStore::new(url.clone(), config.elasticsearch.api_key.clone());
                (store_handles(Arc::new(store)), "elasticsearch")
            }
            _ => (store_handles(Arc::new(MemoryStore::new())), "memory"),
        };

        Ok(Self {
            extractor: reasoner.clone(),
            planner: reasoner.clone(),
            transcriber: reasoner,
            search,
            index,
            audit,
            tracker: Arc::new(JiraClient::from_config(&config.jira)),
            notifier: Arc::new(SlackNotifier::new(config.slack.webhook_url.clone())),
            search_backend,
            context_limits: config.context,
            pending_max_age: config.pending.max_age(),
        })
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub handler: Arc<dyn ActionHandler>,
    pub tracker: Arc<dyn IssueTracker>,
    pub notifier: Arc<dyn Notifier>,
    pub search: Arc<dyn SearchBackend>,
    pub transcriber: Arc<dyn Transcriber>,
    pub search_backend: &'static str,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        let handler: Arc<dyn ActionHandler> = Arc::new(TicketActions::new(
            services.tracker.clone(),
            services.index,
            services.notifier.clone(),
        ));
        let pipeline = Pipeline::new(
            services.extractor,
            services.planner,
            ContextAssembler::new(services.search.clone(), services.context_limits),
            Arc::new(InMemoryPendingStore::with_max_age(services.pending_max_age)),
            Executor::new(handler.clone(), services.audit.clone()),
            services.audit,
        );

        Self {
            pipeline: Arc::new(pipeline),
            handler,
            tracker: services.tracker,
            notifier: services.notifier,
            search: services.search,
            transcriber: services.transcriber,
            search_backend: services.search_backend,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(Services::from_config(config)?))
    }
}
