use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use luckyticket_core::{
    Config, EventBroadcaster, PipelineError, PipelineServices, SanitizedConfig, TicketPipeline,
};

/// Shared application state
pub struct AppState {
    config: Config,
    sessions: SessionRegistry,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, services: PipelineServices) -> Self {
        Self {
            config,
            sessions: SessionRegistry::new(services),
            started_at: Utc::now(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.sessions.services.events
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// One [`TicketPipeline`] per user id, opened on first use.
pub struct SessionRegistry {
    services: PipelineServices,
    sessions: Mutex<HashMap<String, Arc<TicketPipeline>>>,
}

impl SessionRegistry {
    pub fn new(services: PipelineServices) -> Self {
        Self {
            services,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The session for `user_id`, loading quota and tickets the first time.
    pub async fn session(&self, user_id: &str) -> Result<Arc<TicketPipeline>, PipelineError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(user_id) {
            return Ok(Arc::clone(session));
        }

        let session = Arc::new(TicketPipeline::open(self.services.clone(), user_id)?);
        sessions.insert(user_id.to_string(), Arc::clone(&session));
        debug!(user_id, open_sessions = sessions.len(), "Session registered");
        Ok(session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
