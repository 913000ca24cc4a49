use std::sync::Arc;

use selectarr_core::{Config, ReleasePolicy, ReleaseSource, SanitizedConfig, SessionState};

/// Shared application state
pub struct AppState {
    config: Config,
    session: Arc<SessionState>,
    policy: Arc<ReleasePolicy>,
    searcher: Option<Arc<dyn ReleaseSource>>,
}

impl AppState {
    pub fn new(
        config: Config,
        session: Arc<SessionState>,
        policy: Arc<ReleasePolicy>,
        searcher: Option<Arc<dyn ReleaseSource>>,
    ) -> Self {
        Self {
            config,
            session,
            policy,
            searcher,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Retry and suppression state shared with the orchestrator.
    pub fn session(&self) -> &SessionState {
        self.session.as_ref()
    }

    pub fn policy(&self) -> &ReleasePolicy {
        self.policy.as_ref()
    }

    pub fn searcher(&self) -> Option<&Arc<dyn ReleaseSource>> {
        self.searcher.as_ref()
    }
}
