use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    config::EngineConfig,
    error::{AssessmentError, Result},
    scoring::RiskScorer,
    session::AssessmentSession,
};

/// Live assessment sessions, one per open intake form.
///
/// Sessions share a scorer and engine config. Nothing here outlives the
/// process.
#[derive(Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<Uuid, AssessmentSession>>,
    scorer: Arc<dyn RiskScorer>,
    config: EngineConfig,
}

impl InMemorySessionStore {
    pub fn new(scorer: Arc<dyn RiskScorer>, config: EngineConfig) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            scorer,
            config,
        }
    }

    pub fn create(&self) -> Uuid {
        let session = AssessmentSession::new(self.scorer.clone(), self.config.clone());
        let id = session.id();
        self.sessions.insert(id, session);
        info!(session_id = %id, "Assessment session created");
        id
    }

    /// Runs `f` with exclusive access to one session.
    ///
    /// `f` must not touch this store, or it will deadlock on the shard lock.
    pub fn with_session<F, R>(&self, id: &Uuid, f: F) -> Result<R>
    where
        F: FnOnce(&mut AssessmentSession) -> R,
    {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or(AssessmentError::SessionNotFound(*id))?;
        Ok(f(session.value_mut()))
    }

    /// Tears the session down and forgets it. Returns whether it existed.
    pub fn remove(&self, id: &Uuid) -> bool {
        match self.sessions.remove(id) {
            Some((_, session)) => {
                session.teardown();
                info!(session_id = %id, "Assessment session removed");
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
