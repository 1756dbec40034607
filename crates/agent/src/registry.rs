use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use copilot_core::domain::utterance::SessionId;

use crate::session::{Collaborators, ConversationSession, SessionSettings};

/// Hosts concurrent sessions that share settings and collaborators.
pub struct SessionRegistry {
    settings: SessionSettings,
    collaborators: Collaborators,
    sessions: RwLock<HashMap<SessionId, Arc<ConversationSession>>>,
}

impl SessionRegistry {
    pub fn new(settings: SessionSettings, collaborators: Collaborators) -> Self {
        Self { settings, collaborators, sessions: RwLock::new(HashMap::new()) }
    }

    pub async fn open(&self) -> Arc<ConversationSession> {
        let id = SessionId::generate();
        let session = Arc::new(ConversationSession::new(
            id.clone(),
            self.settings.clone(),
            self.collaborators.clone(),
        ));
        self.sessions.write().await.insert(id.clone(), Arc::clone(&session));
        info!(event_name = "registry.session.opened", session_id = %id, "session opened");
        session
    }

    pub async fn get(&self, id: &SessionId) -> Option<Arc<ConversationSession>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Removes the session and runs its stop flush. Unknown ids return `false`.
    pub async fn close(&self, id: &SessionId) -> bool {
        let Some(session) = self.sessions.write().await.remove(id) else {
            return false;
        };
        session.stop().await;
        info!(event_name = "registry.session.closed", session_id = %id, "session closed");
        true
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
