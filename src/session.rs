//! Session table
//!
//! Maps provider-issued session ids to the connection they were opened for and
//! the node paths currently being expanded under them.

use crate::connection::ConnectionProfile;
use crate::expansion::PendingExpansion;
use crate::types::ObjectExplorerSession;
use std::collections::HashMap;
use tracing::trace;

/// One open session
#[derive(Debug)]
pub struct SessionStatus {
    pub provider_id: String,
    pub connection: ConnectionProfile,
    pub session: ObjectExplorerSession,
    pub nodes: HashMap<String, PendingExpansion>,
}

impl SessionStatus {
    pub fn new(
        provider_id: impl Into<String>,
        connection: ConnectionProfile,
        session: ObjectExplorerSession,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            connection,
            session,
            nodes: HashMap::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<String, SessionStatus>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session, returning true if an entry was replaced
    pub fn insert(&mut self, status: SessionStatus) -> bool {
        let session_id = status.session.session_id.clone();
        let replaced = self.sessions.insert(session_id.clone(), status);
        if let Some(previous) = &replaced {
            trace!(
                session_id = %session_id,
                pending = previous.nodes.len(),
                "Replaced existing session entry"
            );
        }
        replaced.is_some()
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionStatus> {
        self.sessions.get(session_id)
    }

    pub fn get_mut(&mut self, session_id: &str) -> Option<&mut SessionStatus> {
        self.sessions.get_mut(session_id)
    }

    pub fn remove(&mut self, session_id: &str) -> Option<SessionStatus> {
        self.sessions.remove(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Take every outstanding expansion of a session, keyed by node path
    pub fn drain_pending(&mut self, session_id: &str) -> Vec<(String, PendingExpansion)> {
        self.sessions
            .get_mut(session_id)
            .map(|status| status.nodes.drain().collect())
            .unwrap_or_default()
    }
}
