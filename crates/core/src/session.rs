//! Session store trait: bounded per-session conversation history.
//!
//! The store owns every stored [`Turn`]. Callers get copies of the history;
//! the only way to change it is [`SessionStore::append_all`], which must be
//! atomic per session so concurrent requests on one session never lose or
//! interleave turns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::message::{SessionId, Turn};

/// The resolved session for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    /// Stored turns, oldest first. A copy: mutating it changes nothing.
    pub history: Vec<Turn>,
}

/// Drop the oldest turns until at most `window` remain.
///
/// Order of the retained suffix is preserved. Shared by every backend so the
/// eviction law is identical everywhere.
pub fn enforce_window(history: &mut Vec<Turn>, window: usize) {
    if history.len() > window {
        let excess = history.len() - window;
        history.drain(..excess);
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// A human-readable name for this backend (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Maximum number of turns retained per session.
    fn retention_window(&self) -> usize;

    /// Resolve a session.
    ///
    /// `None` generates a new identifier with an empty history. An id the
    /// store doesn't know (or has expired) keeps its identifier and starts
    /// with an empty history.
    async fn get_or_create(
        &self,
        id: Option<SessionId>,
    ) -> std::result::Result<SessionSnapshot, SessionError>;

    /// Append turns in order as one atomic step, then enforce the retention
    /// window. Unknown ids are created. Returns the stored length afterwards.
    async fn append_all(
        &self,
        id: &SessionId,
        turns: Vec<Turn>,
    ) -> std::result::Result<usize, SessionError>;

    /// Append a single turn.
    async fn append(&self, id: &SessionId, turn: Turn) -> std::result::Result<usize, SessionError> {
        self.append_all(id, vec![turn]).await
    }

    /// A copy of the stored history; empty for unknown ids.
    async fn history(&self, id: &SessionId) -> std::result::Result<Vec<Turn>, SessionError>;

    /// Number of live sessions.
    async fn count(&self) -> std::result::Result<usize, SessionError>;
}
