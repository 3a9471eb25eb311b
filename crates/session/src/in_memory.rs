//! In-memory session store: process-lifetime chat histories.
//!
//! The map lock is held only long enough to find or insert a session's
//! entry; each entry has its own mutex, so appends on different sessions
//! never wait for each other while appends on the same session serialize.
//!
//! Memory is bounded three ways: the retention window per session, an idle
//! TTL after which a session is treated as unknown, and a cap on the number
//! of live sessions (least recently touched evicted first). Eviction is lazy:
//! expired entries are swept on every [`SWEEP_INTERVAL`]th new session and
//! whenever the cap is reached. Nothing runs in the background.

use async_trait::async_trait;
use averygate_core::error::SessionError;
use averygate_core::message::{SessionId, Turn};
use averygate_core::session::{SessionSnapshot, SessionStore, enforce_window};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Retention and eviction limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Maximum turns kept per session (W)
    pub retention_window: usize,
    /// Idle time after which a session is forgotten. `None` = never.
    pub idle_ttl: Option<Duration>,
    /// Maximum number of live sessions
    pub max_sessions: usize,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            retention_window: 20,
            idle_ttl: Some(Duration::from_secs(2 * 60 * 60)),
            max_sessions: 10_000,
        }
    }
}

impl SessionPolicy {
    pub fn from_config(config: &averygate_config::ChatConfig) -> Self {
        Self {
            retention_window: config.retention_window,
            idle_ttl: (config.session_ttl_secs > 0)
                .then(|| Duration::from_secs(config.session_ttl_secs)),
            max_sessions: config.max_sessions,
        }
    }
}

struct SessionEntry {
    history: Vec<Turn>,
    last_touched: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            history: Vec::new(),
            last_touched: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        ttl.is_some_and(|ttl| now.duration_since(self.last_touched) > ttl)
    }

    /// Mark as used; an expired entry starts over with an empty history.
    fn touch(&mut self, ttl: Option<Duration>) {
        let now = Instant::now();
        if self.is_expired(ttl, now) {
            self.history.clear();
        }
        self.last_touched = now;
    }
}

type SharedEntry = Arc<Mutex<SessionEntry>>;

/// New sessions between two sweeps of expired entries.
pub const SWEEP_INTERVAL: usize = 64;

/// Drop expired entries. Entries locked by an in-flight request are busy,
/// hence not idle, and are kept. Returns how many were removed.
fn retain_live(sessions: &mut HashMap<SessionId, SharedEntry>, ttl: Option<Duration>) -> usize {
    if ttl.is_none() {
        return 0;
    }
    let now = Instant::now();
    let before = sessions.len();
    sessions.retain(|_, entry| match entry.try_lock() {
        Ok(e) => !e.is_expired(ttl, now),
        Err(_) => true,
    });
    before - sessions.len()
}

/// A session store that keeps every history in process memory.
pub struct InMemorySessionStore {
    policy: SessionPolicy,
    sessions: RwLock<HashMap<SessionId, SharedEntry>>,
    created: AtomicUsize,
}

impl InMemorySessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy,
            sessions: RwLock::new(HashMap::new()),
            created: AtomicUsize::new(0),
        }
    }

    /// A store with the given window and default eviction limits.
    pub fn with_window(retention_window: usize) -> Self {
        Self::new(SessionPolicy {
            retention_window,
            ..SessionPolicy::default()
        })
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Find the entry for `id`, inserting an empty one if needed.
    async fn entry(&self, id: &SessionId) -> SharedEntry {
        if let Some(entry) = self.sessions.read().await.get(id) {
            return entry.clone();
        }

        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get(id) {
            return entry.clone();
        }

        let created = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        if created % SWEEP_INTERVAL == 0 {
            let removed = retain_live(&mut sessions, self.policy.idle_ttl);
            if removed > 0 {
                debug!(removed, live = sessions.len(), "Expired sessions swept");
            }
        }

        if sessions.len() >= self.policy.max_sessions {
            self.make_room(&mut sessions);
        }

        let entry: SharedEntry = Arc::new(Mutex::new(SessionEntry::new()));
        sessions.insert(id.clone(), entry.clone());
        debug!(session_id = %id, live = sessions.len(), "Session created");
        entry
    }

    /// Drop expired sessions, then the least recently touched idle one if
    /// the cap is still reached.
    fn make_room(&self, sessions: &mut HashMap<SessionId, SharedEntry>) {
        let before = sessions.len();
        retain_live(sessions, self.policy.idle_ttl);

        if sessions.len() >= self.policy.max_sessions {
            let oldest = sessions
                .iter()
                .filter_map(|(id, entry)| entry.try_lock().ok().map(|e| (id.clone(), e.last_touched)))
                .min_by_key(|(_, touched)| *touched)
                .map(|(id, _)| id);
            if let Some(id) = oldest {
                sessions.remove(&id);
            }
        }

        debug!(evicted = before - sessions.len(), "Session capacity reached");
    }

    /// Remove every session idle for longer than the TTL. Returns how many
    /// were removed.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        retain_live(&mut sessions, self.policy.idle_ttl)
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(SessionPolicy::default())
    }
}

fn lock(entry: &SharedEntry) -> std::sync::MutexGuard<'_, SessionEntry> {
    entry.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn retention_window(&self) -> usize {
        self.policy.retention_window
    }

    async fn get_or_create(&self, id: Option<SessionId>) -> Result<SessionSnapshot, SessionError> {
        let id = id.unwrap_or_else(SessionId::generate);
        let entry = self.entry(&id).await;
        let mut guard = lock(&entry);
        guard.touch(self.policy.idle_ttl);
        Ok(SessionSnapshot {
            history: guard.history.clone(),
            id,
        })
    }

    async fn append_all(&self, id: &SessionId, turns: Vec<Turn>) -> Result<usize, SessionError> {
        let entry = self.entry(id).await;
        let mut guard = lock(&entry);
        guard.touch(self.policy.idle_ttl);
        guard.history.extend(turns);
        enforce_window(&mut guard.history, self.policy.retention_window);
        Ok(guard.history.len())
    }

    async fn history(&self, id: &SessionId) -> Result<Vec<Turn>, SessionError> {
        let Some(entry) = self.sessions.read().await.get(id).cloned() else {
            return Ok(Vec::new());
        };
        let guard = lock(&entry);
        if guard.is_expired(self.policy.idle_ttl, Instant::now()) {
            return Ok(Vec::new());
        }
        Ok(guard.history.clone())
    }

    /// Live sessions only; expired entries still in the map are not counted.
    async fn count(&self) -> Result<usize, SessionError> {
        let now = Instant::now();
        let ttl = self.policy.idle_ttl;
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|entry| !lock(entry).is_expired(ttl, now))
            .count())
    }
}
