//! Per-session state.
//!
//! A session starts at login and ends at logout. It remembers who is logged in, which
//! budget month they are working on, and the allocation drafts they have staged but
//! not saved yet. Sessions live in memory only; restarting the service logs everyone out.

use crate::core::{allocation::DesiredAllocations, period::Period};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Everything the service keeps about one logged-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Logged-in user
    pub user_id: i64,
    /// Their username
    pub username: String,
    /// Budget month being edited
    pub period: Period,
    /// Unsaved allocation drafts for `period`
    pub drafts: DesiredAllocations,
}

impl SessionContext {
    /// A fresh context for `user_id`, editing the current month with no drafts.
    #[must_use]
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            period: Period::current(),
            drafts: DesiredAllocations::new(),
        }
    }

    /// Switches to `period`. Drafts belong to a single month, so they are dropped
    /// whenever the month changes.
    pub fn select_period(&mut self, period: Period) {
        if self.period != period {
            self.drafts.clear();
        }
        self.period = period;
    }
}

/// Session tokens mapped to their contexts. Cloning shares the same map.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionContext>>>,
}

impl SessionStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session and returns its token.
    pub async fn login(&self, context: SessionContext) -> Uuid {
        let token = Uuid::new_v4();
        info!("Session opened for user '{}'", context.username);
        self.sessions.write().await.insert(token, context);
        token
    }

    /// Ends a session. Returns whether the token was known.
    pub async fn logout(&self, token: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&token);
        if let Some(context) = &removed {
            info!("Session closed for user '{}'", context.username);
        }
        removed.is_some()
    }

    /// A snapshot of the session behind `token`.
    pub async fn get(&self, token: Uuid) -> Option<SessionContext> {
        self.sessions.read().await.get(&token).cloned()
    }

    /// Runs `f` on the session behind `token` under the write lock and returns its
    /// result, or `None` for an unknown token.
    pub async fn update<F, T>(&self, token: Uuid, f: F) -> Option<T>
    where
        F: FnOnce(&mut SessionContext) -> T,
    {
        self.sessions.write().await.get_mut(&token).map(f)
    }

    /// Number of open sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// True when no session is open.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
