// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Per-user session state.
//!
//! Each browser session owns exactly one [`Session`]. A new search replaces
//! whatever was displayed before; nothing is merged.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::SessionConfig;

use crate::normalize::ArticleRecord;
use crate::query::SearchRequest;
use crate::stats::StatisticsSummary;

/// Results currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Displayed {
    pub topic: String,
    pub records: Vec<ArticleRecord>,
    pub summary: StatisticsSummary,
    /// History id when the results were stored or reloaded from history.
    pub history_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Searching { topic: String },
    Displayed(Displayed),
    Error { kind: &'static str, message: String },
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Searching { .. } => "searching",
            Self::Displayed(_) => "displayed",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Results that can be exported, if any.
    pub fn displayed(&self) -> Option<&Displayed> {
        match &self.state {
            SessionState::Displayed(d) => Some(d),
            _ => None,
        }
    }

    pub fn begin_search(&mut self, request: &SearchRequest) {
        self.state = SessionState::Searching {
            topic: request.topic().to_string(),
        };
    }

    pub fn show(&mut self, displayed: Displayed) {
        self.state = SessionState::Displayed(displayed);
    }

    pub fn fail(&mut self, kind: &'static str, message: String) {
        self.state = SessionState::Error { kind, message };
    }

    /// Attach the history id once the results have been stored.
    pub fn mark_stored(&mut self, id: i64) {
        if let SessionState::Displayed(d) = &mut self.state {
            d.history_id = Some(id);
        }
    }
}

/// Snapshot of a session for the page.
#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub state: &'static str,
    pub topic: Option<String>,
    pub message: Option<String>,
    pub result_count: usize,
}

impl From<&SessionState> for SessionStatus {
    fn from(state: &SessionState) -> Self {
        let (topic, message, result_count) = match state {
            SessionState::Idle => (None, None, 0),
            SessionState::Searching { topic } => (Some(topic.clone()), None, 0),
            SessionState::Displayed(d) => (Some(d.topic.clone()), None, d.records.len()),
            SessionState::Error { message, .. } => (None, Some(message.clone()), 0),
        };
        Self {
            state: state.label(),
            topic,
            message,
            result_count,
        }
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

struct Slot {
    session: SharedSession,
    touched: Instant,
}

/// Sessions keyed by cookie id.
///
/// A session is registered the first time it has something to hold. Sessions
/// idle for longer than `idle_ttl` are dropped, and the least recently used
/// one is dropped when `max_sessions` would be exceeded.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Slot>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl SessionRegistry {
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_limits(
            Duration::from_secs(config.idle_minutes.saturating_mul(60)),
            config.max_sessions,
        )
    }

    pub fn with_limits(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// The session for `id` if it is registered and still live.
    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        let mut sessions = self.sessions.lock().await;
        let slot = sessions.get_mut(id)?;
        if slot.touched.elapsed() > self.idle_ttl {
            sessions.remove(id);
            return None;
        }
        slot.touched = Instant::now();
        Some(slot.session.clone())
    }

    /// Fetch the session for `id`, registering it when unknown.
    pub async fn get_or_create(&self, id: &str) -> SharedSession {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();

        if let Some(slot) = sessions.get_mut(id) {
            if now.duration_since(slot.touched) <= self.idle_ttl {
                slot.touched = now;
                return slot.session.clone();
            }
        }

        let ttl = self.idle_ttl;
        let before = sessions.len();
        sessions.retain(|_, slot| now.duration_since(slot.touched) <= ttl);
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, slot)| slot.touched)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => sessions.remove(&key),
                None => break,
            };
        }
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, live = sessions.len(), "dropped idle sessions");
        }

        let session = SharedSession::default();
        sessions.insert(
            id.to_string(),
            Slot {
                session: session.clone(),
                touched: now,
            },
        );
        session
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Random session id.
pub fn new_session_id() -> String {
    (0..24)
        .map(|_| fastrand::alphanumeric())
        .collect()
}
