//! Process-scoped session store with TTL eviction.
//!
//! Backed by a `DashMap` so request handlers, accumulator tasks, status reads
//! and the sweeper can touch it concurrently from any runtime thread.

use crate::models::Session;
use crate::services::providers::ProviderId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use metrics::{counter, gauge};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Source of "now" for session timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Read-only snapshot handed to the status path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub content: String,
    pub is_complete: bool,
    pub failure: Option<String>,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            clock,
            ttl,
        }
    }

    /// Insert a fresh, empty session and return its id.
    pub fn create(&self, provider: ProviderId, model: &str) -> String {
        let session = Session::new(provider, model.to_string(), self.clock.now());
        let id = session.id.clone();
        self.sessions.insert(id.clone(), session);
        gauge!("sessions_active").set(self.sessions.len() as f64);
        id
    }

    pub fn snapshot(&self, id: &str) -> Option<SessionSnapshot> {
        self.sessions.get(id).map(|s| SessionSnapshot {
            content: s.content.clone(),
            is_complete: s.is_complete,
            failure: s.failure.clone(),
        })
    }

    /// Append a fragment. Returns `false` if the session no longer exists.
    pub fn append(&self, id: &str, fragment: &str) -> bool {
        let now = self.clock.now();
        match self.sessions.get_mut(id) {
            Some(mut session) => {
                session.append(fragment, now);
                true
            }
            None => false,
        }
    }

    /// Mark finished. Returns `false` if the session no longer exists.
    pub fn complete(&self, id: &str) -> bool {
        let now = self.clock.now();
        match self.sessions.get_mut(id) {
            Some(mut session) => {
                session.complete(now);
                log_finished(id, &session, now);
                true
            }
            None => false,
        }
    }

    /// Record an upstream failure and mark finished.
    pub fn fail(&self, id: &str, reason: impl Into<String>) -> bool {
        let now = self.clock.now();
        match self.sessions.get_mut(id) {
            Some(mut session) => {
                session.fail(reason.into(), now);
                log_finished(id, &session, now);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        let removed = self.sessions.remove(id).map(|(_, s)| s);
        gauge!("sessions_active").set(self.sessions.len() as f64);
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every session idle for longer than the TTL, complete or not.
    /// Returns the number evicted.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let before = self.sessions.len();

        self.sessions.retain(|id, session| {
            let keep = now - session.last_touched <= ttl;
            if !keep {
                tracing::debug!(
                    session_id = %id,
                    provider = %session.provider,
                    model = %session.model,
                    is_complete = session.is_complete,
                    fragments = session.fragments,
                    age_secs = (now - session.created_at).num_seconds(),
                    "Evicting expired session"
                );
            }
            keep
        });

        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            counter!("sessions_evicted_total").increment(evicted as u64);
        }
        gauge!("sessions_active").set(self.sessions.len() as f64);
        evicted
    }

    /// Run `sweep()` every `period` until `shutdown` fires.
    pub fn spawn_sweeper(
        &self,
        period: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("Session sweeper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let evicted = store.sweep();
                        tracing::info!(
                            evicted,
                            remaining = store.len(),
                            "Session sweep finished"
                        );
                    }
                }
            }
        })
    }
}

fn log_finished(id: &str, session: &Session, now: DateTime<Utc>) {
    tracing::info!(
        session_id = %id,
        provider = %session.provider,
        model = %session.model,
        fragments = session.fragments,
        content_len = session.content.len(),
        elapsed_ms = (now - session.created_at).num_milliseconds(),
        failed = session.failure.is_some(),
        "Session finished"
    );
}
