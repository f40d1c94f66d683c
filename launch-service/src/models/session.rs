//! In-memory record of one generation.

use crate::services::providers::ProviderId;
use chrono::{DateTime, Utc};

/// One in-flight or finished generation.
///
/// Written only by the accumulator bound to its upstream stream; everyone else
/// reads a clone.
#[derive(Debug, Clone)]
pub struct Session {
    /// Random 128-bit identifier (UUID v4).
    pub id: String,

    pub provider: ProviderId,

    pub model: String,

    /// Raw text as streamed; only ever appended to.
    pub content: String,

    pub is_complete: bool,

    /// Set when the upstream stream broke before finishing.
    pub failure: Option<String>,

    /// Number of fragments appended so far.
    pub fragments: u64,

    pub created_at: DateTime<Utc>,

    /// Last append or state change; drives TTL eviction.
    pub last_touched: DateTime<Utc>,
}

impl Session {
    pub fn new(provider: ProviderId, model: String, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            provider,
            model,
            content: String::new(),
            is_complete: false,
            failure: None,
            fragments: 0,
            created_at: now,
            last_touched: now,
        }
    }

    pub fn append(&mut self, fragment: &str, now: DateTime<Utc>) {
        self.content.push_str(fragment);
        self.fragments += 1;
        self.last_touched = now;
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.is_complete = true;
        self.last_touched = now;
    }

    pub fn fail(&mut self, reason: String, now: DateTime<Utc>) {
        self.failure = Some(reason);
        self.complete(now);
    }
}
