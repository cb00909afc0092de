//! Creation and access timestamps for memory nodes
//!
//! Age is always measured from `created_at`; `last_accessed` records the most
//! recent retrieval that surfaced the node and never moves before creation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Timestamps tracked for every memory node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalMetadata {
    /// When this record was inserted into the store
    pub created_at: DateTime<Utc>,

    /// When this record was last returned by a retrieval
    pub last_accessed: DateTime<Utc>,
}

impl TemporalMetadata {
    /// Create metadata for a record inserted right now
    pub fn new_current() -> Self {
        Self::created_at(Utc::now())
    }

    /// Create metadata for a record inserted at a specific time
    pub fn created_at(at: DateTime<Utc>) -> Self {
        Self {
            created_at: at,
            last_accessed: at,
        }
    }

    /// Record an access at `now`
    ///
    /// Clock skew can hand us a `now` earlier than creation; the access time
    /// is pinned to `created_at` in that case.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed = now.max(self.created_at);
    }

    /// Age of the record at `now`, never negative
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).max(Duration::zero())
    }

    /// Age of the record at `now` in fractional seconds, never negative
    pub fn age_seconds_at(&self, now: DateTime<Utc>) -> f64 {
        self.age_at(now).num_milliseconds() as f64 / 1000.0
    }

    /// Age of the record at `now` in fractional days
    pub fn age_days_at(&self, now: DateTime<Utc>) -> f64 {
        self.age_seconds_at(now) / SECONDS_PER_DAY
    }

    /// Time since the last access, never negative
    pub fn idle_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_accessed).max(Duration::zero())
    }
}

impl Default for TemporalMetadata {
    fn default() -> Self {
        Self::new_current()
    }
}
