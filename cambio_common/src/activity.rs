//! Idle tracker for conversations.
//!
//! Records the last time each session received a message and reports the sessions
//! that have been quiet for longer than the configured time-to-live:
//!
//! - `ActivityMonitor::touch(id)` — record fresh activity for a session.
//! - `ActivityMonitor::check_timeouts()` — drop and return every session idle past the TTL.
//! - `ActivityMonitor::forget(id)` — stop tracking a session.
//!
//! Time is measured with `std::time::Instant`, which is monotonic. The monitor is not
//! synchronized; share it behind a `Mutex` when several threads need it.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::dialogue::SessionId;

/// Default idle time after which a session is evicted.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

/// Tracks per-session activity and detects idle sessions.
#[derive(Debug)]
pub struct ActivityMonitor {
    last_seen: HashMap<SessionId, Instant>,
    ttl: Duration,
}

impl ActivityMonitor {
    /// Monitor evicting sessions idle for longer than `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            last_seen: HashMap::new(),
            ttl,
        }
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Record activity for `id` now.
    pub fn touch(&mut self, id: SessionId) {
        self.touch_at(id, Instant::now());
    }

    /// Record activity for `id` at `at`.
    pub fn touch_at(&mut self, id: SessionId, at: Instant) {
        self.last_seen.insert(id, at);
    }

    /// Remove and return the sessions idle past the TTL.
    pub fn check_timeouts(&mut self) -> Vec<SessionId> {
        self.check_timeouts_at(Instant::now())
    }

    /// Like [`Self::check_timeouts`], evaluated at `now`.
    pub fn check_timeouts_at(&mut self, now: Instant) -> Vec<SessionId> {
        let ttl = self.ttl;
        let mut timed_out = Vec::new();

        self.last_seen.retain(|id, last| {
            if now.saturating_duration_since(*last) > ttl {
                timed_out.push(*id);
                false
            } else {
                true
            }
        });
        timed_out
    }

    /// `true` if `id` is currently tracked.
    pub fn is_active(&self, id: SessionId) -> bool {
        self.last_seen.contains_key(&id)
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    /// `true` when no session is tracked.
    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}
