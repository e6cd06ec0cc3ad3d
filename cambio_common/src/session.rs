//! In-process session store.
//!
//! Maps each `SessionId` to its `Session` and runs the dialogue against it. Sessions
//! are created on first contact and evicted by `evict_idle` once they have been
//! quiet for longer than the store's TTL; an evicted user who writes again simply
//! starts over. The store is single-threaded: it is meant for one owner (the
//! console, tests), while the bot gives each session its own worker thread.
use std::collections::HashMap;
use std::time::Duration;

use log::info;

use crate::activity::ActivityMonitor;
use crate::dialogue::{Dialogue, Event, Reply, Session, SessionId};

/// Sessions owned by one dialogue.
pub struct SessionStore {
    dialogue: Dialogue,
    sessions: HashMap<SessionId, Session>,
    activity: ActivityMonitor,
}

impl SessionStore {
    /// Empty store evicting sessions idle for longer than `ttl`.
    pub fn new(dialogue: Dialogue, ttl: Duration) -> Self {
        Self {
            dialogue,
            sessions: HashMap::new(),
            activity: ActivityMonitor::new(ttl),
        }
    }

    /// Start (or restart) the conversation for `id`.
    pub fn start(&mut self, id: SessionId) -> Vec<Reply> {
        self.handle(id, Event::Start)
    }

    /// Deliver user text for `id`, starting the conversation if it is unknown.
    pub fn receive(&mut self, id: SessionId, text: &str) -> Vec<Reply> {
        self.handle(id, Event::Text(text.to_string()))
    }

    fn handle(&mut self, id: SessionId, event: Event) -> Vec<Reply> {
        self.activity.touch(id);
        let mut slot = self.sessions.remove(&id);
        let replies = self.dialogue.dispatch(id, &mut slot, event);
        if let Some(session) = slot {
            self.sessions.insert(id, session);
        }
        replies
    }

    /// Current state of `id`, if known.
    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Drop sessions idle past the TTL and return their ids.
    pub fn evict_idle(&mut self) -> Vec<SessionId> {
        let expired = self.activity.check_timeouts();
        for id in &expired {
            self.sessions.remove(id);
            info!("Session {} evicted after {:?} idle", id, self.activity.ttl());
        }
        expired
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// `true` when no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
