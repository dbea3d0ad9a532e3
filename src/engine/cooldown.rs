//! Per-user, per-trigger cooldowns.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Source of wall-clock time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// One `(user, trigger)` pair and when it last fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownRecord {
    pub user_id: String,
    pub trigger_id: String,
    pub timestamp: DateTime<Utc>,
}

type Key = (String, String);

/// Remembers when each user last set off each trigger.
///
/// Records are never expired eagerly; whether a pair is still cooling down is computed from the
/// elapsed time on every check.
pub struct CooldownTracker {
    window: TimeDelta,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<Key, DateTime<Utc>>>,
}

impl CooldownTracker {
    pub fn new(window: TimeDelta) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    pub fn with_clock(window: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn key(user_id: &str, trigger_id: &str) -> Key {
        (user_id.to_string(), trigger_id.to_string())
    }

    /// Whether the pair fired less than one window ago.
    pub fn is_on_cooldown(&self, user_id: &str, trigger_id: &str) -> bool {
        let entries = self.entries.read();

        match entries.get(&Self::key(user_id, trigger_id)) {
            Some(last) => self.clock.now() - *last < self.window,
            None => false,
        }
    }

    /// Records that the pair fired now.
    pub fn set_cooldown(&self, user_id: &str, trigger_id: &str) {
        let now = self.clock.now();
        self.entries.write().insert(Self::key(user_id, trigger_id), now);
    }

    /// Records that the pair fired now, unless it is still cooling down.
    ///
    /// The check and the write happen under one lock, so two messages handled at the same time
    /// cannot both get through.
    pub fn try_set_cooldown(&self, user_id: &str, trigger_id: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let key = Self::key(user_id, trigger_id);

        if entries.get(&key).is_some_and(|last| now - *last < self.window) {
            return false;
        }

        entries.insert(key, now);
        true
    }

    /// Forgets the pair. Returns `false` when nothing was recorded.
    pub fn reset_cooldown(&self, user_id: &str, trigger_id: &str) -> bool {
        self.entries.write().remove(&Self::key(user_id, trigger_id)).is_some()
    }

    /// Every recorded pair, expired or not.
    pub fn list_all(&self) -> Vec<CooldownRecord> {
        self.entries
            .read()
            .iter()
            .map(|((user_id, trigger_id), timestamp)| CooldownRecord {
                user_id: user_id.clone(),
                trigger_id: trigger_id.clone(),
                timestamp: *timestamp,
            })
            .collect()
    }

    /// Drops records whose window has passed. Returns how many were dropped.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();

        entries.retain(|_, last| now - *last < self.window);

        before - entries.len()
    }
}

// Tests.
