//! Cancellable deadlines for delayed "off" transitions
//!
//! Switching an indicator off is delayed by a fixed interval so that a quick
//! off/on sequence never shows up as flicker. Time is always passed in by the
//! caller, which keeps the behavior deterministic under test.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Pending deadlines keyed by target
#[derive(Debug, Clone)]
pub struct Debouncer<K> {
    interval: Duration,
    pending: HashMap<K, Instant>,
}

impl<K> Debouncer<K>
where
    K: Copy + Eq + Hash + Ord,
{
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: HashMap::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Schedule `key` to fire one interval after `now`.
    ///
    /// An already pending deadline is kept, so repeated requests do not
    /// push the transition further out.
    pub fn schedule(&mut self, key: K, now: Instant) -> Instant {
        *self.pending.entry(key).or_insert(now + self.interval)
    }

    /// Drop the pending deadline for `key`, returning whether one existed
    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every key whose deadline is at or before `now`,
    /// earliest first
    pub fn expire(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(Instant, K)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (*deadline, *key))
            .collect();
        due.sort();

        for (_, key) in &due {
            self.pending.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
