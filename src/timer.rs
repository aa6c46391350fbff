//! One-shot timer queue for the single-threaded event loop.
//!
//! Timers are armed with a delay relative to a caller-supplied "now" and
//! are delivered by [`TimerQueue::expire`]. Nothing fires from inside
//! `arm_after`: a zero delay only means "due on the next expiry pass".

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};

/// Pending one-shot timers keyed by `K`. A key has at most one armed timer.
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    by_due: BTreeMap<(NaiveDateTime, u64), K>,
    by_key: BTreeMap<K, (NaiveDateTime, u64)>,
    seq: u64,
}

impl<K: Ord + Copy> TimerQueue<K> {
    pub fn new() -> Self {
        TimerQueue {
            by_due: BTreeMap::new(),
            by_key: BTreeMap::new(),
            seq: 0,
        }
    }

    /// Arm `key` to fire `delay` after `now`, replacing any timer it had.
    /// Negative delays are treated as zero.
    pub fn arm_after(&mut self, key: K, now: NaiveDateTime, delay: Duration) -> NaiveDateTime {
        self.cancel(key);
        let due = now
            .checked_add_signed(delay.max(Duration::zero()))
            .unwrap_or(NaiveDateTime::MAX);
        self.seq += 1;
        self.by_due.insert((due, self.seq), key);
        self.by_key.insert(key, (due, self.seq));
        due
    }

    /// Disarm `key`. Returns `false` if nothing was armed.
    pub fn cancel(&mut self, key: K) -> bool {
        match self.by_key.remove(&key) {
            Some(slot) => {
                self.by_due.remove(&slot);
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, key: K) -> bool {
        self.by_key.contains_key(&key)
    }

    /// When `key` is due, if armed.
    pub fn due_at(&self, key: K) -> Option<NaiveDateTime> {
        self.by_key.get(&key).map(|(due, _)| *due)
    }

    /// Earliest pending due time.
    pub fn next_due(&self) -> Option<NaiveDateTime> {
        self.by_due.keys().next().map(|(due, _)| *due)
    }

    /// Disarm and return every key due at or before `now`, earliest first;
    /// timers due at the same instant come out in arming order.
    pub fn expire(&mut self, now: NaiveDateTime) -> Vec<K> {
        let mut fired = Vec::new();
        while let Some((&slot, &key)) = self.by_due.iter().next() {
            if slot.0 > now {
                break;
            }
            self.by_due.remove(&slot);
            self.by_key.remove(&key);
            fired.push(key);
        }
        fired
    }

    pub fn clear(&mut self) {
        self.by_due.clear();
        self.by_key.clear();
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl<K: Ord + Copy> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}
