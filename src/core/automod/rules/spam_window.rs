// Sliding windows of recent message timestamps, keyed per (guild, something).
//
// DashMap locks one shard per access, so read-modify-write on a key is
// atomic without serializing unrelated guilds behind a single lock.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Timestamps of recent hits, oldest first.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    hits: VecDeque<Instant>,
}

impl SlidingWindow {
    fn new() -> Self {
        Self {
            hits: VecDeque::new(),
        }
    }

    /// Drop hits older than `window` relative to `now`.
    fn evict(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.hits.front() {
            if now.saturating_duration_since(*oldest) > window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// A family of sliding windows sharing the same duration.
pub struct WindowMap<K: Eq + Hash> {
    window: Duration,
    windows: DashMap<K, SlidingWindow>,
}

impl<K: Eq + Hash + Clone> WindowMap<K> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            windows: DashMap::new(),
        }
    }

    /// Record a hit at `now` and return how many hits the window holds,
    /// including this one.
    pub fn record(&self, key: K, now: Instant) -> usize {
        let mut entry = self.windows.entry(key).or_insert_with(SlidingWindow::new);
        entry.evict(now, self.window);
        entry.hits.push_back(now);
        entry.len()
    }

    /// Evict expired hits everywhere and drop windows left empty.
    /// Returns the number of windows removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            window.evict(now, self.window);
            !window.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Drop every window whose key matches `predicate`.
    pub fn forget(&self, predicate: impl Fn(&K) -> bool) {
        self.windows.retain(|key, _| !predicate(key));
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }
}
