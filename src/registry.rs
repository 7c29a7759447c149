use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use std::time::Duration;
use tokio::time::Instant;

use crate::bucket::TokenBucket;
use crate::config::RateLimiterConfig;

// Per-client limiter state
#[derive(Debug)]
pub struct ClientEntry {
    bucket: TokenBucket,
    last_seen: Instant,
}

impl ClientEntry {
    pub fn bucket(&mut self) -> &mut TokenBucket {
        &mut self.bucket
    }
}

// Exclusive handle on one client's entry. The shard stays locked while it is
// alive, so eviction of this entry waits until the caller drops it.
pub type ClientGuard<'a> = RefMut<'a, String, ClientEntry>;

// Concurrent map from client identity to its bucket.
// Admission checks and eviction both take DashMap shard locks: a check on one
// client never overlaps removal of that client, and a sweep holds one shard
// at a time.
pub struct ClientRegistry {
    clients: DashMap<String, ClientEntry>,
    capacity: u32,
    refill_rate: f64,
}

impl ClientRegistry {
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self {
            clients: DashMap::new(),
            capacity: config.burst,
            refill_rate: config.requests_per_second,
        }
    }

    // Entry for identity, created full on first sight, marked as seen now
    pub fn get_or_create(&self, identity: &str) -> ClientGuard<'_> {
        let now = Instant::now();

        // fast path avoids allocating the key for known clients
        let mut entry = match self.clients.get_mut(identity) {
            Some(entry) => entry,
            None => self
                .clients
                .entry(identity.to_string())
                .or_insert_with(|| ClientEntry {
                    bucket: TokenBucket::new(self.capacity, self.refill_rate, now),
                    last_seen: now,
                }),
        };

        entry.last_seen = now;
        entry
    }

    // Peek at remaining tokens without creating the entry or touching last_seen
    pub fn remaining(&self, identity: &str) -> Option<u32> {
        self.clients
            .get_mut(identity)
            .map(|mut entry| entry.bucket().remaining())
    }

    // Drop every client idle longer than max_idle, returns how many went
    pub fn evict_stale(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.clients.retain(|_, entry| {
            let keep = now.saturating_duration_since(entry.last_seen) <= max_idle;
            if !keep {
                removed += 1;
            }
            keep
        });

        removed
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
