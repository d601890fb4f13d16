//! Bounded time-to-live cache of membership misses.
//!
//! Only "no active membership" results are cached. A cached entry can make
//! the resolver deny without asking the store, but a grant always comes from
//! a fresh store read, so an ended or downgraded membership is never served
//! from memory. A newly created membership may be denied for up to the TTL
//! unless the writer calls [`MembershipCache::invalidate`].
//!
//! Every invalidation bumps a generation counter. A miss observed before an
//! invalidation carries the older generation and is ignored, so a lookup
//! racing a write cannot resurrect a stale denial.

use dashmap::DashMap;
use league_gate_core::{PlayerId, TeamId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Entry {
    inserted_at: Instant,
    generation: u64,
}

/// Advisory cache of denied (player, team) pairs.
#[derive(Debug)]
pub struct MembershipCache {
    entries: DashMap<(PlayerId, TeamId), Entry>,
    generation: AtomicU64,
    ttl: Duration,
    capacity: usize,
}

impl MembershipCache {
    /// Creates a cache holding at most `capacity` entries for `ttl` each.
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
            ttl,
            capacity,
        }
    }

    /// Returns the configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the number of cached entries, including expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current invalidation generation. Read it before the store call whose
    /// result is passed to [`MembershipCache::record_miss`].
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Returns true if a fresh miss is cached for the pair.
    pub fn is_denied(&self, player: &PlayerId, team: &TeamId) -> bool {
        let key = (player.clone(), team.clone());
        let current = self.generation();
        let denied = self
            .entries
            .get(&key)
            .is_some_and(|entry| entry.inserted_at.elapsed() < self.ttl && entry.generation == current);

        if !denied {
            self.entries.remove_if(&key, |_, entry| {
                entry.inserted_at.elapsed() >= self.ttl || entry.generation != current
            });
        }
        denied
    }

    /// Caches a miss observed at generation `observed`.
    ///
    /// The miss is dropped if an invalidation happened since `observed`.
    /// When the cache is full, expired entries are evicted first; if none
    /// are expired the new entry is dropped.
    pub fn record_miss(&self, player: &PlayerId, team: &TeamId, observed: u64) {
        if self.capacity == 0 || observed != self.generation() {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.evict_stale();
            if self.entries.len() >= self.capacity {
                return;
            }
        }

        self.entries.insert(
            (player.clone(), team.clone()),
            Entry {
                inserted_at: Instant::now(),
                generation: observed,
            },
        );
    }

    /// Drops the cached miss for one pair.
    pub fn invalidate(&self, player: &PlayerId, team: &TeamId) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.remove(&(player.clone(), team.clone()));
    }

    /// Drops every cached miss for `player`.
    pub fn invalidate_player(&self, player: &PlayerId) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.retain(|(cached_player, _), _| cached_player != player);
    }

    fn evict_stale(&self) {
        let ttl = self.ttl;
        let current = self.generation();
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < ttl && entry.generation == current);
    }
}
