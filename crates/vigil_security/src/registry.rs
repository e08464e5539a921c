//! # Player Registry
//!
//! One sharded map per pipeline holding each player's whole state as a
//! single aggregate. A player's state is only touched while its shard lock
//! is held, so mutation is atomic per player and different shards run in
//! parallel.
//!
//! ```text
//!   player id ──► fib hash ──► shard[i] ──► Mutex<HashMap<PlayerId, S>>
//! ```
//!
//! ## Backpressure
//!
//! When a new player arrives and the population is at `max_profiles`, idle
//! profiles (older than the TTL) are evicted first. If that frees nothing
//! the [`AdmissionPolicy`] decides: admit anyway (default) or reject.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use vigil_shared::PlayerId;

use crate::config::{AdmissionPolicy, RegistryConfig};

/// State that ages out when idle.
pub trait TrackedState: Send {
    /// Last time (ms) the state was touched.
    fn last_activity_ms(&self) -> u64;
}

/// A sub-state inside a player aggregate with its own idle TTL.
///
/// Detector and analyzer private profiles are wrapped in this so they age
/// out independently of the aggregate that holds them.
#[derive(Clone, Debug)]
pub struct Tracked<T> {
    /// The wrapped state.
    pub inner: T,
    last_seen_ms: u64,
}

impl<T> Tracked<T> {
    /// Wraps a fresh state seen at `now_ms`.
    #[must_use]
    pub const fn new(inner: T, now_ms: u64) -> Self {
        Self {
            inner,
            last_seen_ms: now_ms,
        }
    }

    /// Marks the state as used.
    pub fn touch(&mut self, now_ms: u64) {
        self.last_seen_ms = self.last_seen_ms.max(now_ms);
    }

    /// Last time the state was used.
    #[must_use]
    pub const fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms
    }

    /// Replaces the state with `fresh()` if idle longer than `ttl_ms`.
    /// Returns true if it was reset.
    pub fn expire(&mut self, now_ms: u64, ttl_ms: u64, fresh: impl FnOnce() -> T) -> bool {
        if now_ms.saturating_sub(self.last_seen_ms) > ttl_ms {
            self.inner = fresh();
            self.last_seen_ms = now_ms;
            true
        } else {
            false
        }
    }
}

/// Stable bucket for a player id (Fibonacci hashing).
///
/// Used for shard selection here and worker routing in the service, so the
/// same player always lands in the same place.
#[must_use]
pub fn route(player_id: PlayerId, buckets: usize) -> usize {
    let mixed = player_id.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    ((mixed >> 32) as usize) % buckets.max(1)
}

/// Sharded per-player state store.
pub struct PlayerRegistry<S> {
    shards: Box<[Mutex<HashMap<PlayerId, S>>]>,
    population: AtomicUsize,
    evictions: AtomicU64,
    rejected: AtomicU64,
    config: RegistryConfig,
}

impl<S: TrackedState> PlayerRegistry<S> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        let shards: Vec<_> = (0..config.shard_count.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            shards: shards.into_boxed_slice(),
            population: AtomicUsize::new(0),
            evictions: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            config,
        }
    }

    fn shard(&self, player_id: PlayerId) -> &Mutex<HashMap<PlayerId, S>> {
        &self.shards[route(player_id, self.shards.len())]
    }

    /// Runs `f` on the player's state, creating it with `create` if absent.
    ///
    /// Returns `None` only if the player is new, the registry is full after
    /// idle eviction, and the policy is [`AdmissionPolicy::Reject`].
    pub fn with_player<R>(
        &self,
        player_id: PlayerId,
        now_ms: u64,
        create: impl FnOnce() -> S,
        f: impl FnOnce(&mut S) -> R,
    ) -> Option<R> {
        {
            let mut shard = self.shard(player_id).lock();
            if let Some(state) = shard.get_mut(&player_id) {
                return Some(f(state));
            }
        }

        if !self.admit(player_id, now_ms) {
            return None;
        }

        let mut shard = self.shard(player_id).lock();
        let state = shard.entry(player_id).or_insert_with(|| {
            self.population.fetch_add(1, Ordering::Relaxed);
            create()
        });
        Some(f(state))
    }

    /// Capacity check for a new player. Must be called without a shard lock.
    fn admit(&self, player_id: PlayerId, now_ms: u64) -> bool {
        if self.len() < self.config.max_profiles {
            return true;
        }

        let freed = self.evict_idle(now_ms);
        if self.len() < self.config.max_profiles {
            tracing::debug!(freed, "evicted idle profiles to admit player {}", player_id);
            return true;
        }

        match self.config.admission {
            AdmissionPolicy::AdmitAnyway => {
                tracing::warn!(
                    population = self.len(),
                    cap = self.config.max_profiles,
                    "profile cap exceeded, admitting player {} anyway",
                    player_id
                );
                true
            }
            AdmissionPolicy::Reject => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    cap = self.config.max_profiles,
                    "profile cap reached, rejecting player {}",
                    player_id
                );
                false
            }
        }
    }

    /// Runs `f` on an existing player's state.
    pub fn with_existing<R>(&self, player_id: PlayerId, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        let mut shard = self.shard(player_id).lock();
        shard.get_mut(&player_id).map(f)
    }

    /// Runs `f` on every tracked state, one shard at a time.
    pub fn for_each_mut(&self, mut f: impl FnMut(&mut S)) {
        for shard in self.shards.iter() {
            let mut shard = shard.lock();
            for state in shard.values_mut() {
                f(state);
            }
        }
    }

    /// Evicts every state idle for longer than the TTL. Returns the count.
    pub fn evict_idle(&self, now_ms: u64) -> usize {
        let ttl = self.config.profile_ttl_ms;
        let mut evicted = 0;
        for shard in self.shards.iter() {
            let mut shard = shard.lock();
            let before = shard.len();
            shard.retain(|_, state| now_ms.saturating_sub(state.last_activity_ms()) <= ttl);
            evicted += before - shard.len();
        }
        if evicted > 0 {
            self.population.fetch_sub(evicted, Ordering::Relaxed);
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            tracing::debug!(evicted, "evicted idle player profiles");
        }
        evicted
    }

    /// Removes one player's state.
    pub fn remove(&self, player_id: PlayerId) -> Option<S> {
        let removed = self.shard(player_id).lock().remove(&player_id);
        if removed.is_some() {
            self.population.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Returns true if the player is tracked.
    #[must_use]
    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.shard(player_id).lock().contains_key(&player_id)
    }

    /// Number of tracked players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.population.load(Ordering::Relaxed)
    }

    /// Returns true if no players are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every state.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            let mut shard = shard.lock();
            let n = shard.len();
            shard.clear();
            self.population.fetch_sub(n, Ordering::Relaxed);
        }
    }

    /// Total idle evictions so far.
    #[must_use]
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Total rejected admissions so far.
    #[must_use]
    pub fn rejected_admissions(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Zeroes the eviction and rejection counters.
    pub fn reset_counters(&self) {
        self.evictions.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
    }

    /// Idle TTL in milliseconds.
    #[must_use]
    pub fn ttl_ms(&self) -> u64 {
        self.config.profile_ttl_ms
    }
}
