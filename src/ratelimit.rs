// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A per-client admission gate with an hour-bucketed counter.
//!
//! The gate sits in front of the renderer: a handler asks `check`
//! before doing any work, and a client that has spent its hourly
//! allowance is turned away until the window rolls over.  Clients are
//! keyed by a hash of their address rather than the address itself, so
//! raw addresses never reach the backing store.
//!
//! The store and the clock are both trait seams.  Production hands in
//! whatever key-value service it has and the system clock; tests hand
//! in a map and a hand-cranked clock and exercise the window logic
//! without waiting an hour.

use fnv::{FnvHashMap, FnvHasher};
use std::hash::Hasher;
use std::time::{SystemTime, UNIX_EPOCH};

/// Admissions allowed per client per hour unless configured
/// otherwise.
pub const DEFAULT_LIMIT: u32 = 200;

const HOUR_MILLIS: u64 = 60 * 60 * 1000;

/// One client's counter and the start of its current window.
#[derive(Copy, Clone, Debug)]
pub struct RateBucket {
    /// Admissions spent in the current window.
    pub count: u32,
    /// Window start, in milliseconds since the epoch.
    pub window_start: u64,
}

/// A source of milliseconds since the epoch.
pub trait Clock {
    /// The current time.
    fn now_millis(&self) -> u64;
}

/// The wall clock.
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_millis() as u64,
            Err(_) => 0,
        }
    }
}

/// Backing storage for rate buckets.  An implementation may be an
/// external key-value service; the TTL hint lets such a store expire
/// dead buckets on its own, but expiry is an optimization here, not a
/// correctness requirement, because the limiter re-checks the window
/// on every read.
pub trait KvStore {
    /// Fetches the bucket stored under `key`, if any.
    fn get(&self, key: &str) -> Option<RateBucket>;
    /// Stores `bucket` under `key` with a time-to-live hint in
    /// seconds.
    fn put(&mut self, key: &str, bucket: RateBucket, ttl_secs: u64);
}

/// A process-local store for single-instance deployments and tests.
#[derive(Default)]
pub struct MemoryStore {
    buckets: FnvHashMap<String, RateBucket>,
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<RateBucket> {
        self.buckets.get(key).cloned()
    }

    fn put(&mut self, key: &str, bucket: RateBucket, _ttl_secs: u64) {
        self.buckets.insert(key.to_string(), bucket);
    }
}

/// The gate itself.
pub struct RateLimiter<S: KvStore, C: Clock> {
    store: S,
    clock: C,
    limit: u32,
}

impl<S: KvStore, C: Clock> RateLimiter<S, C> {
    /// A limiter with the default hourly allowance.
    pub fn new(store: S, clock: C) -> RateLimiter<S, C> {
        RateLimiter::with_limit(store, clock, DEFAULT_LIMIT)
    }

    /// A limiter with a configured hourly allowance.
    pub fn with_limit(store: S, clock: C, limit: u32) -> RateLimiter<S, C> {
        RateLimiter {
            store,
            clock,
            limit,
        }
    }

    /// Admits or refuses one request from `client`.  Admission spends
    /// one unit of the client's hourly allowance; refusal spends
    /// nothing.
    pub fn check(&mut self, client: &str) -> bool {
        let key = bucket_key(client);
        let now = self.clock.now_millis();
        let mut bucket = match self.store.get(&key) {
            Some(bucket) => bucket,
            None => RateBucket {
                count: 0,
                window_start: now,
            },
        };

        if now.saturating_sub(bucket.window_start) > HOUR_MILLIS {
            bucket.count = 0;
            bucket.window_start = now;
        }
        if bucket.count >= self.limit {
            debug!("rate limit reached for {}", key);
            return false;
        }

        bucket.count += 1;
        self.store.put(&key, bucket, HOUR_MILLIS / 1000);
        true
    }
}

/// The store key for a client: a stable FNV-1a hash of the address,
/// hex-printed under a recognizable prefix.  The store never sees the
/// address itself.
fn bucket_key(client: &str) -> String {
    let mut hasher = FnvHasher::default();
    hasher.write(client.as_bytes());
    format!("rate_limit:{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<u64>>);

    impl Clock for ManualClock {
        fn now_millis(&self) -> u64 {
            self.0.get()
        }
    }

    fn limiter(limit: u32) -> (RateLimiter<MemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        let limiter = RateLimiter::with_limit(MemoryStore::default(), clock.clone(), limit);
        (limiter, clock)
    }

    #[test]
    fn admits_up_to_the_limit_then_refuses() {
        let (mut gate, _clock) = limiter(3);
        assert!(gate.check("198.51.100.7"));
        assert!(gate.check("198.51.100.7"));
        assert!(gate.check("198.51.100.7"));
        assert!(!gate.check("198.51.100.7"));
        assert!(!gate.check("198.51.100.7"));
    }

    #[test]
    fn window_rollover_resets_the_count() {
        let (mut gate, clock) = limiter(2);
        assert!(gate.check("198.51.100.7"));
        assert!(gate.check("198.51.100.7"));
        assert!(!gate.check("198.51.100.7"));

        clock.0.set(HOUR_MILLIS + 1);
        assert!(gate.check("198.51.100.7"));
    }

    #[test]
    fn a_full_hour_is_not_quite_enough() {
        let (mut gate, clock) = limiter(1);
        assert!(gate.check("198.51.100.7"));
        // Exactly one hour later the window is still open.
        clock.0.set(HOUR_MILLIS);
        assert!(!gate.check("198.51.100.7"));
    }

    #[test]
    fn clients_are_isolated() {
        let (mut gate, _clock) = limiter(1);
        assert!(gate.check("198.51.100.7"));
        assert!(gate.check("203.0.113.9"));
        assert!(!gate.check("198.51.100.7"));
        assert!(!gate.check("203.0.113.9"));
    }

    #[test]
    fn refusals_spend_no_allowance() {
        let (mut gate, clock) = limiter(1);
        assert!(gate.check("198.51.100.7"));
        for _ in 0..10 {
            assert!(!gate.check("198.51.100.7"));
        }
        clock.0.set(HOUR_MILLIS + 1);
        // The refused attempts did not push the window forward.
        assert!(gate.check("198.51.100.7"));
    }

    #[test]
    fn keys_hide_the_client_address() {
        let key = bucket_key("198.51.100.7");
        assert!(key.starts_with("rate_limit:"));
        assert!(!key.contains("198.51.100.7"));
        assert!(bucket_key("198.51.100.7") != bucket_key("198.51.100.8"));
    }
}
