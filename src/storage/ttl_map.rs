//! Expiring key-value store with a background sweep task.
//!
//! Entries expire once they have not been written for longer than the
//! configured time-to-live. Reads never return an expired entry; physical
//! removal happens on the sweep, so an entry may occupy memory for up to one
//! sweep interval past its nominal expiry.
//!
//! A sweep reads every entry under shard read locks, but the number of keys
//! it collects and removes is capped by `max_evictions_per_sweep`. The cap
//! bounds write-lock work and allocation per cycle, not the read pass.

use crate::core::{Otlp2ddError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone)]
struct TtlEntry<V> {
    value: V,
    written_at: Instant,
}

impl<V> TtlEntry<V> {
    fn new(value: V, written_at: Instant) -> Self {
        Self { value, written_at }
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.written_at) > ttl
    }
}

/// Sweep counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtlMapStats {
    /// Live and not-yet-swept entries.
    pub entries: usize,
    /// Sweeps performed.
    pub sweeps: u64,
    /// Entries removed by sweeps.
    pub evictions: u64,
}

/// Concurrent map whose entries expire after a sliding time-to-live.
///
/// Backed by a sharded lock table; every operation on a single key is
/// linearizable.
#[derive(Debug)]
pub struct TtlMap<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, TtlEntry<V>>,
    ttl: Duration,
    sweep_interval: Duration,
    max_evictions_per_sweep: usize,
    sweeps: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a map without starting the sweep task.
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Result<Self> {
        if ttl.is_zero() {
            return Err(Otlp2ddError::config("TTL map time-to-live must be greater than 0"));
        }
        if sweep_interval.is_zero() {
            return Err(Otlp2ddError::config("TTL map sweep interval must be greater than 0"));
        }
        Ok(Self {
            entries: DashMap::new(),
            ttl,
            sweep_interval,
            max_evictions_per_sweep: usize::MAX,
            sweeps: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    /// Caps the number of entries a single sweep removes.
    pub fn with_max_evictions_per_sweep(mut self, max: usize) -> Self {
        self.max_evictions_per_sweep = max.max(1);
        self
    }

    /// Entry time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Interval between sweeps.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Returns the value for `key` unless it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now, self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Stores `value`, restarting the entry's expiry clock.
    pub fn put(&self, key: K, value: V) {
        self.entries.insert(key, TtlEntry::new(value, Instant::now()));
    }

    /// Reads and conditionally replaces the value for `key` atomically.
    ///
    /// `f` receives the live value (expired entries are passed as `None`) and
    /// returns the value to store, if any, along with a result. The key's
    /// shard stays locked for the duration of `f`, so `f` must not touch this
    /// map.
    pub fn compute<R, F>(&self, key: K, f: F) -> R
    where
        F: FnOnce(Option<&V>) -> (Option<V>, R),
    {
        let now = Instant::now();
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let live = occupied.get();
                let live = (!live.is_expired(now, self.ttl)).then_some(&live.value);
                let (next, result) = f(live);
                if let Some(value) = next {
                    occupied.insert(TtlEntry::new(value, now));
                }
                result
            },
            Entry::Vacant(vacant) => {
                let (next, result) = f(None);
                if let Some(value) = next {
                    vacant.insert(TtlEntry::new(value, now));
                }
                result
            },
        }
    }

    /// Removes expired entries, at most `max_evictions_per_sweep` of them.
    ///
    /// The scan still visits every entry; only removals are capped, and
    /// expired entries past the cap wait for the next sweep. Returns the
    /// number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|entry| entry.is_expired(now, self.ttl))
            .take(self.max_evictions_per_sweep)
            .map(|entry| entry.key().clone())
            .collect();

        // An entry refreshed since the scan is no longer expired and stays.
        let removed = expired
            .iter()
            .filter(|key| {
                self.entries
                    .remove_if(*key, |_, entry| entry.is_expired(now, self.ttl))
                    .is_some()
            })
            .count();

        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current counters.
    pub fn stats(&self) -> TtlMapStats {
        TtlMapStats {
            entries: self.entries.len(),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Starts the periodic sweep on the current tokio runtime.
    ///
    /// The task holds a weak reference and exits on its own once the map is
    /// dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweeperHandle {
        let map = Arc::downgrade(self);
        let period = self.sweep_interval;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(Self::sweep_loop(map, period, shutdown_rx));

        tracing::debug!(
            "TTL map sweeper started (ttl {:?}, interval {:?})",
            self.ttl,
            self.sweep_interval
        );

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    async fn sweep_loop(map: Weak<Self>, period: Duration, mut shutdown: oneshot::Receiver<()>) {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::debug!("TTL map sweeper shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let Some(map) = map.upgrade() else {
                        break;
                    };
                    let removed = map.sweep();
                    if removed > 0 {
                        tracing::debug!("Swept {} expired entries, {} remain", removed, map.len());
                    }
                }
            }
        }
    }
}

/// Handle to a running sweep task.
///
/// Dropping the handle aborts the task; [`SweeperHandle::stop`] shuts it down
/// and waits for it.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signals the task to stop and waits for it to finish.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await?;
        }
        Ok(())
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
