//! Cumulative counter to per-second rate conversion.
//!
//! Each series remembers its previous `(timestamp, value)` in a shared
//! [`TtlMap`]. A new observation produces a rate only when there is a prior
//! point that is strictly older and not larger than the new value.

use crate::core::NumberValue;
use crate::storage::TtlMap;
use crate::translator::tags::SeriesKey;
use std::sync::Arc;

const NANOS_PER_SECOND: f64 = 1e9;

/// Last observation of one cumulative counter series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterState {
    /// Observation time in nanoseconds
    pub timestamp: u64,
    /// Cumulative value at that time
    pub value: NumberValue,
}

/// What the engine did with an observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateOutcome {
    /// No prior point; stored as the baseline.
    First,
    /// Not newer than the stored point; dropped, store untouched.
    Stale,
    /// Value went down; stored as the new baseline.
    Reset,
    /// Per-second rate since the previous point.
    Rate(f64),
}

impl RateOutcome {
    /// The emitted rate, if any
    pub fn rate(self) -> Option<f64> {
        match self {
            RateOutcome::Rate(rate) => Some(rate),
            _ => None,
        }
    }
}

/// Shared previous-point memory used to turn counters into rates.
#[derive(Debug, Clone)]
pub struct RateEngine {
    prev_pts: Arc<TtlMap<SeriesKey, CounterState>>,
}

impl RateEngine {
    /// Creates an engine over an existing store.
    pub fn new(prev_pts: Arc<TtlMap<SeriesKey, CounterState>>) -> Self {
        Self { prev_pts }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<TtlMap<SeriesKey, CounterState>> {
        &self.prev_pts
    }

    /// Records an observation and reports what happened to it.
    pub fn observe(&self, key: &SeriesKey, timestamp: u64, value: NumberValue) -> RateOutcome {
        let current = CounterState { timestamp, value };
        let outcome = self.prev_pts.compute(key.clone(), |prev| match prev {
            None => (Some(current), RateOutcome::First),
            // Keep the most recent point in memory.
            Some(prev) if timestamp <= prev.timestamp => (None, RateOutcome::Stale),
            Some(prev) => {
                let dx = value.delta(prev.value);
                let dt = (timestamp - prev.timestamp) as f64 / NANOS_PER_SECOND;
                if dx < 0.0 {
                    (Some(current), RateOutcome::Reset)
                } else {
                    (Some(current), RateOutcome::Rate(dx / dt))
                }
            },
        });

        match outcome {
            RateOutcome::Reset => {
                tracing::debug!("Counter reset detected for series {}", key);
            },
            RateOutcome::Stale => {
                tracing::trace!("Dropping out-of-order point for series {}", key);
            },
            _ => {},
        }

        outcome
    }

    /// Records an observation and returns the rate, if one is due.
    pub fn compute_rate(&self, key: &SeriesKey, timestamp: u64, value: NumberValue) -> Option<f64> {
        self.observe(key, timestamp, value).rate()
    }
}
