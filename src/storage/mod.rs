//! State that outlives a single translation call.
//!
//! The only long-lived state is the memory of previous counter points,
//! kept in a [`TtlMap`] so that series which stop reporting are eventually
//! forgotten.

pub mod ttl_map;

pub use ttl_map::{SweeperHandle, TtlMap, TtlMapStats};
