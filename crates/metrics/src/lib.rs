//! Metric names for skald.
//!
//! Crates record through the `metrics` crate facade behind their own
//! `metrics` cargo feature. Installing an exporter is left to the host; with
//! no recorder installed every call is a no-op.
//!
//! # Usage
//!
//! ```rust,ignore
//! use skald_metrics::{counter, histogram, images};
//!
//! counter!(images::FETCHES_TOTAL).increment(1);
//! histogram!(images::FETCH_DURATION_SECONDS).record(0.123);
//! ```

mod definitions;

pub use definitions::*;

// Re-export metrics macros for convenience
pub use metrics::{counter, histogram};
