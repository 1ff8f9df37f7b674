//! Shared counters updated by pipeline workers
//!
//! The pipeline's only shared mutable state. Workers receive an
//! `Arc<Counters>` at construction and only ever add to it; the statistics
//! reporter and the introspection endpoint take snapshots.
//!
//! # Example
//!
//! ```
//! use indexbench_core::metrics::Counters;
//!
//! let counters = Counters::new();
//! counters.add_items(100);
//! counters.add_bytes(4096);
//!
//! let snapshot = counters.snapshot();
//! assert_eq!(snapshot.items_processed, 100);
//! assert_eq!(snapshot.bytes_processed, 4096);
//! ```

pub mod counters;

pub use counters::{CounterSnapshot, Counters, LatencySample};
