//! Store Module
//!
//! The bucketed TTL store and its background sweep.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        TtlStore                            │
//! │   one Mutex over { entry map, bucket index } per store     │
//! └────────────────────────────────────────────────────────────┘
//!                              ▲
//!                              │ reclaim completed buckets
//!               ┌──────────────┴──────────────┐
//!               │        sweep chain          │
//!               │ (one pending callback at a  │
//!               │  time, re-armed after each  │
//!               │  run, canceled on shutdown) │
//!               └─────────────────────────────┘
//! ```
//!
//! ## Expiration model
//!
//! - **Lazy**: a read that finds an entry past its expiry discards it and
//!   reports the key absent. Authoritative and exact.
//! - **Eager**: the sweep batch-reclaims whole buckets that are guaranteed
//!   fully expired. Amortized O(1) per entry, bounds memory for keys that
//!   are never read again.
//!
//! Both halves are load-bearing; neither alone is sufficient.

pub mod engine;
mod sweep;

// Re-export commonly used types
pub use engine::{TtlStore, TtlStoreStats};
