//! # ttlkv - An In-Memory Key-Value Store with Bucketed TTL Expiration
//!
//! ttlkv is an embedded, thread-safe key-value store in which every entry
//! carries an expiration time. Its core is a bucketed lazy-expiration
//! engine: entries are indexed by approximate expiry time so stale data can
//! be reclaimed in amortized O(1) per entry, while every read still observes
//! exact expiration semantics.
//!
//! ## Features
//!
//! - **Exact reads**: an entry past its expiry is invisible the moment it
//!   expires, whether or not the background sweep has run.
//! - **Bounded memory**: a periodic sweep batch-reclaims whole buckets of
//!   dead entries, so keys that are never read again do not accumulate.
//! - **Injected time**: the store reads a [`Clock`] and schedules through a
//!   [`Scheduler`], both supplied at construction. Production uses a
//!   monotonic clock and tokio; tests drive simulated time exactly.
//! - **One lock per store**: the entry map and the expiry index mutate as a
//!   single atomic unit. No global state; stores are independent.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                             ttlkv                                 │
//! │                                                                   │
//! │   get / setex / ttl / expire / remove                             │
//! │        │                                                          │
//! │        ▼                                                          │
//! │   ┌───────────────────────────────────────────────┐               │
//! │   │                 TtlStore                      │               │
//! │   │   Mutex ┌─────────────┬───────────────────┐   │               │
//! │   │         │ entry map   │ bucket index      │   │               │
//! │   │         │ K -> entry  │ bucket -> {K,...} │   │               │
//! │   │         └─────────────┴───────────────────┘   │               │
//! │   └───────────────────────────────────────────────┘               │
//! │        ▲                          ▲                               │
//! │        │ now()                    │ every `resolution`            │
//! │   ┌────┴─────┐             ┌──────┴────────┐                      │
//! │   │  Clock   │             │  Scheduler    │                      │
//! │   │ (inject) │             │ (sweep chain) │                      │
//! │   └──────────┘             └───────────────┘                      │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use ttlkv::{StoreConfig, TtlStore};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store: TtlStore<String, String> = TtlStore::with_config(
//!         StoreConfig::default().with_resolution(Duration::from_secs(1)),
//!     );
//!
//!     store
//!         .setex("session".into(), Duration::from_secs(60), "abc123".into())
//!         .unwrap();
//!
//!     assert_eq!(store.get(&"session".into()).unwrap(), "abc123");
//!     assert!(store.ttl(&"session".into()).is_some());
//!
//!     store.shutdown();
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`store`]: the TTL store and its background sweep
//! - [`time`]: the monotonic clock abstraction
//! - [`schedule`]: the deferred-callback scheduler abstraction
//! - [`config`]: store configuration
//! - [`error`]: the error taxonomy
//!
//! ## Design Highlights
//!
//! ### Lazy + Eager Expiry
//!
//! Entries are expired in two complementary ways:
//! 1. **Lazy**: when a key is accessed, its expiry is checked exactly.
//! 2. **Eager**: a self-rescheduling sweep reclaims every bucket whose time
//!    window has fully passed.
//!
//! The lazy check makes reads correct; the sweep makes memory bounded.
//!
//! ### Bucketed Index
//!
//! Every entry records `bucket = floor(expires_at / resolution)`. The sweep
//! never inspects individual expiry times: a bucket strictly below the
//! current one is dead by construction, so reclamation is one map removal
//! per bucket plus one per contained key. The recorded bucket id is always
//! read back when an entry is rewritten, never recomputed from other state.
//!
//! ### Deterministic Shutdown
//!
//! The handle to the pending sweep callback is kept and canceled on
//! [`TtlStore::shutdown`] (or drop), so the callback chain is broken
//! deterministically rather than left to fire into a dead store.

pub mod config;
pub mod error;
pub mod schedule;
pub mod store;
pub mod time;

// Re-export commonly used types for convenience
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use schedule::{Callback, ManualScheduler, ScheduledHandle, Scheduler, TokioScheduler};
pub use store::{TtlStore, TtlStoreStats};
pub use time::{Clock, ManualClock, MonotonicClock};

/// Version of ttlkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
