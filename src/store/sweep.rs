//! Background Sweep Chain
//!
//! Lazy expiry on read keeps answers exact, but an entry that is never read
//! again would sit in memory forever. The sweep is the other half of the
//! design: every `resolution`, a deferred callback reclaims all buckets
//! whose time window has fully passed, then arms the next callback.
//!
//! ## The chain
//!
//! There is exactly one pending callback at a time. Each sweep, on
//! completion, schedules its successor, so consecutive sweeps can never
//! overlap. The callback only holds a weak reference to the store, and the
//! handle to the pending callback is kept so that shutdown (or dropping the
//! store) breaks the chain deterministically instead of leaving a timer to
//! fire into nothing.
//!
//! ## What a sweep may touch
//!
//! Only buckets strictly below `floor(now / resolution)`. Entries in the
//! current bucket survive even when individually past their expiry; reads
//! already handle those exactly.

use crate::schedule::ScheduledHandle;
use crate::store::engine::{bucket_id, Shared};
use std::hash::Hash;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// The pending sweep callback and the store's lifecycle state.
///
/// `closed` is one-way: once set, no sweep is ever armed again.
pub(crate) struct SweepControl {
    handle: Option<Box<dyn ScheduledHandle>>,
    closed: bool,
}

impl SweepControl {
    pub(crate) fn new() -> Self {
        Self {
            handle: None,
            closed: false,
        }
    }
}

/// Arms the next sweep, unless the store has been shut down.
pub(crate) fn arm<K, V>(shared: &Arc<Shared<K, V>>)
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    let mut control = shared.control.lock().unwrap();
    if control.closed {
        return;
    }

    let weak = Arc::downgrade(shared);
    let handle = shared.scheduler.after(
        shared.resolution,
        Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                run(&shared);
            }
        }),
    );
    control.handle = Some(handle);
}

/// One sweep: reclaim every fully completed bucket, then re-arm.
fn run<K, V>(shared: &Arc<Shared<K, V>>)
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    let removed = {
        let mut state = shared.state.lock().unwrap();
        let now = shared.clock.now();
        let current_bucket = bucket_id(now, shared.resolution);
        state.sweep_before(current_bucket)
    };

    shared.sweep_count.fetch_add(1, Ordering::Relaxed);
    if removed > 0 {
        shared.expired_swept.fetch_add(removed, Ordering::Relaxed);
        debug!(removed = removed, "sweep reclaimed expired entries");
    } else {
        trace!("sweep found nothing to reclaim");
    }

    arm(shared);
}

/// Cancels the pending sweep and closes the store. Idempotent.
pub(crate) fn shutdown<K, V>(shared: &Shared<K, V>) {
    let mut control = shared.control.lock().unwrap();
    if control.closed {
        return;
    }
    control.closed = true;
    if let Some(handle) = control.handle.take() {
        handle.cancel();
    }
    info!("ttl store shut down");
}
