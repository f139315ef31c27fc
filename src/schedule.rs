//! Deferred-Callback Scheduler Abstraction
//!
//! The store does not own a timer. It hands the sweep callback to a
//! [`Scheduler`], which promises to invoke it no earlier than the requested
//! delay and to let the caller cancel it via the returned handle. That is
//! the whole contract; everything else about the host's event loop is
//! opaque to the store.
//!
//! Two implementations are provided:
//!
//! - [`TokioScheduler`]: the production scheduler. Each deferred callback is
//!   an abortable tokio task that sleeps for the delay and then runs.
//! - [`ManualScheduler`]: a virtual-time queue for tests. Nothing fires
//!   until [`advance`](ManualScheduler::advance) is called, and due
//!   callbacks then fire in deadline order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::AbortHandle;

/// The deferred callback type accepted by [`Scheduler::after`].
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Runs a callback after a delay, returning a cancelable handle.
pub trait Scheduler: Send + Sync + 'static {
    /// Schedules `callback` to run no earlier than `delay` from now.
    ///
    /// The callback runs at most once. Dropping the returned handle does
    /// not cancel the callback; only [`ScheduledHandle::cancel`] does.
    fn after(&self, delay: Duration, callback: Callback) -> Box<dyn ScheduledHandle>;
}

/// A cancelable reference to a scheduled callback.
pub trait ScheduledHandle: Send {
    /// Prevents a not-yet-fired callback from running.
    ///
    /// Calling this on an already-fired or already-canceled callback is a
    /// no-op.
    fn cancel(&self);
}

/// The production scheduler, backed by the tokio runtime.
///
/// The runtime handle is captured at construction, so callbacks can be
/// scheduled from any thread afterwards.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: tokio::runtime::Handle,
}

impl TokioScheduler {
    /// Creates a scheduler on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime context.
    pub fn new() -> Self {
        let runtime = tokio::runtime::Handle::try_current().unwrap_or_else(|_| {
            panic!(
                "ttlkv::TokioScheduler requires a tokio runtime. \
                 Construct it from within a #[tokio::main] or #[tokio::test] \
                 context, or from code running on a tokio runtime."
            )
        });
        Self { runtime }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn after(&self, delay: Duration, callback: Callback) -> Box<dyn ScheduledHandle> {
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        Box::new(TokioHandle {
            abort: task.abort_handle(),
        })
    }
}

struct TokioHandle {
    abort: AbortHandle,
}

impl ScheduledHandle for TokioHandle {
    fn cancel(&self) {
        // Aborting a finished task is already a no-op.
        self.abort.abort();
    }
}

/// A scheduler driven by virtual time.
///
/// Callbacks are queued with a deadline and fire only when
/// [`advance`](ManualScheduler::advance) moves virtual time past them. A
/// callback that schedules another callback while firing (the store's sweep
/// chain does exactly this) is handled within the same `advance` call if its
/// deadline also falls inside the advanced window.
///
/// # Example
///
/// ```
/// use ttlkv::{ManualScheduler, Scheduler};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let scheduler = ManualScheduler::new();
/// let fired = Arc::new(AtomicBool::new(false));
///
/// let flag = Arc::clone(&fired);
/// scheduler.after(Duration::from_secs(5), Box::new(move || {
///     flag.store(true, Ordering::SeqCst);
/// }));
///
/// scheduler.advance(Duration::from_secs(4));
/// assert!(!fired.load(Ordering::SeqCst));
///
/// scheduler.advance(Duration::from_secs(1));
/// assert!(fired.load(Ordering::SeqCst));
/// ```
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<Queue>,
}

#[derive(Default)]
struct Queue {
    now: Duration,
    next_id: u64,
    tasks: Vec<Task>,
}

struct Task {
    id: u64,
    deadline: Duration,
    callback: Callback,
    canceled: Arc<AtomicBool>,
}

impl ManualScheduler {
    /// Creates an empty scheduler at virtual time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of scheduled, not-yet-canceled callbacks.
    pub fn pending(&self) -> usize {
        let mut queue = self.queue.lock().unwrap();
        queue
            .tasks
            .retain(|task| !task.canceled.load(Ordering::SeqCst));
        queue.tasks.len()
    }

    /// Moves virtual time forward by `by`, firing every due callback.
    ///
    /// Callbacks fire in deadline order (insertion order on ties). Virtual
    /// time steps through each deadline as it fires, so a callback that
    /// reschedules itself sees the time it actually fired at, not the end of
    /// the window.
    pub fn advance(&self, by: Duration) {
        let target = self.queue.lock().unwrap().now + by;

        loop {
            let task = {
                let mut queue = self.queue.lock().unwrap();
                queue
                    .tasks
                    .retain(|task| !task.canceled.load(Ordering::SeqCst));

                let due = queue
                    .tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, task)| task.deadline <= target)
                    .min_by_key(|(_, task)| (task.deadline, task.id))
                    .map(|(index, _)| index);

                match due {
                    Some(index) => {
                        let task = queue.tasks.swap_remove(index);
                        queue.now = queue.now.max(task.deadline);
                        task
                    }
                    None => {
                        queue.now = target;
                        break;
                    }
                }
            };

            // Invoked outside the lock: the callback is free to call
            // `after` again without deadlocking.
            if !task.canceled.load(Ordering::SeqCst) {
                (task.callback)();
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn after(&self, delay: Duration, callback: Callback) -> Box<dyn ScheduledHandle> {
        let canceled = Arc::new(AtomicBool::new(false));
        let mut queue = self.queue.lock().unwrap();
        let id = queue.next_id;
        queue.next_id += 1;
        let deadline = queue.now + delay;
        queue.tasks.push(Task {
            id,
            deadline,
            callback,
            canceled: Arc::clone(&canceled),
        });
        Box::new(ManualHandle { canceled })
    }
}

struct ManualHandle {
    canceled: Arc<AtomicBool>,
}

impl ScheduledHandle for ManualHandle {
    fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn test_manual_fires_only_when_due() {
        let scheduler = ManualScheduler::new();
        let fired = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&fired);
        scheduler.after(
            Duration::from_secs(10),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );

        scheduler.advance(Duration::from_secs(9));
        assert!(!fired.load(Ordering::SeqCst));

        scheduler.advance(Duration::from_secs(1));
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_manual_fires_in_deadline_order() {
        let scheduler = ManualScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (label, delay) in [(2u32, 20u64), (1, 10), (3, 30)] {
            let order = Arc::clone(&order);
            scheduler.after(
                Duration::from_secs(delay),
                Box::new(move || order.lock().unwrap().push(label)),
            );
        }

        scheduler.advance(Duration::from_secs(60));
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_manual_cancel_prevents_firing() {
        let scheduler = ManualScheduler::new();
        let fired = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&fired);
        let handle = scheduler.after(
            Duration::from_secs(5),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );

        handle.cancel();
        // Canceling twice is a no-op.
        handle.cancel();

        scheduler.advance(Duration::from_secs(10));
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_manual_reschedule_from_callback() {
        // A callback chain that re-arms itself every 10s should fire three
        // times inside a 30s window.
        let scheduler = Arc::new(ManualScheduler::new());
        let count = Arc::new(AtomicU64::new(0));

        fn arm(scheduler: &Arc<ManualScheduler>, count: &Arc<AtomicU64>) {
            let s = Arc::clone(scheduler);
            let c = Arc::clone(count);
            scheduler.after(
                Duration::from_secs(10),
                Box::new(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                    arm(&s, &c);
                }),
            );
        }

        arm(&scheduler, &count);
        scheduler.advance(Duration::from_secs(30));
        assert_eq!(count.load(Ordering::SeqCst), 3);
        // The fourth link of the chain is armed but not yet due.
        assert_eq!(scheduler.pending(), 1);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_fires() {
        let scheduler = TokioScheduler::new();
        let fired = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&fired);
        scheduler.after(
            Duration::from_millis(10),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_tokio_scheduler_cancel() {
        let scheduler = TokioScheduler::new();
        let fired = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&fired);
        let handle = scheduler.after(
            Duration::from_millis(50),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );

        handle.cancel();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
