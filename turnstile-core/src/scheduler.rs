//! One-shot unlock timers.
//!
//! When an account locks, the service arms a timer here. After the lockout
//! period the timer runs its callback, which clears the lock. Timers cannot be
//! cancelled: once armed, a timer always fires after its full delay.
//!
//! Two implementations are provided:
//!
//! - [`TokioUnlockScheduler`] spawns one task per lock on a Tokio runtime.
//! - [`ManualUnlockScheduler`] keeps timers in a queue and fires them when the
//!   test advances its [`ManualClock`].
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashSet;
use tokio::runtime::Handle;

use crate::{
    UserId,
    clock::{Clock, ManualClock},
};

/// Work to run when a timer expires.
pub type UnlockCallback = Box<dyn FnOnce() + Send + 'static>;

/// Arms one-shot timers keyed by account id.
pub trait UnlockScheduler: Send + Sync + 'static {
    /// Run `on_expire` once after `delay`.
    ///
    /// At most one timer may be pending per id. If one already is, the new
    /// callback is dropped without running and `false` is returned.
    fn schedule(&self, user_id: &UserId, delay: Duration, on_expire: UnlockCallback) -> bool;

    /// Whether a timer is armed for `user_id` and has not fired yet.
    fn is_pending(&self, user_id: &UserId) -> bool;

    /// Number of timers armed and not yet fired.
    fn pending_count(&self) -> usize;
}

/// Scheduler backed by Tokio timers.
///
/// Each armed timer is a spawned task that sleeps for the delay, clears its
/// pending mark and then runs the callback. Under a paused Tokio clock the
/// tasks follow `tokio::time::advance`.
#[derive(Clone)]
pub struct TokioUnlockScheduler {
    handle: Handle,
    pending: Arc<DashSet<UserId>>,
}

impl std::fmt::Debug for TokioUnlockScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioUnlockScheduler")
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl TokioUnlockScheduler {
    /// Create a scheduler that spawns its timers on `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            pending: Arc::new(DashSet::new()),
        }
    }

    /// Create a scheduler bound to the runtime the caller is running on.
    ///
    /// Returns `None` outside of a Tokio runtime.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl UnlockScheduler for TokioUnlockScheduler {
    fn schedule(&self, user_id: &UserId, delay: Duration, on_expire: UnlockCallback) -> bool {
        if !self.pending.insert(user_id.clone()) {
            tracing::warn!(user_id = %user_id, "Unlock timer already pending, ignoring");
            return false;
        }

        let pending = Arc::clone(&self.pending);
        let user_id = user_id.clone();
        let delay = delay.to_std().unwrap_or_default();

        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            // Clear the mark first so the callback may re-arm.
            pending.remove(&user_id);
            on_expire();
        });

        true
    }

    fn is_pending(&self, user_id: &UserId) -> bool {
        self.pending.contains(user_id)
    }

    fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

struct ManualTimer {
    deadline: DateTime<Utc>,
    seq: u64,
    user_id: UserId,
    on_expire: UnlockCallback,
}

#[derive(Default)]
struct ManualQueue {
    next_seq: u64,
    timers: Vec<ManualTimer>,
}

/// Deterministic scheduler driven by a [`ManualClock`].
///
/// Nothing fires until [`advance`](Self::advance) is called. Due timers fire in deadline order, with the clock set to each
/// timer's deadline while its callback runs.
#[derive(Clone)]
pub struct ManualUnlockScheduler {
    clock: ManualClock,
    queue: Arc<Mutex<ManualQueue>>,
}

impl ManualUnlockScheduler {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            queue: Arc::new(Mutex::new(ManualQueue::default())),
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Move the clock forward by `by`, firing every timer that falls due.
    ///
    /// Returns the number of timers fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.now() + by;
        let mut fired = 0;

        while let Some(timer) = self.pop_due(target) {
            if timer.deadline > self.clock.now() {
                self.clock.set(timer.deadline);
            }
            (timer.on_expire)();
            fired += 1;
        }

        self.clock.set(target);
        fired
    }

    fn pop_due(&self, until: DateTime<Utc>) -> Option<ManualTimer> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let index = queue
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= until)
            .min_by_key(|(_, t)| (t.deadline, t.seq))
            .map(|(i, _)| i)?;
        Some(queue.timers.swap_remove(index))
    }
}

impl UnlockScheduler for ManualUnlockScheduler {
    fn schedule(&self, user_id: &UserId, delay: Duration, on_expire: UnlockCallback) -> bool {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.timers.iter().any(|t| &t.user_id == user_id) {
            tracing::warn!(user_id = %user_id, "Unlock timer already pending, ignoring");
            return false;
        }

        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.timers.push(ManualTimer {
            deadline: self.clock.now() + delay.max(Duration::zero()),
            seq,
            user_id: user_id.clone(),
            on_expire,
        });
        true
    }

    fn is_pending(&self, user_id: &UserId) -> bool {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.timers.iter().any(|t| &t.user_id == user_id)
    }

    fn pending_count(&self) -> usize {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_callback(counter: &Arc<AtomicUsize>) -> UnlockCallback {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_manual_fires_after_full_delay() {
        let scheduler = ManualUnlockScheduler::new(ManualClock::default());
        let fired = Arc::new(AtomicUsize::new(0));
        let id = UserId::new("u1");

        assert!(scheduler.schedule(&id, Duration::seconds(60), counter_callback(&fired)));
        assert!(scheduler.is_pending(&id));

        assert_eq!(scheduler.advance(Duration::seconds(59)), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(scheduler.is_pending(&id));

        assert_eq!(scheduler.advance(Duration::seconds(1)), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending(&id));

        // Exactly once
        assert_eq!(scheduler.advance(Duration::seconds(600)), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_rejects_double_arming() {
        let scheduler = ManualUnlockScheduler::new(ManualClock::default());
        let fired = Arc::new(AtomicUsize::new(0));
        let id = UserId::new("u1");

        assert!(scheduler.schedule(&id, Duration::seconds(60), counter_callback(&fired)));
        assert!(!scheduler.schedule(&id, Duration::seconds(10), counter_callback(&fired)));
        assert_eq!(scheduler.pending_count(), 1);

        // The second timer never existed, so nothing fires early
        scheduler.advance(Duration::seconds(30));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        scheduler.advance(Duration::seconds(30));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_fires_in_deadline_order_at_deadline_time() {
        let clock = ManualClock::default();
        let start = clock.now();
        let scheduler = ManualUnlockScheduler::new(clock.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));

        for (name, secs) in [("late", 30), ("early", 10)] {
            let seen = Arc::clone(&seen);
            let clock = clock.clone();
            scheduler.schedule(
                &UserId::new(name),
                Duration::seconds(secs),
                Box::new(move || {
                    seen.lock().unwrap().push((name, clock.now() - start));
                }),
            );
        }

        assert_eq!(scheduler.advance(Duration::seconds(45)), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("early", Duration::seconds(10)),
                ("late", Duration::seconds(30))
            ]
        );
        assert_eq!(clock.now(), start + Duration::seconds(45));
    }

    #[test]
    fn test_manual_callback_may_rearm() {
        let scheduler = ManualUnlockScheduler::new(ManualClock::default());
        let id = UserId::new("u1");
        let fired = Arc::new(AtomicUsize::new(0));

        let inner = scheduler.clone();
        let rearm_id = id.clone();
        let rearm_counter = Arc::clone(&fired);
        scheduler.schedule(
            &id,
            Duration::seconds(5),
            Box::new(move || {
                assert!(inner.schedule(
                    &rearm_id,
                    Duration::seconds(5),
                    counter_callback(&rearm_counter)
                ));
            }),
        );

        scheduler.advance(Duration::seconds(5));
        assert!(scheduler.is_pending(&id));
        scheduler.advance(Duration::seconds(5));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_fires_after_delay() {
        let scheduler = TokioUnlockScheduler::current().expect("inside a runtime");
        let fired = Arc::new(AtomicUsize::new(0));
        let id = UserId::new("u1");

        assert!(scheduler.schedule(&id, Duration::seconds(60), counter_callback(&fired)));
        assert!(!scheduler.schedule(&id, Duration::seconds(60), counter_callback(&fired)));
        assert_eq!(scheduler.pending_count(), 1);

        tokio::time::sleep(std::time::Duration::from_secs(59)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(scheduler.is_pending(&id));

        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_independent_ids() {
        let scheduler = TokioUnlockScheduler::current().expect("inside a runtime");
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(
            &UserId::new("a"),
            Duration::seconds(10),
            counter_callback(&fired),
        );
        scheduler.schedule(
            &UserId::new("b"),
            Duration::seconds(20),
            counter_callback(&fired),
        );
        assert_eq!(scheduler.pending_count(), 2);

        tokio::time::sleep(std::time::Duration::from_secs(15)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(scheduler.is_pending(&UserId::new("b")));

        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_tokio_scheduler_requires_runtime() {
        assert!(TokioUnlockScheduler::current().is_none());
    }
}
