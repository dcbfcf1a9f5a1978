//! Reactive Cell
//!
//! A ReactiveCell is the leaf primitive of the kernel: an observable memory
//! slot with a set of subscribers. Every other primitive is built on it.
//!
//! # How Cells Work
//!
//! 1. A write replaces the payload. No equality check is made, so writing
//!    the value already stored still notifies.
//!
//! 2. The write then runs a subscriber pass: every subscriber runs once,
//!    synchronously, in subscription order, before the write returns.
//!
//! 3. A pass iterates a snapshot taken when it starts. Subscribers added
//!    during the pass wait for the next write. Subscribers removed during the
//!    pass are skipped when their turn comes, so a removed subscriber never
//!    fires.
//!
//! # Reentrancy
//!
//! A subscriber may write to the cell that is notifying it. What happens
//! then is decided by [`NotifyPolicy`]:
//!
//! - `Immediate`: the reentrant write runs a nested pass that completes
//!   before the outer pass resumes. Once `max_reentrant_depth` passes are
//!   nested the write is refused with [`ReactiveError::ReentrantWriteStorm`]
//!   and the payload is left untouched.
//! - `Queued`: the reentrant write stores its payload and defers its pass.
//!   The outermost write drains deferred passes one by one after its own
//!   pass, and reports a storm once more than `max_reentrant_depth` have
//!   been drained.
//!
//! # Thread Safety
//!
//! The payload sits behind a `RwLock` and the subscriber set behind a
//! `Mutex`; neither lock is held while subscribers run. Reentrancy tracking
//! is per thread, which matches the single render-thread model the kernel
//! is designed for.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::context::NotifyContext;
use super::subscriber::{Subscriber, SubscriberId};
use crate::config::{NotifyPolicy, ReactiveConfig};
use crate::error::{ReactiveError, Result};

/// Unique identifier for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    /// Generate a new unique cell ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscribers in registration order, keyed by identity.
type SubscriberSet = Mutex<IndexMap<SubscriberId, Subscriber>>;

struct CellInner<T> {
    value: RwLock<T>,
    subscribers: Arc<SubscriberSet>,
    /// Passes deferred by reentrant writes under the queued policy.
    pending: AtomicUsize,
    policy: NotifyPolicy,
    max_depth: usize,
}

/// An observable mutable slot.
///
/// Clones share the same payload and subscriber set.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::ReactiveCell;
///
/// let cell = ReactiveCell::new(0);
/// let _sub = cell.subscribe_fn(|| println!("changed"));
///
/// cell.set(5).unwrap(); // prints "changed"
/// assert_eq!(cell.get(), 5);
/// ```
pub struct ReactiveCell<T> {
    id: CellId,
    inner: Arc<CellInner<T>>,
}

impl<T> ReactiveCell<T>
where
    T: Send + Sync + 'static,
{
    /// Create a new cell with the default configuration.
    pub fn new(value: T) -> Self {
        Self::with_config(value, &ReactiveConfig::default())
    }

    /// Create a new cell using the reentrancy settings of `config`.
    pub fn with_config(value: T, config: &ReactiveConfig) -> Self {
        Self {
            id: CellId::new(),
            inner: Arc::new(CellInner {
                value: RwLock::new(value),
                subscribers: Arc::new(Mutex::new(IndexMap::new())),
                pending: AtomicUsize::new(0),
                policy: config.notify_policy,
                max_depth: config.max_reentrant_depth.max(1),
            }),
        }
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> CellId {
        self.id
    }

    /// Get a clone of the current payload.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.read().clone()
    }

    /// Read the payload by reference.
    ///
    /// The read lock is held while `f` runs, so `f` must not write this cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.value.read())
    }

    /// Replace the payload and notify every subscriber.
    pub fn set(&self, value: T) -> Result<()> {
        self.write_with(|_| value)
    }

    /// Replace the payload with `f(current)` and notify every subscriber.
    ///
    /// `f` sees the payload as it is at call time, including the results of
    /// earlier writes in the same synchronous burst.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        self.write_with(f)
    }

    /// Register a subscriber.
    ///
    /// Subscribing a subscriber that is already registered (or a clone of
    /// it) keeps the original registration and position. Either returned
    /// guard removes it.
    pub fn subscribe(&self, subscriber: &Subscriber) -> Subscription {
        let fresh = self
            .inner
            .subscribers
            .lock()
            .insert(subscriber.id(), subscriber.clone())
            .is_none();

        debug!(
            cell = self.id.raw(),
            subscriber = subscriber.id().raw(),
            fresh,
            "subscribed"
        );

        Subscription {
            subscriber: subscriber.id(),
            cell: self.id,
            set: Arc::downgrade(&self.inner.subscribers),
            armed: true,
        }
    }

    /// Register a closure as a new subscriber.
    pub fn subscribe_fn<F>(&self, notify: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(&Subscriber::new(notify))
    }

    /// Get the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    fn write_with<F>(&self, produce: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        let depth = NotifyContext::depth(self.id);

        if self.inner.policy == NotifyPolicy::Immediate && depth >= self.inner.max_depth {
            warn!(cell = self.id.raw(), depth, "reentrant write rejected");
            return Err(ReactiveError::ReentrantWriteStorm {
                cell: self.id.raw(),
                depth: depth + 1,
            });
        }

        let next = {
            let current = self.inner.value.read();
            produce(&*current)
        };
        *self.inner.value.write() = next;

        match self.inner.policy {
            NotifyPolicy::Immediate => {
                self.run_pass();
                Ok(())
            }
            NotifyPolicy::Queued if depth > 0 => {
                let pending = self.inner.pending.fetch_add(1, Ordering::SeqCst) + 1;
                trace!(cell = self.id.raw(), pending, "reentrant pass deferred");
                Ok(())
            }
            NotifyPolicy::Queued => self.drain(),
        }
    }

    /// Run the outer pass, then every pass deferred while it ran.
    fn drain(&self) -> Result<()> {
        self.run_pass();

        let mut drained = 0;
        while self.inner.pending.load(Ordering::SeqCst) > 0 {
            self.inner.pending.fetch_sub(1, Ordering::SeqCst);
            drained += 1;

            if drained > self.inner.max_depth {
                let dropped = self.inner.pending.swap(0, Ordering::SeqCst) + 1;
                warn!(cell = self.id.raw(), drained, dropped, "deferred passes abandoned");
                return Err(ReactiveError::ReentrantWriteStorm {
                    cell: self.id.raw(),
                    depth: drained,
                });
            }

            self.run_pass();
        }

        Ok(())
    }

    fn run_pass(&self) {
        let _ctx = NotifyContext::enter(self.id);

        let snapshot: SmallVec<[Subscriber; 8]> =
            self.inner.subscribers.lock().values().cloned().collect();

        trace!(cell = self.id.raw(), subscribers = snapshot.len(), "notifying");

        for subscriber in snapshot {
            // Removed since the pass started.
            if !self.inner.subscribers.lock().contains_key(&subscriber.id()) {
                continue;
            }
            subscriber.notify();
        }
    }
}

impl<T> Clone for ReactiveCell<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for ReactiveCell<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveCell")
            .field("id", &self.id)
            .field("value", &*self.inner.value.read())
            .field("subscriber_count", &self.inner.subscribers.lock().len())
            .finish()
    }
}

/// Capability to remove one subscriber from one cell.
///
/// Dropping the guard unsubscribes. Use [`Subscription::forget`] to keep the
/// subscriber registered for as long as the cell lives.
#[must_use = "dropping a Subscription unsubscribes immediately; call `forget` to keep it"]
pub struct Subscription {
    subscriber: SubscriberId,
    cell: CellId,
    set: Weak<SubscriberSet>,
    armed: bool,
}

impl Subscription {
    /// The subscriber this guard removes.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber
    }

    /// The cell the subscriber is registered on.
    pub fn cell_id(&self) -> CellId {
        self.cell
    }

    /// Whether the subscriber is still registered on a live cell.
    pub fn is_active(&self) -> bool {
        self.set
            .upgrade()
            .map(|set| set.lock().contains_key(&self.subscriber))
            .unwrap_or(false)
    }

    /// Remove the subscriber now.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    /// Keep the subscriber registered for the lifetime of the cell.
    pub fn forget(mut self) {
        self.armed = false;
    }

    fn detach(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        if let Some(set) = self.set.upgrade() {
            let removed = set.lock().shift_remove(&self.subscriber).is_some();
            debug!(
                cell = self.cell.raw(),
                subscriber = self.subscriber.raw(),
                removed,
                "unsubscribed"
            );
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber", &self.subscriber)
            .field("cell", &self.cell)
            .field("armed", &self.armed)
            .finish()
    }
}
