//! Notifiers
//!
//! A notifier is how a primitive tells its host that something changed.
//! Notifiers are passed in explicitly at construction; there is no ambient
//! "current component" to reach for.
//!
//! [`RenderTrigger`] is the notifier a rendering host typically hands out:
//! a version counter held in a [`DerivedState`] that bumps on every
//! notification. The host subscribes to it and re-runs its computation.

use std::fmt::{self, Debug};
use std::sync::Arc;

use tracing::warn;

use super::cell::Subscription;
use super::state::DerivedState;
use super::subscriber::Subscriber;
use crate::config::ReactiveConfig;

/// Receives "something changed" signals.
pub trait Notifier: Send + Sync {
    /// Signal a change.
    fn notify(&self);
}

impl<F> Notifier for F
where
    F: Fn() + Send + Sync,
{
    fn notify(&self) {
        self()
    }
}

impl Notifier for Subscriber {
    fn notify(&self) {
        Subscriber::notify(self)
    }
}

/// Shared, type-erased notifier.
pub type SharedNotifier = Arc<dyn Notifier>;

/// Host render request counter.
///
/// Each `notify` increments the version by one, which runs the subscribers
/// registered with [`RenderTrigger::subscribe`].
#[derive(Clone)]
pub struct RenderTrigger {
    version: DerivedState<u64>,
}

impl RenderTrigger {
    /// Create a trigger at version zero.
    pub fn new() -> Self {
        Self::with_config(&ReactiveConfig::default())
    }

    /// Create a trigger with an explicit configuration.
    pub fn with_config(config: &ReactiveConfig) -> Self {
        Self {
            version: DerivedState::with_config(0, config),
        }
    }

    /// Number of render requests so far.
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    /// Run `notify` on every render request.
    pub fn subscribe<F>(&self, notify: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.version.subscribe_fn(notify)
    }

    /// This trigger as a shareable notifier.
    pub fn notifier(&self) -> SharedNotifier {
        Arc::new(self.clone())
    }

    /// This trigger as a subscriber, for registering on other cells.
    pub fn as_subscriber(&self) -> Subscriber {
        let trigger = self.clone();
        Subscriber::new(move || trigger.notify())
    }
}

impl Default for RenderTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for RenderTrigger {
    fn notify(&self) {
        if let Err(err) = self.version.apply(|v| v.wrapping_add(1)) {
            warn!(error = %err, "render request dropped");
        }
    }
}

impl Debug for RenderTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTrigger")
            .field("version", &self.version())
            .finish()
    }
}
