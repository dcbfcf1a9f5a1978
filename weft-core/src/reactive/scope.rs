//! Hook Scope
//!
//! A HookScope is one logical binding site that a host re-invokes on every
//! render. Hooks called inside it return the primitive created at the first
//! render instead of building a new one, so state survives re-renders and
//! initializers run once.
//!
//! Hooks are matched to slots by call order, the same way React matches
//! them: call [`HookScope::begin_render`] at the start of each render, then
//! call the same hooks in the same order. Calling a different hook at a
//! position is reported as [`ReactiveError::HookOrder`].
//!
//! Every stateful slot is wired to the scope's [`RenderTrigger`], so any
//! write through a slot requests a re-render.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::notifier::RenderTrigger;
use super::proxy::DeepReactiveProxy;
use super::signal::Signal;
use super::state::DerivedState;
use crate::config::ReactiveConfig;
use crate::error::{ReactiveError, Result};
use crate::graph::NodeRef;

type Slot = Arc<dyn Any + Send + Sync>;

/// Render-persistent storage for hooks.
pub struct HookScope {
    trigger: RenderTrigger,
    slots: Mutex<Vec<Slot>>,
    cursor: AtomicUsize,
    config: ReactiveConfig,
}

impl HookScope {
    /// Create a scope with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ReactiveConfig::default())
    }

    /// Create a scope whose primitives use `config`.
    pub fn with_config(config: ReactiveConfig) -> Self {
        Self {
            trigger: RenderTrigger::with_config(&config),
            slots: Mutex::new(Vec::new()),
            cursor: AtomicUsize::new(0),
            config,
        }
    }

    /// The trigger bumped whenever a slot changes.
    pub fn trigger(&self) -> &RenderTrigger {
        &self.trigger
    }

    /// Rewind the hook cursor. Call at the start of every render.
    pub fn begin_render(&self) {
        let previous = self.cursor.swap(0, Ordering::SeqCst);
        trace!(hooks = previous, "render started");
    }

    /// Number of slots created so far.
    pub fn slot_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// State that persists across renders. `initial` is only used at the
    /// first render.
    pub fn use_state<T>(&self, initial: T) -> Result<DerivedState<T>>
    where
        T: Send + Sync + 'static,
    {
        self.use_state_with(move || initial)
    }

    /// Like [`HookScope::use_state`], but the initial value is produced by
    /// `init`, which runs at the first render only.
    pub fn use_state_with<T, F>(&self, init: F) -> Result<DerivedState<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let slot = self.slot(|| {
            let state = DerivedState::with_config(init(), &self.config);
            state.subscribe(&self.trigger.as_subscriber()).forget();
            Ok(state)
        })?;
        Ok(DerivedState::clone(&slot))
    }

    /// A boolean state with a `toggle` updater.
    pub fn use_toggle(&self, initial: bool) -> Result<DerivedState<bool>> {
        self.use_state(initial)
    }

    /// A signal that persists across renders.
    pub fn use_signal<T>(&self, initial: T) -> Result<Signal<T>>
    where
        T: Send + Sync + 'static,
    {
        let slot = self.slot(|| {
            let signal = Signal::with_config(initial, &self.config);
            signal.subscribe(&self.trigger.as_subscriber()).forget();
            Ok(signal)
        })?;
        Ok(Signal::clone(&slot))
    }

    /// A deep proxy over the node produced by `root`, created at the first
    /// render and notifying this scope's trigger.
    pub fn use_proxy<F>(&self, root: F) -> Result<DeepReactiveProxy>
    where
        F: FnOnce() -> NodeRef,
    {
        let slot = self.slot(|| {
            DeepReactiveProxy::with_config(root(), self.trigger.notifier(), &self.config)
        })?;
        Ok(DeepReactiveProxy::clone(&slot))
    }

    /// The value passed to this hook at the previous render, if any.
    pub fn use_previous<T>(&self, value: T) -> Result<Option<T>>
    where
        T: Send + Sync + 'static,
    {
        let slot = self.slot(|| Ok(Mutex::new(None::<T>)))?;
        let previous = slot.lock().replace(value);
        Ok(previous)
    }

    fn slot<S, F>(&self, init: F) -> Result<Arc<S>>
    where
        S: Send + Sync + 'static,
        F: FnOnce() -> Result<S>,
    {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);

        let existing = self.slots.lock().get(index).cloned();
        if let Some(existing) = existing {
            return existing
                .downcast::<S>()
                .map_err(|_| ReactiveError::HookOrder { index });
        }

        let created = Arc::new(init()?);

        let mut slots = self.slots.lock();
        if slots.len() != index {
            return Err(ReactiveError::HookOrder { index });
        }
        slots.push(created.clone());
        debug!(index, "hook slot created");

        Ok(created)
    }
}

impl Default for HookScope {
    fn default() -> Self {
        Self::new()
    }
}
