//! Derived State
//!
//! DerivedState pairs a cell-backed value with an updater that accepts
//! either a literal replacement or a transform of the previous value.
//!
//! # Update Semantics
//!
//! Every `update` performs exactly one write and one subscriber pass.
//! There is no batching: three updates in one synchronous turn produce
//! three passes, and a transform always receives the value stored at call
//! time, so a burst of transforms each builds on the previous result.
//! Hosts that want batching add it above this layer.
//!
//! No equality filtering is applied; writing the current value notifies.

use std::fmt::{self, Debug};

use super::cell::{ReactiveCell, Subscription};
use super::subscriber::Subscriber;
use crate::config::ReactiveConfig;
use crate::error::Result;

/// What an update does to the stored value.
pub enum Action<T> {
    /// Store this value.
    Replace(T),

    /// Store the result of applying this function to the current value.
    Apply(Box<dyn FnOnce(&T) -> T>),
}

impl<T> Action<T> {
    /// Build a transform action.
    pub fn apply<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> T + 'static,
    {
        Self::Apply(Box::new(f))
    }

    fn resolve(self, current: &T) -> T {
        match self {
            Self::Replace(value) => value,
            Self::Apply(f) => f(current),
        }
    }
}

impl<T> From<T> for Action<T> {
    fn from(value: T) -> Self {
        Self::Replace(value)
    }
}

impl<T> Debug for Action<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            Self::Apply(_) => f.write_str("Apply(..)"),
        }
    }
}

/// A controlled value container backed by one [`ReactiveCell`].
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::{Action, DerivedState};
///
/// let count = DerivedState::new_with(|| 5);
/// count.update(Action::apply(|n| n + 1)).unwrap();
/// count.update(7).unwrap();
/// assert_eq!(count.get(), 7);
/// ```
pub struct DerivedState<T> {
    cell: ReactiveCell<T>,
}

impl<T> DerivedState<T>
where
    T: Send + Sync + 'static,
{
    /// Create a state holding `value`.
    pub fn new(value: T) -> Self {
        Self::from_cell(ReactiveCell::new(value))
    }

    /// Create a state holding `value` with an explicit configuration.
    pub fn with_config(value: T, config: &ReactiveConfig) -> Self {
        Self::from_cell(ReactiveCell::with_config(value, config))
    }

    /// Create a state whose value is produced by `init`.
    ///
    /// `init` runs exactly once, here.
    pub fn new_with<F>(init: F) -> Self
    where
        F: FnOnce() -> T,
    {
        Self::new(init())
    }

    /// Wrap an existing cell.
    pub fn from_cell(cell: ReactiveCell<T>) -> Self {
        Self { cell }
    }

    /// Get a clone of the last written value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.get()
    }

    /// Read the value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    /// Apply an action: one write, one subscriber pass.
    pub fn update(&self, action: impl Into<Action<T>>) -> Result<()> {
        let action = action.into();
        self.cell.update(move |current| action.resolve(current))
    }

    /// Store `value`.
    pub fn set(&self, value: T) -> Result<()> {
        self.cell.set(value)
    }

    /// Store `f(current)`.
    pub fn apply<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        self.cell.update(f)
    }

    /// Register a subscriber on the backing cell.
    pub fn subscribe(&self, subscriber: &Subscriber) -> Subscription {
        self.cell.subscribe(subscriber)
    }

    /// Register a closure on the backing cell.
    pub fn subscribe_fn<F>(&self, notify: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.cell.subscribe_fn(notify)
    }

    /// The backing cell.
    pub fn cell(&self) -> &ReactiveCell<T> {
        &self.cell
    }

    /// Split into a reader and an updater sharing this state.
    pub fn split(&self) -> (ReadState<T>, WriteState<T>) {
        (
            ReadState {
                cell: self.cell.clone(),
            },
            WriteState {
                cell: self.cell.clone(),
            },
        )
    }
}

impl DerivedState<bool> {
    /// Flip the stored flag.
    pub fn toggle(&self) -> Result<()> {
        self.apply(|on| !on)
    }
}

impl<T> Clone for DerivedState<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T> Debug for DerivedState<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DerivedState").field(&self.cell).finish()
    }
}

/// Read half of a [`DerivedState`].
pub struct ReadState<T> {
    cell: ReactiveCell<T>,
}

impl<T> ReadState<T>
where
    T: Send + Sync + 'static,
{
    /// Get a clone of the last written value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.get()
    }

    /// Read the value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }
}

impl<T> Clone for ReadState<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

/// Update half of a [`DerivedState`].
pub struct WriteState<T> {
    cell: ReactiveCell<T>,
}

impl<T> WriteState<T>
where
    T: Send + Sync + 'static,
{
    /// Apply an action: one write, one subscriber pass.
    pub fn update(&self, action: impl Into<Action<T>>) -> Result<()> {
        let action = action.into();
        self.cell.update(move |current| action.resolve(current))
    }
}

impl<T> Clone for WriteState<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}
