//! Signal Implementation
//!
//! A Signal is a single-field reactive handle: it exposes one property,
//! `value`, whose reads return the live payload and whose writes replace it
//! and notify.
//!
//! # Property Access
//!
//! Most callers use the typed accessors [`Signal::value`] and
//! [`Signal::set_value`]. Hosts that address properties by name (bindings,
//! templates) go through [`Signal::get_property`] and
//! [`Signal::set_property`]. Only the name `value` is accepted there; any
//! other name is rejected with [`ReactiveError::InvalidProperty`] and
//! neither mutates nor notifies. This keeps a signal single-purpose.
//!
//! # Memory Layout
//!
//! A signal is one [`ReactiveCell`]; clones share it.

use std::fmt::{self, Debug};

use tracing::warn;

use super::cell::{CellId, ReactiveCell, Subscription};
use super::subscriber::Subscriber;
use crate::config::ReactiveConfig;
use crate::error::{ReactiveError, Result};

/// The only property a signal exposes.
pub const VALUE_PROPERTY: &str = "value";

/// A reactive handle exposing a single `value` property.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set_value(1).unwrap();
/// assert_eq!(count.value(), 1);
///
/// assert!(count.set_property("nonexistent", 5).is_err());
/// assert_eq!(count.value(), 1);
/// ```
pub struct Signal<T> {
    cell: ReactiveCell<T>,
}

impl<T> Signal<T>
where
    T: Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            cell: ReactiveCell::new(value),
        }
    }

    /// Create a new signal with an explicit configuration.
    pub fn with_config(value: T, config: &ReactiveConfig) -> Self {
        Self {
            cell: ReactiveCell::with_config(value, config),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> CellId {
        self.cell.id()
    }

    /// Read `value`. Never notifies.
    pub fn value(&self) -> T
    where
        T: Clone,
    {
        self.cell.get()
    }

    /// Read `value` by reference.
    pub fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    /// Write `value` and notify once, unconditionally.
    pub fn set_value(&self, value: T) -> Result<()> {
        self.cell.set(value)
    }

    /// Read a property by name. Only `value` exists.
    pub fn get_property(&self, property: &str) -> Result<T>
    where
        T: Clone,
    {
        if property != VALUE_PROPERTY {
            return Err(Self::rejected(property, "read"));
        }
        Ok(self.value())
    }

    /// Write a property by name. Only `value` exists.
    pub fn set_property(&self, property: &str, value: T) -> Result<()> {
        if property != VALUE_PROPERTY {
            return Err(Self::rejected(property, "write"));
        }
        self.set_value(value)
    }

    /// Register a subscriber that runs on every write.
    pub fn subscribe(&self, subscriber: &Subscriber) -> Subscription {
        self.cell.subscribe(subscriber)
    }

    /// Register a closure that runs on every write.
    pub fn subscribe_fn<F>(&self, notify: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.cell.subscribe_fn(notify)
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.cell.subscriber_count()
    }

    fn rejected(property: &str, op: &'static str) -> ReactiveError {
        warn!(property, op, "signal property access rejected");
        ReactiveError::InvalidProperty {
            property: property.to_string(),
        }
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signal").field(&self.cell).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
