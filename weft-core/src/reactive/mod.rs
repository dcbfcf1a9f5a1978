//! Reactive Primitives
//!
//! This module implements the reactive kernel: cells, derived state,
//! signals and deep proxies. A host rendering system builds on these to
//! observe mutation of plain values and objects without wiring
//! subscriptions by hand.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`ReactiveCell`] is an observable slot. Every write replaces the
//! payload and runs each subscriber once, synchronously, in subscription
//! order.
//!
//! ## Derived State
//!
//! A [`DerivedState`] wraps a cell with an updater that accepts either a
//! replacement value or a transform of the current one. One update is one
//! write and one notification pass; nothing is batched.
//!
//! ## Signals
//!
//! A [`Signal`] exposes a single `value` property. Any other property name
//! is rejected.
//!
//! ## Deep Proxies
//!
//! A [`DeepReactiveProxy`] wraps an object graph node and reports every
//! assignment, at any depth, to one [`Notifier`].
//!
//! # Implementation Notes
//!
//! Notification is explicit: subscribers and notifiers are handed to the
//! primitive that will call them. There is no ambient tracking context.
//! The one piece of thread-local state is the notification stack used to
//! detect reentrant writes.

mod cell;
mod context;
mod notifier;
mod proxy;
mod scope;
mod signal;
mod state;
mod subscriber;

pub use cell::{CellId, ReactiveCell, Subscription};
pub use notifier::{Notifier, RenderTrigger, SharedNotifier};
pub use proxy::{Access, DeepReactiveProxy};
pub use scope::HookScope;
pub use signal::{Signal, VALUE_PROPERTY};
pub use state::{Action, DerivedState, ReadState, WriteState};
pub use subscriber::{Subscriber, SubscriberId};
