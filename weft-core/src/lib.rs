//! Weft Core
//!
//! This crate provides the reactive state kernel used by the Weft UI
//! runtime. It implements:
//!
//! - Reactive cells with synchronous, ordered subscriber notification
//! - Derived state with literal or functional updates
//! - Single-property signals
//! - Deep reactive proxies over shared object graphs
//! - Render-persistent hook slots for hosts that re-run a computation
//!
//! Rendering itself is done by an external host, which is told to re-run
//! its computation through a [`reactive::Notifier`].
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Reactive primitives and notification
//! - `graph`: The plain object graph that deep proxies wrap
//! - `config`: Behaviour at hazard points (reentrancy, cycles)
//! - `error`: The error type shared by every module
//!
//! # Example
//!
//! ```rust
//! use weft_core::reactive::{Action, DerivedState, ReactiveCell};
//!
//! // Create a cell and watch it
//! let cell = ReactiveCell::new(0);
//! let _sub = cell.subscribe_fn(|| println!("cell changed"));
//! cell.set(5).unwrap(); // prints "cell changed"
//!
//! // Derived state with a functional update
//! let count = DerivedState::new_with(|| 5);
//! count.update(Action::apply(|n| n + 1)).unwrap();
//! assert_eq!(count.get(), 6);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::{NotifyPolicy, ReactiveConfig};
pub use error::{ReactiveError, Result};
