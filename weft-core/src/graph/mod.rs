//! Object Graph
//!
//! This module implements the plain data model that deep reactive proxies
//! wrap, along with the traversals that keep that wrapping safe.
//!
//! # Overview
//!
//! The graph is made of:
//!
//! - Primitive values (null, booleans, numbers, strings)
//! - Nodes: shared objects and arrays, identified by [`NodeId`]
//!
//! Nodes are owned by whoever built them. A proxy is a view over a node and
//! never copies its storage.
//!
//! # Cycles
//!
//! Since nodes are shared, nothing stops a host from making a node refer to
//! itself. Traversals in [`walk`] keep a visited set keyed by node identity
//! and terminate on such graphs, which lets proxies refuse them up front.

mod node;
pub mod walk;

pub use node::{Key, NodeId, NodeKind, NodeRef, Value, MAX_ARRAY_PADDING};
