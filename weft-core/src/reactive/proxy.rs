//! Deep Reactive Proxy
//!
//! A DeepReactiveProxy is a view over an object graph node that reports
//! every assignment, at any depth, to one notifier supplied by the host.
//!
//! # How Proxies Work
//!
//! 1. Reading a property that holds a nested node returns a proxy over that
//!    node. Wrapping is lazy: nested nodes are wrapped only when reached.
//!
//! 2. Every proxy reached from one root shares the root's notifier. There
//!    is no per-subtree granularity.
//!
//! 3. Assigning through any of them writes to the underlying node and then
//!    notifies exactly once. No equality check is made, and the notifier
//!    fires whether or not the node accepted the write; the returned result
//!    reports which.
//!
//! 4. Deleting is a pass-through and does not notify.
//!
//! # Identity
//!
//! With `stable_proxy_identity` enabled (the default), proxies reached from
//! one root are cached by node identity: while any handle to a wrapper is
//! alive, reaching the same node again returns that wrapper. Revisiting a
//! node therefore never allocates, which also keeps lazy access over a
//! cyclic graph finite.
//!
//! # Cycles
//!
//! With `reject_cyclic_graphs` enabled (the default), construction fails on
//! a root that reaches a cycle, and an assignment that would close one is
//! refused.

use std::fmt::{self, Debug};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use super::notifier::SharedNotifier;
use crate::config::ReactiveConfig;
use crate::error::{ReactiveError, Result};
use crate::graph::{walk, Key, NodeId, NodeKind, NodeRef, Value};

/// Result of reading a property through a proxy.
#[derive(Debug, Clone)]
pub enum Access {
    /// The property holds a node; here is its proxy.
    Node(DeepReactiveProxy),

    /// The property holds a primitive.
    Value(Value),

    /// No such property.
    Missing,
}

impl Access {
    /// The proxy, if the property held a node.
    pub fn into_node(self) -> Option<DeepReactiveProxy> {
        match self {
            Self::Node(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// The primitive, if the property held one.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The number, if the property held one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Value(value) => value.as_f64(),
            _ => None,
        }
    }

    /// Whether the property does not exist.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// State shared by every proxy reached from one root.
struct ProxyShared {
    notifier: SharedNotifier,
    wrappers: DashMap<NodeId, Weak<ProxyInner>>,
    stable_identity: bool,
    reject_cycles: bool,
}

struct ProxyInner {
    target: NodeRef,
    shared: Arc<ProxyShared>,
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        // Only clear the entry if no newer wrapper replaced it.
        self.shared
            .wrappers
            .remove_if(&self.target.id(), |_, weak| weak.strong_count() == 0);
    }
}

/// A notifying view over an object graph node.
///
/// Clones are the same wrapper.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use serde_json::json;
/// use weft_core::graph::Value;
/// use weft_core::reactive::DeepReactiveProxy;
///
/// let root = Value::from_json(json!({ "a": { "b": 1 } }));
/// let renders = Arc::new(AtomicUsize::new(0));
/// let counter = renders.clone();
///
/// let state = DeepReactiveProxy::new(
///     root.as_node().unwrap().clone(),
///     Arc::new(move || { counter.fetch_add(1, Ordering::SeqCst); }),
/// )
/// .unwrap();
///
/// let a = state.get("a").into_node().unwrap();
/// a.set("b", 2).unwrap();
///
/// assert_eq!(renders.load(Ordering::SeqCst), 1);
/// assert_eq!(state.at(["a", "b"]).as_f64(), Some(2.0));
/// ```
#[derive(Clone)]
pub struct DeepReactiveProxy {
    inner: Arc<ProxyInner>,
}

impl DeepReactiveProxy {
    /// Wrap `root` with the default configuration.
    pub fn new(root: NodeRef, notifier: SharedNotifier) -> Result<Self> {
        Self::with_config(root, notifier, &ReactiveConfig::default())
    }

    /// Wrap `root`.
    ///
    /// Fails with [`ReactiveError::CyclicGraph`] if cycle rejection is on
    /// and `root` reaches a cycle.
    pub fn with_config(
        root: NodeRef,
        notifier: SharedNotifier,
        config: &ReactiveConfig,
    ) -> Result<Self> {
        if config.reject_cyclic_graphs {
            walk::ensure_acyclic(&Value::Node(root.clone()))?;
        }

        let shared = Arc::new(ProxyShared {
            notifier,
            wrappers: DashMap::new(),
            stable_identity: config.stable_proxy_identity,
            reject_cycles: config.reject_cyclic_graphs,
        });

        debug!(root = root.id().raw(), "deep proxy created");
        Ok(Self::wrap_in(&shared, root))
    }

    /// Read a property.
    ///
    /// Nested nodes come back wrapped; primitives come back as they are.
    /// Reading never notifies.
    pub fn get(&self, key: impl Into<Key>) -> Access {
        match self.inner.target.get(&key.into()) {
            None => Access::Missing,
            Some(Value::Node(node)) => Access::Node(Self::wrap_in(&self.inner.shared, node)),
            Some(value) => Access::Value(value),
        }
    }

    /// Follow a path of keys from this node.
    pub fn at<I>(&self, path: I) -> Access
    where
        I: IntoIterator,
        I::Item: Into<Key>,
    {
        let mut current = Access::Node(self.clone());
        for key in path {
            current = match current {
                Access::Node(proxy) => proxy.get(key),
                _ => return Access::Missing,
            };
        }
        current
    }

    /// Assign a property and notify once.
    ///
    /// Assigning a proxy stores the node it wraps.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let outcome = self.assign(key.clone(), value.into());

        if let Err(err) = &outcome {
            warn!(node = self.id().raw(), %key, error = %err, "proxy assignment rejected");
        } else {
            trace!(node = self.id().raw(), %key, "proxy assignment");
        }

        self.inner.shared.notifier.notify();
        outcome
    }

    /// Delete a property. Does not notify.
    pub fn remove(&self, key: impl Into<Key>) -> Result<Option<Value>> {
        self.inner.target.remove(&key.into())
    }

    /// The wrapped node's ID.
    pub fn id(&self) -> NodeId {
        self.inner.target.id()
    }

    /// Whether the wrapped node is an object or an array.
    pub fn kind(&self) -> NodeKind {
        self.inner.target.kind()
    }

    /// The wrapped node. Writes through it bypass notification.
    pub fn target(&self) -> &NodeRef {
        &self.inner.target
    }

    /// Property names or indices of the wrapped node, in order.
    pub fn keys(&self) -> Vec<Key> {
        self.inner.target.keys()
    }

    /// Number of properties or elements of the wrapped node.
    pub fn len(&self) -> usize {
        self.inner.target.len()
    }

    /// Whether the wrapped node has no properties or elements.
    pub fn is_empty(&self) -> bool {
        self.inner.target.is_empty()
    }

    /// Whether both handles are the same wrapper.
    pub fn ptr_eq(&self, other: &DeepReactiveProxy) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn assign(&self, key: Key, value: Value) -> Result<()> {
        let target = &self.inner.target;

        if self.inner.shared.reject_cycles && value.as_node().is_some() {
            walk::ensure_acyclic(&value)?;
            if walk::reaches(&value, target.id()) {
                return Err(ReactiveError::CyclicGraph {
                    node: target.id().raw(),
                });
            }
        }

        target.set(key, value)
    }

    fn wrap_in(shared: &Arc<ProxyShared>, node: NodeRef) -> Self {
        let id = node.id();

        if shared.stable_identity {
            let cached = shared.wrappers.get(&id).and_then(|weak| weak.upgrade());
            if let Some(inner) = cached {
                trace!(node = id.raw(), "proxy cache hit");
                return Self { inner };
            }
        }

        let inner = Arc::new(ProxyInner {
            target: node,
            shared: Arc::clone(shared),
        });

        if shared.stable_identity {
            shared.wrappers.insert(id, Arc::downgrade(&inner));
        }

        Self { inner }
    }
}

impl From<DeepReactiveProxy> for Value {
    fn from(proxy: DeepReactiveProxy) -> Self {
        Value::Node(proxy.inner.target.clone())
    }
}

impl Debug for DeepReactiveProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepReactiveProxy")
            .field("target", &self.inner.target)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (Arc<AtomicUsize>, SharedNotifier) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let notifier: SharedNotifier = Arc::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, notifier)
    }

    fn node(json: serde_json::Value) -> NodeRef {
        match Value::from_json(json) {
            Value::Node(node) => node,
            other => panic!("expected a node, got {other:?}"),
        }
    }

    #[test]
    fn nested_mutation_notifies_root_once() {
        let (count, notifier) = counting();
        let proxy = DeepReactiveProxy::new(node(json!({ "a": { "b": 1 } })), notifier).unwrap();

        proxy.get("a").into_node().unwrap().set("b", 2).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(proxy.at(["a", "b"]).as_f64(), Some(2.0));
    }

    #[test]
    fn top_level_and_deep_writes_share_notifier() {
        let (count, notifier) = counting();
        let proxy = DeepReactiveProxy::new(
            node(json!({ "x": 0, "deep": { "er": { "est": 0 } } })),
            notifier,
        )
        .unwrap();

        proxy.set("x", 1).unwrap();
        proxy.at(["deep", "er"]).into_node().unwrap().set("est", 1).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reads_never_notify() {
        let (count, notifier) = counting();
        let proxy = DeepReactiveProxy::new(node(json!({ "a": { "b": 1 } })), notifier).unwrap();

        proxy.at(["a", "b"]);
        proxy.at(["a", "b"]);
        proxy.get("missing");

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn primitives_and_missing_properties() {
        let (_, notifier) = counting();
        let proxy =
            DeepReactiveProxy::new(node(json!({ "s": "text", "n": null })), notifier).unwrap();

        assert_eq!(proxy.get("s").into_value(), Some(Value::from("text")));
        assert_eq!(proxy.get("n").into_value(), Some(Value::Null));
        assert!(proxy.get("nope").is_missing());
        assert!(proxy.at(["s", "deeper"]).is_missing());
    }

    #[test]
    fn same_node_yields_same_wrapper() {
        let (_, notifier) = counting();
        let proxy = DeepReactiveProxy::new(node(json!({ "a": { "b": 1 } })), notifier).unwrap();

        let first = proxy.get("a").into_node().unwrap();
        let second = proxy.get("a").into_node().unwrap();
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn shared_node_under_two_paths_yields_same_wrapper() {
        let (_, notifier) = counting();
        let shared = NodeRef::object();
        let root = NodeRef::object_from([
            ("left", Value::Node(shared.clone())),
            ("right", Value::Node(shared)),
        ]);
        let proxy = DeepReactiveProxy::new(root, notifier).unwrap();

        let left = proxy.get("left").into_node().unwrap();
        let right = proxy.get("right").into_node().unwrap();
        assert!(left.ptr_eq(&right));
    }

    #[test]
    fn identity_cache_can_be_disabled() {
        let (count, notifier) = counting();
        let config = ReactiveConfig {
            stable_proxy_identity: false,
            ..ReactiveConfig::default()
        };
        let proxy =
            DeepReactiveProxy::with_config(node(json!({ "a": { "b": 1 } })), notifier, &config)
                .unwrap();

        let first = proxy.get("a").into_node().unwrap();
        let second = proxy.get("a").into_node().unwrap();
        assert!(!first.ptr_eq(&second));
        assert_eq!(first.id(), second.id());

        first.set("b", 5).unwrap();
        second.set("b", 6).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(proxy.at(["a", "b"]).as_f64(), Some(6.0));
    }

    #[test]
    fn released_wrappers_leave_the_cache() {
        let (_, notifier) = counting();
        let proxy = DeepReactiveProxy::new(node(json!({ "a": {} })), notifier).unwrap();

        let a_id = {
            let a = proxy.get("a").into_node().unwrap();
            assert!(proxy.inner.shared.wrappers.contains_key(&a.id()));
            a.id()
        };

        assert!(!proxy.inner.shared.wrappers.contains_key(&a_id));
        assert!(proxy.inner.shared.wrappers.contains_key(&proxy.id()));
    }

    #[test]
    fn proxy_writes_through_to_owner_storage() {
        let (_, notifier) = counting();
        let owned = node(json!({ "a": { "b": 1 } }));
        let proxy = DeepReactiveProxy::new(owned.clone(), notifier).unwrap();

        proxy.get("a").into_node().unwrap().set("b", 9).unwrap();

        let a = owned.get(&"a".into()).unwrap();
        assert_eq!(a.as_node().unwrap().get(&"b".into()), Some(Value::Number(9.0)));
        assert!(proxy.target().ptr_eq(&owned));
    }

    #[test]
    fn replaced_subtree_keeps_old_wrapper_on_old_node() {
        let (_, notifier) = counting();
        let proxy = DeepReactiveProxy::new(node(json!({ "a": { "b": 1 } })), notifier).unwrap();

        let old = proxy.get("a").into_node().unwrap();
        proxy.set("a", NodeRef::object_from([("b", Value::from(2))])).unwrap();

        assert_eq!(old.get("b").as_f64(), Some(1.0));
        assert_eq!(proxy.at(["a", "b"]).as_f64(), Some(2.0));
        assert!(!old.ptr_eq(&proxy.get("a").into_node().unwrap()));
    }

    #[test]
    fn frozen_target_rejects_but_still_notifies() {
        let (count, notifier) = counting();
        let inner = NodeRef::object_from([("b", Value::from(1))]);
        inner.freeze();
        let root = NodeRef::object_from([("a", Value::Node(inner))]);
        let proxy = DeepReactiveProxy::new(root, notifier).unwrap();

        let err = proxy.get("a").into_node().unwrap().set("b", 2).unwrap_err();
        assert!(matches!(err, ReactiveError::FrozenTarget { .. }));
        assert_eq!(proxy.at(["a", "b"]).as_f64(), Some(1.0));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_passes_through_without_notifying() {
        let (count, notifier) = counting();
        let proxy = DeepReactiveProxy::new(node(json!({ "a": 1, "b": 2 })), notifier).unwrap();

        assert_eq!(proxy.remove("a").unwrap(), Some(Value::Number(1.0)));
        assert!(proxy.get("a").is_missing());
        assert_eq!(proxy.len(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arrays_are_wrapped_too() {
        let (count, notifier) = counting();
        let proxy =
            DeepReactiveProxy::new(node(json!({ "items": [{ "done": false }] })), notifier)
                .unwrap();

        let items = proxy.get("items").into_node().unwrap();
        assert_eq!(items.kind(), NodeKind::Array);

        items.at([0usize]).into_node().unwrap().set("done", true).unwrap();
        items.set(1usize, "new").unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(items.len(), 2);
        assert_eq!(
            proxy.at(["items".into(), Key::Index(0), "done".into()]).into_value(),
            Some(Value::Bool(true))
        );
    }

    #[test]
    fn unreachable_array_index_is_rejected_and_notifies() {
        let (count, notifier) = counting();
        let proxy = DeepReactiveProxy::new(node(json!({ "items": [] })), notifier).unwrap();
        let items = proxy.get("items").into_node().unwrap();

        let by_index = items.set(usize::MAX, 1).unwrap_err();
        let by_name = items.set("18446744073709551615", 1).unwrap_err();
        let too_far = items.set(1usize << 40, 1).unwrap_err();

        for err in [by_index, by_name, too_far] {
            assert!(matches!(err, ReactiveError::InvalidKey { kind: "array", .. }));
        }
        assert!(items.is_empty());
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cyclic_root_is_rejected() {
        let (_, notifier) = counting();
        let root = NodeRef::object();
        root.set("me".into(), Value::Node(root.clone())).unwrap();

        let err = DeepReactiveProxy::new(root, notifier).unwrap_err();
        assert!(matches!(err, ReactiveError::CyclicGraph { .. }));
    }

    #[test]
    fn assignment_closing_a_cycle_is_rejected() {
        let (count, notifier) = counting();
        let proxy = DeepReactiveProxy::new(node(json!({ "a": { "b": {} } })), notifier).unwrap();

        let b = proxy.at(["a", "b"]).into_node().unwrap();
        let err = b.set("back", proxy.clone()).unwrap_err();

        assert!(matches!(err, ReactiveError::CyclicGraph { .. }));
        assert!(b.get("back").is_missing());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cyclic_access_terminates_when_cycles_allowed() {
        let (_, notifier) = counting();
        let config = ReactiveConfig {
            reject_cyclic_graphs: false,
            ..ReactiveConfig::default()
        };
        let root = NodeRef::object();
        root.set("me".into(), Value::Node(root.clone())).unwrap();

        let proxy = DeepReactiveProxy::with_config(root, notifier, &config).unwrap();
        let again = proxy.at(["me", "me", "me"]).into_node().unwrap();
        assert!(again.ptr_eq(&proxy));
    }
}
