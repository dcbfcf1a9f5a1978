//! Graph Nodes
//!
//! This module defines the plain data that a deep reactive proxy wraps:
//! primitive [`Value`]s and shared object/array nodes ([`NodeRef`]).
//!
//! Nodes are reference counted and compared by identity. Cloning a
//! `NodeRef` (or a `Value` holding one) aliases the node, it never copies
//! its storage. Because nodes are shared, a host can build cyclic graphs;
//! see [`super::walk`] for detection.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::{ReactiveError, Result};

/// Most `Null` elements a single assignment may pad an array with.
pub const MAX_ARRAY_PADDING: usize = 1 << 16;

/// Unique identifier for a node in an object graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// The kind of node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// String-keyed properties in insertion order.
    Object,

    /// Index-addressed elements.
    Array,
}

impl NodeKind {
    /// Lowercase name, used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

/// A property key.
///
/// Objects accept both forms (an index addresses the property named by its
/// decimal string). Arrays accept indices and names that parse as one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(String),
    Index(usize),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A value stored in the graph.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Node(NodeRef),
}

impl Value {
    /// Build a graph from JSON. Every JSON object and array becomes a fresh node.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Node(NodeRef::array_from(items.into_iter().map(Self::from_json)))
            }
            serde_json::Value::Object(map) => Self::Node(NodeRef::object_from(
                map.into_iter().map(|(k, v)| (k, Self::from_json(v))),
            )),
        }
    }

    /// The node, if this value is one.
    pub fn as_node(&self) -> Option<&NodeRef> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// The number, if this value is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The flag, if this value is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Primitives compare by value, nodes by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Node(a), Self::Node(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<NodeRef> for Value {
    fn from(node: NodeRef) -> Self {
        Self::Node(node)
    }
}

#[derive(Debug)]
enum Storage {
    Object(IndexMap<String, Value>),
    Array(Vec<Value>),
}

struct NodeInner {
    id: NodeId,
    frozen: AtomicBool,
    storage: RwLock<Storage>,
}

/// Shared handle to an object or array node.
#[derive(Clone)]
pub struct NodeRef {
    inner: Arc<NodeInner>,
}

impl NodeRef {
    fn with_storage(storage: Storage) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                id: NodeId::new(),
                frozen: AtomicBool::new(false),
                storage: RwLock::new(storage),
            }),
        }
    }

    /// Create an empty object node.
    pub fn object() -> Self {
        Self::with_storage(Storage::Object(IndexMap::new()))
    }

    /// Create an empty array node.
    pub fn array() -> Self {
        Self::with_storage(Storage::Array(Vec::new()))
    }

    /// Create an object node from properties.
    pub fn object_from<K, I>(properties: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::with_storage(Storage::Object(
            properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Create an array node from elements.
    pub fn array_from<I>(elements: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self::with_storage(Storage::Array(elements.into_iter().collect()))
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Whether this node is an object or an array.
    pub fn kind(&self) -> NodeKind {
        match &*self.inner.storage.read() {
            Storage::Object(_) => NodeKind::Object,
            Storage::Array(_) => NodeKind::Array,
        }
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &NodeRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Look up a property or element.
    pub fn get(&self, key: &Key) -> Option<Value> {
        match &*self.inner.storage.read() {
            Storage::Object(props) => props.get(&object_key(key)).cloned(),
            Storage::Array(items) => array_index(key).and_then(|i| items.get(i).cloned()),
        }
    }

    /// Assign a property or element.
    ///
    /// Assigning past the end of an array pads it with `Null`, by at most
    /// [`MAX_ARRAY_PADDING`] elements; indices further out are rejected as
    /// [`ReactiveError::InvalidKey`].
    pub fn set(&self, key: Key, value: Value) -> Result<()> {
        if self.is_frozen() {
            return Err(ReactiveError::FrozenTarget {
                node: self.id().raw(),
                key: key.to_string(),
            });
        }

        match &mut *self.inner.storage.write() {
            Storage::Object(props) => {
                props.insert(object_key(&key), value);
            }
            Storage::Array(items) => {
                let invalid = || ReactiveError::InvalidKey {
                    key: key.to_string(),
                    kind: NodeKind::Array.as_str(),
                };
                let index = array_index(&key).ok_or_else(invalid)?;
                if index >= items.len() {
                    let new_len = index.checked_add(1).ok_or_else(invalid)?;
                    let growth = new_len - items.len();
                    if growth > MAX_ARRAY_PADDING + 1 {
                        return Err(invalid());
                    }
                    items.try_reserve(growth).map_err(|_| invalid())?;
                    items.resize(new_len, Value::Null);
                }
                items[index] = value;
            }
        }
        Ok(())
    }

    /// Delete a property. Array elements are cleared to `Null`, keeping length.
    pub fn remove(&self, key: &Key) -> Result<Option<Value>> {
        if self.is_frozen() {
            return Err(ReactiveError::FrozenTarget {
                node: self.id().raw(),
                key: key.to_string(),
            });
        }

        let removed = match &mut *self.inner.storage.write() {
            Storage::Object(props) => props.shift_remove(&object_key(key)),
            Storage::Array(items) => array_index(key)
                .and_then(|i| items.get_mut(i))
                .map(std::mem::take),
        };
        Ok(removed)
    }

    /// Refuse all further assignments and deletions.
    pub fn freeze(&self) {
        self.inner.frozen.store(true, Ordering::SeqCst);
    }

    /// Whether [`NodeRef::freeze`] has been called.
    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.load(Ordering::SeqCst)
    }

    /// Number of properties or elements.
    pub fn len(&self) -> usize {
        match &*self.inner.storage.read() {
            Storage::Object(props) => props.len(),
            Storage::Array(items) => items.len(),
        }
    }

    /// Whether the node has no properties or elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Property names (objects) or indices (arrays), in order.
    pub fn keys(&self) -> Vec<Key> {
        match &*self.inner.storage.read() {
            Storage::Object(props) => props.keys().cloned().map(Key::Name).collect(),
            Storage::Array(items) => (0..items.len()).map(Key::Index).collect(),
        }
    }

    /// Nodes directly referenced by this node.
    pub fn children(&self) -> Vec<NodeRef> {
        let storage = self.inner.storage.read();
        let values: Box<dyn Iterator<Item = &Value>> = match &*storage {
            Storage::Object(props) => Box::new(props.values()),
            Storage::Array(items) => Box::new(items.iter()),
        };
        let children = values.filter_map(|v| v.as_node().cloned()).collect();
        children
    }
}

impl fmt::Debug for NodeRef {
    // Shallow: graphs may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("len", &self.len())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

fn object_key(key: &Key) -> String {
    key.to_string()
}

fn array_index(key: &Key) -> Option<usize> {
    match key {
        Key::Index(index) => Some(*index),
        Key::Name(name) => name.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn object_get_set_remove() {
        let obj = NodeRef::object();
        obj.set("a".into(), Value::from(1)).unwrap();
        obj.set(Key::Index(0), Value::from("zero")).unwrap();

        assert_eq!(obj.get(&"a".into()), Some(Value::Number(1.0)));
        assert_eq!(obj.get(&"0".into()), Some(Value::from("zero")));
        assert_eq!(obj.keys(), vec![Key::from("a"), Key::from("0")]);

        assert_eq!(obj.remove(&"a".into()).unwrap(), Some(Value::Number(1.0)));
        assert_eq!(obj.get(&"a".into()), None);
        assert_eq!(obj.len(), 1);
    }

    #[test]
    fn array_assignment_pads_with_null() {
        let arr = NodeRef::array();
        arr.set(Key::Index(2), Value::from(true)).unwrap();

        assert_eq!(arr.len(), 3);
        assert_eq!(arr.get(&Key::Index(0)), Some(Value::Null));
        assert_eq!(arr.get(&"2".into()), Some(Value::Bool(true)));
    }

    #[test]
    fn array_rejects_named_keys() {
        let arr = NodeRef::array();
        let err = arr.set("length".into(), Value::from(1)).unwrap_err();
        assert!(matches!(err, ReactiveError::InvalidKey { kind: "array", .. }));
        assert_eq!(arr.get(&"length".into()), None);
    }

    #[test]
    fn array_rejects_indices_that_cannot_be_padded() {
        let arr = NodeRef::array_from([Value::from(1)]);

        for key in [
            Key::Index(usize::MAX),
            Key::from("18446744073709551615"),
            Key::Index(1 << 40),
            Key::Index(MAX_ARRAY_PADDING + 2),
        ] {
            let err = arr.set(key, Value::from(2)).unwrap_err();
            assert!(matches!(err, ReactiveError::InvalidKey { kind: "array", .. }));
        }
        assert_eq!(arr.len(), 1);

        arr.set(Key::Index(MAX_ARRAY_PADDING + 1), Value::from(3)).unwrap();
        assert_eq!(arr.len(), MAX_ARRAY_PADDING + 2);
    }

    #[test]
    fn array_remove_keeps_length() {
        let arr = NodeRef::array_from([Value::from(1), Value::from(2)]);
        assert_eq!(arr.remove(&Key::Index(0)).unwrap(), Some(Value::Number(1.0)));
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.get(&Key::Index(0)), Some(Value::Null));
    }

    #[test]
    fn frozen_node_rejects_writes() {
        let obj = NodeRef::object_from([("a", Value::from(1))]);
        obj.freeze();

        assert!(matches!(
            obj.set("a".into(), Value::from(2)),
            Err(ReactiveError::FrozenTarget { .. })
        ));
        assert!(obj.remove(&"a".into()).is_err());
        assert_eq!(obj.get(&"a".into()), Some(Value::Number(1.0)));
    }

    #[test]
    fn clones_alias_the_same_node() {
        let obj = NodeRef::object();
        let alias = obj.clone();
        alias.set("x".into(), Value::from(5)).unwrap();

        assert!(obj.ptr_eq(&alias));
        assert_eq!(obj.get(&"x".into()), Some(Value::Number(5.0)));
        assert_ne!(Value::Node(obj), Value::Node(NodeRef::object()));
    }

    #[test]
    fn from_json_builds_nested_nodes() {
        let root = Value::from_json(json!({ "a": { "b": 1 }, "list": [1, "two", null] }));
        let root = root.as_node().unwrap();

        assert_eq!(root.kind(), NodeKind::Object);
        assert_eq!(root.children().len(), 2);

        let a = root.get(&"a".into()).unwrap();
        assert_eq!(a.as_node().unwrap().get(&"b".into()), Some(Value::Number(1.0)));

        let list = root.get(&"list".into()).unwrap();
        let list = list.as_node().unwrap();
        assert_eq!(list.kind(), NodeKind::Array);
        assert_eq!(list.get(&Key::Index(1)).unwrap().as_str(), Some("two"));
    }
}
