use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for node and edge IDs — fast comparisons, low memory.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Monotonic counter backing generated node IDs.
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// A lightweight, interned identifier for nodes on the canvas.
/// Internally a `Spur` index — 4 bytes, Copy, Eq, Hash in O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Spur);

impl NodeId {
    /// Intern a string as a NodeId, or return existing if already interned.
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// Look up an already-interned ID. Unlike `intern`, an unknown string
    /// is not added to the interner.
    pub fn lookup(s: &str) -> Option<Self> {
        INTERNER.get(s).map(NodeId)
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Whether this ID can name a node in a graph (it must not contain
    /// the edge separator).
    pub fn is_valid_node_id(&self) -> bool {
        !self.as_str().contains(EDGE_SEPARATOR)
    }

    /// Generate a fresh ID with a kind prefix (e.g. `process_3`, `output_4`).
    ///
    /// The counter is process-wide, so two calls never return the same ID.
    /// Callers that also seed explicit IDs must still check for collisions.
    pub fn with_prefix(prefix: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{prefix}_{n}"))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeId::intern(&s))
    }
}

/// Separator between the endpoints in an edge ID. Node IDs may not contain
/// it (see `FlowGraph::add_node`), which keeps `EdgeId::between` injective.
pub const EDGE_SEPARATOR: &str = "->";

/// Identifier of a directed edge. Derived from its endpoints, so the
/// same ordered pair always maps to the same ID.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(Spur);

impl EdgeId {
    /// The canonical ID for an edge `source -> target`.
    pub fn between(source: NodeId, target: NodeId) -> Self {
        EdgeId(INTERNER.get_or_intern(format!("{source}{EDGE_SEPARATOR}{target}")))
    }

    /// Look up an already-interned edge ID without growing the interner.
    pub fn lookup(s: &str) -> Option<Self> {
        INTERNER.get(s).map(EdgeId)
    }

    /// Intern an existing edge ID string (e.g. one handed back by the host).
    pub fn intern(s: &str) -> Self {
        EdgeId(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EdgeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EdgeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EdgeId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = NodeId::intern("olt_core");
        let b = NodeId::intern("olt_core");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "olt_core");
    }

    #[test]
    fn prefixed_ids_are_unique() {
        let a = NodeId::with_prefix("process");
        let b = NodeId::with_prefix("process");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("process_"));
    }

    #[test]
    fn edge_id_is_derived_from_ordered_pair() {
        let a = NodeId::intern("a");
        let b = NodeId::intern("b");
        assert_eq!(EdgeId::between(a, b), EdgeId::between(a, b));
        assert_ne!(EdgeId::between(a, b), EdgeId::between(b, a));
        assert_eq!(EdgeId::between(a, b).as_str(), "a->b");
    }

    #[test]
    fn lookup_does_not_intern() {
        assert_eq!(NodeId::lookup("id_never_seen_before"), None);
        assert_eq!(NodeId::lookup("id_never_seen_before"), None);
        let known = NodeId::intern("id_seen");
        assert_eq!(NodeId::lookup("id_seen"), Some(known));
        assert_eq!(EdgeId::lookup("id_seen->nowhere"), None);
    }

    #[test]
    fn separator_marks_invalid_node_ids() {
        assert!(NodeId::intern("olt").is_valid_node_id());
        assert!(NodeId::intern("a-b>c").is_valid_node_id());
        assert!(!NodeId::intern("b->c").is_valid_node_id());
    }
}
