//! The name index: `(kind, name)` to every declaring node.

use std::fmt;

use indexmap::IndexMap;

use crate::model::NodeId;

/// Declaration kinds tracked by the [`NameIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclKind {
    Struct,
    Handler,
    /// Keyed by `"<method> <path>"`, method lowercased.
    Route,
    /// Keyed by the import path as written.
    Import,
}

impl DeclKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Struct => "struct",
            DeclKind::Handler => "handler",
            DeclKind::Route => "route",
            DeclKind::Import => "import",
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The index key of a route.
pub fn route_key(method: &str, path: &str) -> String {
    format!("{} {}", method.to_ascii_lowercase(), path)
}

/// Maps `(kind, name)` to the declaring nodes in source order.
///
/// Collisions append, they never overwrite: a name with more than one node
/// is a duplicate declaration.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: IndexMap<DeclKind, IndexMap<String, Vec<NodeId>>>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, kind: DeclKind, name: &str, node: NodeId) {
        self.entries
            .entry(kind)
            .or_default()
            .entry(name.to_string())
            .or_default()
            .push(node);
    }

    /// All nodes declaring `name` as `kind`; empty if there are none.
    pub fn lookup(&self, kind: DeclKind, name: &str) -> &[NodeId] {
        self.entries
            .get(&kind)
            .and_then(|names| names.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every entry of one kind, in first-declaration order.
    pub fn entries(&self, kind: DeclKind) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.entries
            .get(&kind)
            .into_iter()
            .flat_map(|names| names.iter())
            .map(|(name, nodes)| (name.as_str(), nodes.as_slice()))
    }

    /// Names of `kind` declared more than once. Empty names are skipped.
    pub fn duplicates(&self, kind: DeclKind) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.entries(kind)
            .filter(|(name, nodes)| !name.is_empty() && nodes.len() > 1)
    }

    /// Total number of distinct `(kind, name)` keys.
    pub fn len(&self) -> usize {
        self.entries.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
