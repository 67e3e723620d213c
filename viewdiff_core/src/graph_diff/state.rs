use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Keys of one node split into the four diff categories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Categories {
    #[serde(skip_serializing_if = "IndexSet::is_empty")]
    pub unchanged: IndexSet<String>,
    #[serde(skip_serializing_if = "IndexSet::is_empty")]
    pub added: IndexSet<String>,
    #[serde(skip_serializing_if = "IndexSet::is_empty")]
    pub changed: IndexSet<String>,
    #[serde(skip_serializing_if = "IndexSet::is_empty")]
    pub removed: IndexSet<String>,
}

impl Categories {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.changed.is_empty() || !self.removed.is_empty()
    }

    /// Whether the key was matched on the other side, changed or not
    pub fn is_matched(&self, key: &str) -> bool {
        self.unchanged.contains(key) || self.changed.contains(key)
    }
}

/// Categories per node name
pub type CategoryMap = IndexMap<String, Categories>;

/// Accumulators of one compare run.
///
/// Node sets follow the order nodes were met in the input graphs. Link and
/// attribute maps exist once per side: `previous_*` is keyed by old node names,
/// `current_*` by new node names.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffState {
    pub added_nodes: IndexSet<String>,
    pub removed_nodes: IndexSet<String>,
    pub changed_nodes: IndexSet<String>,
    pub unchanged_nodes: IndexSet<String>,
    pub previous_links: CategoryMap,
    pub current_links: CategoryMap,
    pub previous_attributes: CategoryMap,
    pub current_attributes: CategoryMap,
}

impl DiffState {
    pub fn has_link_changes(&self) -> bool {
        self.previous_links
            .values()
            .chain(self.current_links.values())
            .any(Categories::has_changes)
    }

    pub fn count_keys(map: &CategoryMap, select: fn(&Categories) -> &IndexSet<String>) -> usize {
        map.values().map(|c| select(c).len()).sum()
    }
}
