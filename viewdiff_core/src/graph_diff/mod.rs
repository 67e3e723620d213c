//! Structural diff of two attributed graphs.
//!
//! Nodes are matched by name and links by their `name` attribute. The result
//! holds the change classification and two annotated graphs: the previous
//! version with removed and changed elements, and the current version with
//! added, changed and removed elements plus the neighbours needed to place them.

mod annotated;
mod state;

pub use annotated::{combined_dot, AnnotatedEdge, AnnotatedGraph, AnnotatedNode, NodeId, PaintCategory};
pub use state::{Categories, CategoryMap, DiffState};

use indexmap::IndexSet;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use viewdiff_common::{Graph, GraphDiffConfig, Link, Node, PaintColors, Result, ViewDiffError};

/// Counts of one graph diff
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub added_nodes: usize,
    pub removed_nodes: usize,
    pub changed_nodes: usize,
    pub unchanged_nodes: usize,
    pub added_links: usize,
    pub removed_links: usize,
    pub changed_links: usize,
    pub removed_attributes: usize,
    pub diagnostics: usize,
}

/// Result of [`GraphDiffEngine::compare`]
#[derive(Debug, Clone)]
pub struct GraphDiff {
    state: DiffState,
    previous: AnnotatedGraph,
    current: AnnotatedGraph,
    diagnostics: Vec<String>,
}

impl GraphDiff {
    pub fn state(&self) -> &DiffState {
        &self.state
    }

    pub fn added_nodes(&self) -> &IndexSet<String> {
        &self.state.added_nodes
    }

    pub fn removed_nodes(&self) -> &IndexSet<String> {
        &self.state.removed_nodes
    }

    pub fn changed_nodes(&self) -> &IndexSet<String> {
        &self.state.changed_nodes
    }

    pub fn unchanged_nodes(&self) -> &IndexSet<String> {
        &self.state.unchanged_nodes
    }

    /// Link categories of an old node
    pub fn previous_links(&self, node: &str) -> Option<&Categories> {
        self.state.previous_links.get(node)
    }

    /// Link categories of a new node
    pub fn current_links(&self, node: &str) -> Option<&Categories> {
        self.state.current_links.get(node)
    }

    pub fn previous_attributes(&self, node: &str) -> Option<&Categories> {
        self.state.previous_attributes.get(node)
    }

    pub fn current_attributes(&self, node: &str) -> Option<&Categories> {
        self.state.current_attributes.get(node)
    }

    pub fn added_links(&self, node: &str) -> Vec<&str> {
        collect_keys(self.current_links(node), |c| &c.added)
    }

    pub fn removed_links(&self, node: &str) -> Vec<&str> {
        collect_keys(self.previous_links(node), |c| &c.removed)
    }

    pub fn changed_links(&self, node: &str) -> Vec<&str> {
        collect_keys(self.current_links(node), |c| &c.changed)
    }

    pub fn changed_attributes(&self, node: &str) -> Vec<&str> {
        collect_keys(self.current_attributes(node), |c| &c.changed)
    }

    pub fn removed_attributes(&self, node: &str) -> Vec<&str> {
        collect_keys(self.previous_attributes(node), |c| &c.removed)
    }

    pub fn previous(&self) -> &AnnotatedGraph {
        &self.previous
    }

    pub fn current(&self) -> &AnnotatedGraph {
        &self.current
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// True when no node, link or attribute was added, removed or changed
    pub fn is_empty(&self) -> bool {
        self.state.added_nodes.is_empty()
            && self.state.removed_nodes.is_empty()
            && self.state.changed_nodes.is_empty()
            && !self.state.has_link_changes()
            && DiffState::count_keys(&self.state.previous_attributes, |c| &c.removed) == 0
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            added_nodes: self.state.added_nodes.len(),
            removed_nodes: self.state.removed_nodes.len(),
            changed_nodes: self.state.changed_nodes.len(),
            unchanged_nodes: self.state.unchanged_nodes.len(),
            added_links: DiffState::count_keys(&self.state.current_links, |c| &c.added),
            removed_links: DiffState::count_keys(&self.state.previous_links, |c| &c.removed),
            changed_links: DiffState::count_keys(&self.state.current_links, |c| &c.changed),
            removed_attributes: DiffState::count_keys(&self.state.previous_attributes, |c| &c.removed),
            diagnostics: self.diagnostics.len(),
        }
    }

    /// Both annotated graphs as one DOT document
    pub fn to_dot(&self, colors: &PaintColors) -> String {
        combined_dot(&self.previous, &self.current, colors)
    }
}

fn collect_keys<'a>(
    categories: Option<&'a Categories>,
    select: fn(&Categories) -> &IndexSet<String>,
) -> Vec<&'a str> {
    categories
        .map(|c| select(c).iter().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Structural graph comparison
#[derive(Debug, Clone)]
pub struct GraphDiffEngine {
    context_completion: bool,
}

impl Default for GraphDiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphDiffEngine {
    pub fn new() -> Self {
        Self {
            context_completion: true,
        }
    }

    pub fn from_config(config: &GraphDiffConfig) -> Self {
        Self::new().with_context_completion(config.context_completion)
    }

    /// Copy unannotated links between nodes already present in an output graph
    pub fn with_context_completion(mut self, enabled: bool) -> Self {
        self.context_completion = enabled;
        self
    }

    /// Compare two graphs. Neither input is modified.
    ///
    /// Fails with [`ViewDiffError::MissingLinkName`] when a link has to be
    /// identified by name but carries no `name` attribute.
    pub fn compare(&self, old: &Graph, new: &Graph) -> Result<GraphDiff> {
        info!(
            "Comparing graph '{}' ({} nodes) with '{}' ({} nodes)",
            old.name,
            old.nodes.len(),
            new.name,
            new.nodes.len()
        );

        let mut run = DiffRun::new(old, new);
        run.detect_added_nodes();
        run.compare_attributes();
        run.materialize_removed_nodes();
        run.compare_links()?;
        run.include_added_node_links();
        if self.context_completion {
            run.complete_context();
        }

        let diff = run.finish();
        debug!("Graph diff summary: {:?}", diff.summary());
        Ok(diff)
    }
}

/// First node per name
struct NodeIndex<'a>(HashMap<&'a str, &'a Node>);

impl<'a> NodeIndex<'a> {
    fn new(graph: &'a Graph) -> Self {
        let mut index = HashMap::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            index.entry(node.name.as_str()).or_insert(node);
        }
        Self(index)
    }

    fn get(&self, name: &str) -> Option<&'a Node> {
        self.0.get(name).copied()
    }
}

struct DiffRun<'a> {
    old: &'a Graph,
    new: &'a Graph,
    old_index: NodeIndex<'a>,
    new_index: NodeIndex<'a>,
    state: DiffState,
    previous: AnnotatedGraph,
    current: AnnotatedGraph,
    diagnostics: Vec<String>,
}

impl<'a> DiffRun<'a> {
    fn new(old: &'a Graph, new: &'a Graph) -> Self {
        Self {
            old,
            new,
            old_index: NodeIndex::new(old),
            new_index: NodeIndex::new(new),
            state: DiffState::default(),
            previous: AnnotatedGraph::new(&old.name).with_layout(&old.attributes, &old.clusters),
            current: AnnotatedGraph::new(&new.name).with_layout(&new.attributes, &new.clusters),
            diagnostics: Vec::new(),
        }
    }

    fn detect_added_nodes(&mut self) {
        for node in &self.new.nodes {
            if self.old_index.get(&node.name).is_none() && self.state.added_nodes.insert(node.name.clone()) {
                self.current.ensure_node(node, PaintCategory::Added);
            }
        }
        debug!("Added nodes: {}", self.state.added_nodes.len());
    }

    fn compare_attributes(&mut self) {
        for old_node in &self.old.nodes {
            let Some(new_node) = self.new_index.get(&old_node.name) else {
                self.state.removed_nodes.insert(old_node.name.clone());
                continue;
            };

            let mut previous = Categories::default();
            let mut current = Categories::default();
            for (key, value) in &old_node.attributes {
                match new_node.attributes.get(key) {
                    None => {
                        previous.removed.insert(key.clone());
                    }
                    Some(new_value) if new_value == value => {
                        previous.unchanged.insert(key.clone());
                        current.unchanged.insert(key.clone());
                    }
                    Some(_) => {
                        previous.changed.insert(key.clone());
                        current.changed.insert(key.clone());
                    }
                }
            }

            if current.changed.is_empty() {
                self.state.unchanged_nodes.insert(old_node.name.clone());
            } else {
                self.state.changed_nodes.insert(old_node.name.clone());
                self.previous.ensure_node(old_node, PaintCategory::Normal);
                self.current
                    .ensure_changed_node(new_node, current.changed.iter().cloned());
            }

            self.state.previous_attributes.insert(old_node.name.clone(), previous);
            self.state.current_attributes.insert(new_node.name.clone(), current);
        }
        debug!(
            "Changed nodes: {}, removed nodes: {}",
            self.state.changed_nodes.len(),
            self.state.removed_nodes.len()
        );
    }

    fn materialize_removed_nodes(&mut self) {
        for name in &self.state.removed_nodes {
            if let Some(node) = self.old_index.get(name) {
                self.previous.ensure_node(node, PaintCategory::Removed);
                self.current.ensure_node(node, PaintCategory::Removed);
            }
        }
    }

    fn compare_links(&mut self) -> Result<()> {
        let old = self.old;
        for old_node in &old.nodes {
            let Some(new_node) = self.new_index.get(&old_node.name) else {
                continue;
            };

            let mut previous = Categories::default();
            let mut current = Categories::default();
            for link in &old_node.links {
                let name = link_name(old_node, link)?;
                match new_node.link(name) {
                    None => {
                        previous.removed.insert(name.to_string());
                    }
                    Some(new_link) if links_equivalent(link, new_link) => {
                        previous.unchanged.insert(name.to_string());
                        current.unchanged.insert(name.to_string());
                    }
                    Some(_) => {
                        previous.changed.insert(name.to_string());
                        current.changed.insert(name.to_string());
                    }
                }
            }
            for link in &new_node.links {
                let name = link_name(new_node, link)?;
                if !current.is_matched(name) {
                    current.added.insert(name.to_string());
                }
            }

            self.draw_changed_links(old_node, new_node, &previous, &current);
            self.draw_removed_links(old_node, new_node, &previous);
            self.draw_added_links(old_node, new_node, &current);

            self.state.previous_links.insert(old_node.name.clone(), previous);
            self.state.current_links.insert(new_node.name.clone(), current);
        }
        Ok(())
    }

    fn draw_changed_links(
        &mut self,
        old_node: &Node,
        new_node: &Node,
        previous: &Categories,
        current: &Categories,
    ) {
        for name in &previous.changed {
            if let Some(link) = old_node.link(name) {
                let source = self.previous.ensure_node(old_node, PaintCategory::Normal);
                let target = self.previous_target(old_node, link);
                self.previous.add_edge(source, link, target, PaintCategory::Changed);
            }
        }
        for name in &current.changed {
            if let Some(link) = new_node.link(name) {
                let source = self.current.ensure_node(new_node, PaintCategory::Normal);
                let target = self.current_target(new_node, link);
                self.current.add_edge(source, link, target, PaintCategory::Changed);
            }
        }
    }

    fn draw_removed_links(&mut self, old_node: &Node, new_node: &Node, previous: &Categories) {
        for name in &previous.removed {
            let Some(link) = old_node.link(name) else {
                continue;
            };
            let source = self.previous.ensure_node(old_node, PaintCategory::Normal);
            let target = self.previous_target(old_node, link);
            self.previous.add_edge(source, link, target, PaintCategory::Removed);

            // The target may be gone from the new graph as well; it is then
            // shown from the old graph, already painted as removed.
            let source = self.current.ensure_node(new_node, PaintCategory::Normal);
            let target = materialize_target(
                &mut self.current,
                &[&self.new_index, &self.old_index],
                &new_node.name,
                link,
                &mut self.diagnostics,
            );
            self.current.add_edge(source, link, target, PaintCategory::Removed);
        }
    }

    fn draw_added_links(&mut self, old_node: &Node, new_node: &Node, current: &Categories) {
        for link in &new_node.links {
            if !link.name().is_some_and(|name| current.added.contains(name)) {
                continue;
            }
            let source = self.current.ensure_node(new_node, PaintCategory::Normal);
            let target = self.current_target(new_node, link);
            self.current.add_edge(source, link, target, PaintCategory::Added);

            self.previous.ensure_node(old_node, PaintCategory::Normal);
            self.include_previous_context(&link.target.node);
        }
    }

    /// Links of added nodes are drawn whether or not they carry a name;
    /// only named ones are recorded as added links.
    fn include_added_node_links(&mut self) {
        let new = self.new;
        for node in &new.nodes {
            if !self.state.added_nodes.contains(&node.name) {
                continue;
            }

            let mut added = IndexSet::new();
            for link in &node.links {
                if let Some(name) = link.name() {
                    added.insert(name.to_string());
                }

                let source = self.current.ensure_node(node, PaintCategory::Added);
                let target = self.current_target(node, link);
                self.current.add_edge(source, link, target, PaintCategory::Added);
                self.include_previous_context(&link.target.node);
            }

            if !added.is_empty() {
                self.state
                    .current_links
                    .entry(node.name.clone())
                    .or_default()
                    .added
                    .extend(added);
            }
        }
    }

    /// Show an existing node in the previous graph so a new link's attach point is visible
    fn include_previous_context(&mut self, name: &str) {
        if self.state.added_nodes.contains(name) {
            return;
        }
        if let Some(node) = self.old_index.get(name) {
            self.previous.ensure_node(node, PaintCategory::Normal);
        }
    }

    fn previous_target(&mut self, owner: &Node, link: &Link) -> NodeId {
        materialize_target(
            &mut self.previous,
            &[&self.old_index],
            &owner.name,
            link,
            &mut self.diagnostics,
        )
    }

    fn current_target(&mut self, owner: &Node, link: &Link) -> NodeId {
        materialize_target(
            &mut self.current,
            &[&self.new_index],
            &owner.name,
            link,
            &mut self.diagnostics,
        )
    }

    fn complete_context(&mut self) {
        let previous_added = complete_side(&mut self.previous, |name| self.old_index.get(name));

        let removed = &self.state.removed_nodes;
        let (old_index, new_index) = (&self.old_index, &self.new_index);
        let current_added = complete_side(&mut self.current, |name| {
            if removed.contains(name) {
                old_index.get(name)
            } else {
                new_index.get(name)
            }
        });

        debug!(
            "Context completion added {} previous and {} current links",
            previous_added, current_added
        );
    }

    fn finish(self) -> GraphDiff {
        GraphDiff {
            state: self.state,
            previous: self.previous,
            current: self.current,
            diagnostics: self.diagnostics,
        }
    }
}

/// Copy original links between nodes that are both materialized in `graph`.
/// Links touching a removed node are painted removed.
fn complete_side<'a>(
    graph: &mut AnnotatedGraph,
    original: impl Fn(&str) -> Option<&'a Node>,
) -> usize {
    let materialized: Vec<(NodeId, String)> = graph
        .nodes()
        .map(|(id, node)| (id, node.name.clone()))
        .collect();

    let mut added = 0;
    for (source, name) in materialized {
        let Some(node) = original(&name) else {
            continue;
        };
        for link in &node.links {
            let Some(target) = graph.node_id(&link.target.node) else {
                continue;
            };
            if graph.has_edge(&name, link) {
                continue;
            }
            let touches_removed = graph.node(source).paint == PaintCategory::Removed
                || graph.node(target).paint == PaintCategory::Removed;
            let paint = if touches_removed {
                PaintCategory::Removed
            } else {
                PaintCategory::Normal
            };
            if graph.add_edge(source, link, target, paint) {
                added += 1;
            }
        }
    }
    added
}

/// Materialize the target of `link`, looking it up in `sources` in order.
/// An unknown target is reported and drawn as a bare node.
fn materialize_target(
    graph: &mut AnnotatedGraph,
    sources: &[&NodeIndex<'_>],
    owner: &str,
    link: &Link,
    diagnostics: &mut Vec<String>,
) -> NodeId {
    let name = link.target.node.as_str();
    if let Some(id) = graph.node_id(name) {
        return id;
    }

    match sources.iter().find_map(|index| index.get(name)) {
        Some(node) => graph.ensure_node(node, PaintCategory::Normal),
        None => {
            let message = format!(
                "Link '{}' of node '{}' targets unknown node '{}'",
                link.name().unwrap_or_default(),
                owner,
                name
            );
            warn!("{}", message);
            if !diagnostics.contains(&message) {
                diagnostics.push(message);
            }
            graph.ensure_node(&Node::new(name), PaintCategory::Normal)
        }
    }
}

fn link_name<'l>(owner: &Node, link: &'l Link) -> Result<&'l str> {
    link.name().ok_or_else(|| ViewDiffError::MissingLinkName {
        node: owner.name.clone(),
    })
}

/// Same label (when the old link has one) and same target, port included
fn links_equivalent(old: &Link, new: &Link) -> bool {
    let label_matches = match old.label() {
        Some(label) => new.label() == Some(label),
        None => true,
    };
    label_matches && old.target == new.target
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewdiff_common::{Cluster, Port};

    fn compare(old: &Graph, new: &Graph) -> GraphDiff {
        GraphDiffEngine::new().compare(old, new).unwrap()
    }

    fn names(set: &IndexSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    fn filesystem() -> Graph {
        Graph::new("fs")
            .with_node(
                Node::new("OS")
                    .with_attr("label", "OS")
                    .with_link(Link::new("boots", "Kernel"))
                    .with_link(Link::new("mounts", "Disk").with_attr("label", "ext4")),
            )
            .with_node(Node::new("Kernel").with_link(Link::new("drives", "Disk")))
            .with_node(Node::new("Disk"))
    }

    #[test]
    fn test_identical_graphs_produce_empty_diff() {
        let graph = filesystem();
        let diff = compare(&graph, &graph);

        assert!(diff.is_empty());
        assert_eq!(names(diff.unchanged_nodes()), vec!["OS", "Kernel", "Disk"]);
        assert!(diff.previous().is_empty());
        assert!(diff.current().is_empty());
        assert!(diff.diagnostics().is_empty());
    }

    #[test]
    fn test_added_node() {
        let old = Graph::new("g").with_node(Node::new("A")).with_node(Node::new("B"));
        let new = old.clone().with_node(Node::new("C"));
        let diff = compare(&old, &new);

        assert_eq!(names(diff.added_nodes()), vec!["C"]);
        assert!(diff.removed_nodes().is_empty());
        assert!(diff.changed_nodes().is_empty());
        assert_eq!(
            diff.current().node_by_name("C").map(|n| n.paint),
            Some(PaintCategory::Added)
        );
        assert!(diff.previous().is_empty());
    }

    #[test]
    fn test_removed_nodes_are_painted_on_both_sides() {
        let old = Graph::new("g")
            .with_node(Node::new("A"))
            .with_node(Node::new("B"))
            .with_node(Node::new("C"));
        let new = Graph::new("g").with_node(Node::new("A"));
        let diff = compare(&old, &new);

        assert_eq!(names(diff.removed_nodes()), vec!["B", "C"]);
        assert!(diff.added_nodes().is_empty());
        assert!(diff.changed_nodes().is_empty());
        for side in [diff.previous(), diff.current()] {
            assert_eq!(side.node_by_name("B").map(|n| n.paint), Some(PaintCategory::Removed));
            assert!(!side.contains_node("A"));
        }
    }

    #[test]
    fn test_changed_attribute() {
        let old = Graph::new("g").with_node(Node::new("X").with_attr("label", "OS"));
        let new = Graph::new("g").with_node(Node::new("X").with_attr("label", "Operating System"));
        let diff = compare(&old, &new);

        assert_eq!(names(diff.changed_nodes()), vec!["X"]);
        assert_eq!(diff.changed_attributes("X"), vec!["label"]);
        assert_eq!(
            diff.previous_attributes("X").map(|c| names(&c.changed)),
            Some(vec!["label"])
        );

        let current = diff.current().node_by_name("X").unwrap();
        assert_eq!(current.paint, PaintCategory::Changed);
        assert!(current.changed_keys.contains("label"));
        assert_eq!(
            current.attributes.get("label").map(String::as_str),
            Some("Operating System")
        );
        assert_eq!(
            diff.previous().node_by_name("X").map(|n| n.paint),
            Some(PaintCategory::Normal)
        );
    }

    #[test]
    fn test_attribute_only_in_new_is_not_reported() {
        let old = Graph::new("g").with_node(Node::new("X").with_attr("shape", "box"));
        let new = Graph::new("g").with_node(
            Node::new("X")
                .with_attr("shape", "box")
                .with_attr("color", "red"),
        );
        let diff = compare(&old, &new);

        assert!(diff.is_empty());
        assert!(diff.current_attributes("X").unwrap().added.is_empty());
    }

    #[test]
    fn test_removed_attribute_does_not_mark_node_changed() {
        let old = Graph::new("g").with_node(Node::new("X").with_attr("shape", "box"));
        let new = Graph::new("g").with_node(Node::new("X"));
        let diff = compare(&old, &new);

        assert_eq!(diff.removed_attributes("X"), vec!["shape"]);
        assert!(diff.changed_nodes().is_empty());
        assert_eq!(names(diff.unchanged_nodes()), vec!["X"]);
        assert!(!diff.is_empty());
        assert_eq!(diff.summary().removed_attributes, 1);
    }

    #[test]
    fn test_added_links() {
        let old = Graph::new("g")
            .with_node(Node::new("X").with_link(Link::new("a", "Y")))
            .with_node(Node::new("Y"))
            .with_node(Node::new("Z"));
        let new = Graph::new("g")
            .with_node(
                Node::new("X")
                    .with_link(Link::new("a", "Y"))
                    .with_link(Link::new("b", "Y"))
                    .with_link(Link::new("c", "Z")),
            )
            .with_node(Node::new("Y"))
            .with_node(Node::new("Z"));
        let diff = compare(&old, &new);

        assert_eq!(diff.added_links("X"), vec!["b", "c"]);
        assert!(diff.changed_nodes().is_empty());
        assert!(diff.removed_links("X").is_empty());

        let current = diff.current();
        let added = current
            .edges()
            .filter(|(_, _, e)| e.paint == PaintCategory::Added)
            .count();
        assert_eq!(added, 2);

        // Attach points of the new links are shown in the previous version
        assert!(diff.previous().contains_node("X"));
        assert!(diff.previous().contains_node("Z"));
    }

    #[test]
    fn test_removed_links() {
        let old = Graph::new("g")
            .with_node(
                Node::new("X")
                    .with_link(Link::new("a", "Y"))
                    .with_link(Link::new("b", "Y")),
            )
            .with_node(Node::new("Y"));
        let new = Graph::new("g")
            .with_node(Node::new("X").with_link(Link::new("a", "Y")))
            .with_node(Node::new("Y"));
        let diff = compare(&old, &new);

        assert_eq!(diff.removed_links("X"), vec!["b"]);
        assert!(diff.added_links("X").is_empty());

        for side in [diff.previous(), diff.current()] {
            let removed: Vec<_> = side
                .edges()
                .map(|(_, _, e)| e)
                .filter(|e| e.paint == PaintCategory::Removed)
                .collect();
            assert_eq!(removed.len(), 1);
            assert_eq!(removed[0].attributes.get("name").map(String::as_str), Some("b"));
        }
    }

    #[test]
    fn test_changed_link_label_and_target() {
        let old = Graph::new("g")
            .with_node(
                Node::new("X")
                    .with_link(Link::new("a", "Y").with_attr("label", "uses"))
                    .with_link(Link::new("b", "Y")),
            )
            .with_node(Node::new("Y"))
            .with_node(Node::new("Z"));
        let new = Graph::new("g")
            .with_node(
                Node::new("X")
                    .with_link(Link::new("a", "Y").with_attr("label", "needs"))
                    .with_link(Link::new("b", "Z")),
            )
            .with_node(Node::new("Y"))
            .with_node(Node::new("Z"));
        let diff = compare(&old, &new);

        assert_eq!(diff.changed_links("X"), vec!["a", "b"]);
        assert_eq!(
            diff.previous_links("X").map(|c| names(&c.changed)),
            Some(vec!["a", "b"])
        );
        assert!(diff.previous().contains_node("Y"));
        assert!(diff.current().contains_node("Z"));
        assert!(diff
            .current()
            .edges()
            .all(|(_, _, e)| e.paint == PaintCategory::Changed || e.paint == PaintCategory::Normal));
    }

    #[test]
    fn test_label_only_on_new_link_is_not_a_change() {
        let old = Graph::new("g")
            .with_node(Node::new("X").with_link(Link::new("a", "Y")))
            .with_node(Node::new("Y"));
        let new = Graph::new("g")
            .with_node(Node::new("X").with_link(Link::new("a", "Y").with_attr("label", "new")))
            .with_node(Node::new("Y"));

        assert!(compare(&old, &new).is_empty());
    }

    #[test]
    fn test_port_change_is_a_link_change() {
        let old = Graph::new("g")
            .with_node(Node::new("X").with_link(Link::new("a", "Y:p1")))
            .with_node(Node::new("Y"));
        let new = Graph::new("g")
            .with_node(Node::new("X").with_link(Link::new("a", "Y:p2")))
            .with_node(Node::new("Y"));
        let diff = compare(&old, &new);

        assert_eq!(diff.changed_links("X"), vec!["a"]);
        let (_, target, edge) = diff.current().edges().next().unwrap();
        assert_eq!(edge.target_port, Some(Port::new("p2")));
        assert_eq!(diff.current().node(target).name, "Y");
    }

    #[test]
    fn test_renamed_link_is_removed_and_added() {
        let old = Graph::new("g")
            .with_node(Node::new("X").with_link(Link::new("a", "Y")))
            .with_node(Node::new("Y"));
        let new = Graph::new("g")
            .with_node(Node::new("X").with_link(Link::new("renamed", "Y")))
            .with_node(Node::new("Y"));
        let diff = compare(&old, &new);

        assert_eq!(diff.removed_links("X"), vec!["a"]);
        assert_eq!(diff.added_links("X"), vec!["renamed"]);
        assert!(diff.changed_links("X").is_empty());
    }

    #[test]
    fn test_added_node_links() {
        let old = Graph::new("g").with_node(Node::new("A"));
        let new = Graph::new("g")
            .with_node(Node::new("A"))
            .with_node(Node::new("N").with_link(Link::new("n", "A")));
        let diff = compare(&old, &new);

        assert_eq!(diff.added_links("N"), vec!["n"]);
        let (_, _, edge) = diff.current().edges().next().unwrap();
        assert_eq!(edge.paint, PaintCategory::Added);
        assert_eq!(
            diff.previous().node_by_name("A").map(|n| n.paint),
            Some(PaintCategory::Normal)
        );
    }

    #[test]
    fn test_added_node_with_anonymous_link() {
        let old = Graph::new("g").with_node(Node::new("A"));
        let new = Graph::new("g")
            .with_node(Node::new("A"))
            .with_node(
                Node::new("N")
                    .with_link(Link::to("A"))
                    .with_link(Link::new("named", "A")),
            );
        let diff = GraphDiffEngine::new().compare(&old, &new).unwrap();

        assert_eq!(names(diff.added_nodes()), vec!["N"]);
        assert_eq!(diff.added_links("N"), vec!["named"]);
        let current = diff.current();
        assert_eq!(current.edge_count(), 2);
        assert!(current.has_edge("N", &Link::to("A")));
        assert!(current
            .edges()
            .all(|(_, _, e)| e.paint == PaintCategory::Added));
        assert!(diff.previous().contains_node("A"));
    }

    #[test]
    fn test_removed_link_to_removed_node() {
        let old = Graph::new("g")
            .with_node(Node::new("X").with_link(Link::new("a", "Gone")))
            .with_node(Node::new("Gone"));
        let new = Graph::new("g").with_node(Node::new("X"));
        let diff = compare(&old, &new);

        assert!(diff.diagnostics().is_empty());
        let current = diff.current();
        assert_eq!(
            current.node_by_name("Gone").map(|n| n.paint),
            Some(PaintCategory::Removed)
        );
        assert_eq!(current.edge_count(), 1);
        assert_eq!(current.edges().next().map(|(_, _, e)| e.paint), Some(PaintCategory::Removed));
    }

    #[test]
    fn test_context_completion() {
        let old = Graph::new("g")
            .with_node(
                Node::new("A")
                    .with_attr("label", "a")
                    .with_link(Link::new("ab", "B")),
            )
            .with_node(Node::new("B").with_attr("label", "b"))
            .with_node(Node::new("C").with_link(Link::new("ca", "A")));
        let new = Graph::new("g")
            .with_node(
                Node::new("A")
                    .with_attr("label", "a2")
                    .with_link(Link::new("ab", "B")),
            )
            .with_node(Node::new("B").with_attr("label", "b2"));

        let diff = compare(&old, &new);
        let current = diff.current();
        let context: Vec<_> = current
            .edges()
            .map(|(source, _, e)| (current.node(source).name.as_str(), e.paint))
            .collect();
        assert!(context.contains(&("A", PaintCategory::Normal)));
        assert!(context.contains(&("C", PaintCategory::Removed)));

        let bare = GraphDiffEngine::new()
            .with_context_completion(false)
            .compare(&old, &new)
            .unwrap();
        assert_eq!(bare.current().edge_count(), 0);
        assert_eq!(bare.summary(), diff.summary());
    }

    #[test]
    fn test_missing_link_name_fails_compare() {
        let old = Graph::new("g")
            .with_node(Node::new("X").with_link(Link::to("Y")))
            .with_node(Node::new("Y"));
        let result = GraphDiffEngine::new().compare(&old, &old);

        assert!(matches!(
            result,
            Err(ViewDiffError::MissingLinkName { ref node }) if node == "X"
        ));
    }

    #[test]
    fn test_unknown_link_target_is_diagnosed() {
        let old = Graph::new("g").with_node(Node::new("X"));
        let new = Graph::new("g").with_node(Node::new("X").with_link(Link::new("a", "Ghost")));
        let diff = compare(&old, &new);

        assert_eq!(diff.added_links("X"), vec!["a"]);
        assert_eq!(diff.diagnostics().len(), 1);
        assert!(diff.diagnostics()[0].contains("Ghost"));
        assert!(diff.current().contains_node("Ghost"));
    }

    #[test]
    fn test_inputs_are_not_modified_and_clusters_kept() {
        let old = filesystem().with_cluster(Cluster::new("cluster_core").with_node("Kernel"));
        let mut new = filesystem().with_cluster(Cluster::new("cluster_core").with_node("Kernel"));
        new.nodes[1].attributes.insert("color".into(), "blue".into());
        new.nodes[1].links.clear();
        let (old_copy, new_copy) = (old.clone(), new.clone());

        let diff = compare(&old, &new);
        assert_eq!(old, old_copy);
        assert_eq!(new, new_copy);

        let dot = diff.to_dot(&PaintColors::default());
        assert!(dot.contains("subgraph \"cluster_previous\""));
        assert!(dot.contains("subgraph \"cluster_previous_core\""));
        assert!(dot.contains("\"previous_Kernel\" -> \"previous_Disk\""));
    }
}
