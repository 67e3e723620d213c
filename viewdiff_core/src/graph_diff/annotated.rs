//! Output graphs of a structural diff.
//!
//! Materialized nodes and edges live in a `StableGraph`; a name index and an
//! edge-key index sit next to it, so a node is never duplicated to draw an edge
//! between two clusters and a link is drawn at most once per source.

use indexmap::IndexSet;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::NodeIndexable;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write;
use viewdiff_common::{Attributes, Cluster, Link, Node, PaintColors, Port, LABEL_ATTR};

/// Annotation vocabulary handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaintCategory {
    Normal,
    Added,
    Changed,
    Removed,
}

impl PaintCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaintCategory::Normal => "normal",
            PaintCategory::Added => "added",
            PaintCategory::Changed => "changed",
            PaintCategory::Removed => "removed",
        }
    }
}

pub type NodeId = NodeIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedNode {
    pub name: String,
    pub attributes: Attributes,
    pub paint: PaintCategory,
    /// Attribute keys whose value changed, for `Changed` nodes
    pub changed_keys: IndexSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedEdge {
    pub source_port: Option<Port>,
    pub target_port: Option<Port>,
    pub attributes: Attributes,
    pub paint: PaintCategory,
}

#[derive(Debug, Clone, Default)]
pub struct AnnotatedGraph {
    name: String,
    attributes: Attributes,
    clusters: Vec<Cluster>,
    graph: StableGraph<AnnotatedNode, AnnotatedEdge>,
    by_name: HashMap<String, NodeId>,
    edge_keys: HashMap<(String, String), EdgeIndex>,
}

impl AnnotatedGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Graph attributes and cluster layout taken over from an input graph
    pub fn with_layout(mut self, attributes: &Attributes, clusters: &[Cluster]) -> Self {
        self.attributes = attributes.clone();
        self.clusters = clusters.to_vec();
        self
    }

    /// Materialize a copy of `node` without its links, unless a node with that
    /// name exists. An existing `Normal` node takes the stronger paint.
    pub fn ensure_node(&mut self, node: &Node, paint: PaintCategory) -> NodeId {
        if let Some(&id) = self.by_name.get(&node.name) {
            let existing = &mut self.graph[id];
            if existing.paint == PaintCategory::Normal {
                existing.paint = paint;
            }
            return id;
        }

        let id = self.graph.add_node(AnnotatedNode {
            name: node.name.clone(),
            attributes: node.attributes.clone(),
            paint,
            changed_keys: IndexSet::new(),
        });
        self.by_name.insert(node.name.clone(), id);
        id
    }

    /// Materialize `node` painted `Changed`, recording which keys changed
    pub fn ensure_changed_node<I>(&mut self, node: &Node, keys: I) -> NodeId
    where
        I: IntoIterator<Item = String>,
    {
        let id = self.ensure_node(node, PaintCategory::Changed);
        let annotated = &mut self.graph[id];
        if annotated.paint == PaintCategory::Changed {
            annotated.changed_keys.extend(keys);
        }
        id
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn node(&self, id: NodeId) -> &AnnotatedNode {
        &self.graph[id]
    }

    pub fn node_by_name(&self, name: &str) -> Option<&AnnotatedNode> {
        self.node_id(name).map(|id| self.node(id))
    }

    /// Nodes in materialization order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &AnnotatedNode)> + '_ {
        self.graph.node_indices().map(move |id| (id, &self.graph[id]))
    }

    /// Edges in insertion order, with their source and target
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &AnnotatedEdge)> + '_ {
        self.graph.edge_indices().filter_map(move |index| {
            let (source, target) = self.graph.edge_endpoints(index)?;
            Some((source, target, &self.graph[index]))
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn edge_key(source: &str, link: &Link) -> (String, String) {
        let identity = match link.name() {
            Some(name) => name.to_string(),
            None => format!("->{}", link.target),
        };
        (source.to_string(), identity)
    }

    pub fn has_edge(&self, source: &str, link: &Link) -> bool {
        self.edge_keys.contains_key(&Self::edge_key(source, link))
    }

    /// Copy `link` between two materialized nodes, keeping its ports.
    ///
    /// Returns false when the same link of the same source is already present;
    /// the present edge is upgraded from `Normal` to `paint` in that case.
    pub fn add_edge(
        &mut self,
        source: NodeId,
        link: &Link,
        target: NodeId,
        paint: PaintCategory,
    ) -> bool {
        let key = Self::edge_key(&self.graph[source].name, link);
        if let Some(&index) = self.edge_keys.get(&key) {
            let existing = &mut self.graph[index];
            if existing.paint == PaintCategory::Normal {
                existing.paint = paint;
            }
            return false;
        }

        let index = self.graph.add_edge(
            source,
            target,
            AnnotatedEdge {
                source_port: link.source_port.clone(),
                target_port: link.target.port.clone(),
                attributes: link.attributes.clone(),
                paint,
            },
        );
        self.edge_keys.insert(key, index);
        true
    }

    /// Standalone DOT document of this graph
    pub fn to_dot(&self, colors: &PaintColors) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {} {{", quote(&self.name));
        write_attribute_statements(&mut out, "  ", &self.attributes);
        self.write_body(&mut out, "", "  ", colors);
        out.push_str("}\n");
        out
    }

    fn write_body(&self, out: &mut String, prefix: &str, indent: &str, colors: &PaintColors) {
        let mut written = vec![false; self.graph.node_bound()];
        for cluster in &self.clusters {
            self.write_cluster(out, cluster, prefix, indent, colors, &mut written);
        }
        for (id, node) in self.nodes() {
            if !written[id.index()] {
                self.write_node(out, node, prefix, indent, colors);
            }
        }
        for (source, target, edge) in self.edges() {
            let _ = writeln!(
                out,
                "{}{} -> {}{};",
                indent,
                endpoint_ref(prefix, &self.graph[source].name, edge.source_port.as_ref()),
                endpoint_ref(prefix, &self.graph[target].name, edge.target_port.as_ref()),
                attribute_list(&painted(&edge.attributes, edge.paint, &IndexSet::new(), colors))
            );
        }
    }

    fn cluster_has_members(&self, cluster: &Cluster) -> bool {
        cluster.nodes.iter().any(|n| self.contains_node(n))
            || cluster.clusters.iter().any(|c| self.cluster_has_members(c))
    }

    fn write_cluster(
        &self,
        out: &mut String,
        cluster: &Cluster,
        prefix: &str,
        indent: &str,
        colors: &PaintColors,
        written: &mut [bool],
    ) {
        if !self.cluster_has_members(cluster) {
            return;
        }

        let _ = writeln!(out, "{}subgraph {} {{", indent, quote(&cluster_id(prefix, &cluster.name)));
        let inner = format!("{}  ", indent);
        write_attribute_statements(out, &inner, &cluster.attributes);
        for member in &cluster.nodes {
            if let Some(id) = self.node_id(member) {
                if !written[id.index()] {
                    written[id.index()] = true;
                    self.write_node(out, self.node(id), prefix, &inner, colors);
                }
            }
        }
        for nested in &cluster.clusters {
            self.write_cluster(out, nested, prefix, &inner, colors, written);
        }
        let _ = writeln!(out, "{}}}", indent);
    }

    fn write_node(
        &self,
        out: &mut String,
        node: &AnnotatedNode,
        prefix: &str,
        indent: &str,
        colors: &PaintColors,
    ) {
        let mut attributes = painted(&node.attributes, node.paint, &node.changed_keys, colors);
        if !prefix.is_empty() && !attributes.contains_key(LABEL_ATTR) {
            attributes.insert(LABEL_ATTR.to_string(), node.name.clone());
        }
        let _ = writeln!(
            out,
            "{}{}{};",
            indent,
            quote(&format!("{}{}", prefix, node.name)),
            attribute_list(&attributes)
        );
    }
}

/// DOT document showing both output graphs as "Previous Version" and
/// "Current Version" clusters. Empty sides are left out.
pub fn combined_dot(previous: &AnnotatedGraph, current: &AnnotatedGraph, colors: &PaintColors) -> String {
    let mut out = String::new();
    out.push_str("digraph \"viewdiff\" {\n");
    out.push_str("  compound=true;\n");

    let layout = if current.is_empty() { previous } else { current };
    let mut graph_attributes = layout.attributes.clone();
    graph_attributes.shift_remove(LABEL_ATTR);
    write_attribute_statements(&mut out, "  ", &graph_attributes);

    for (side, label, prefix) in [
        (previous, "Previous Version", "previous_"),
        (current, "Current Version", "current_"),
    ] {
        if side.is_empty() {
            continue;
        }
        let _ = writeln!(out, "  subgraph {} {{", quote(&format!("cluster_{}", prefix.trim_end_matches('_'))));
        let _ = writeln!(out, "    label={};", quote(label));
        side.write_body(&mut out, prefix, "    ", colors);
        out.push_str("  }\n");
    }

    out.push_str("}\n");
    out
}

fn painted(
    attributes: &Attributes,
    paint: PaintCategory,
    changed_keys: &IndexSet<String>,
    colors: &PaintColors,
) -> Attributes {
    let mut result = attributes.clone();
    match paint {
        PaintCategory::Normal => {}
        PaintCategory::Added => {
            result.insert("color".to_string(), colors.added.clone());
        }
        PaintCategory::Changed => {
            let label_changed = changed_keys.contains(LABEL_ATTR);
            if label_changed {
                result.insert("fontcolor".to_string(), colors.changed.clone());
            }
            if !label_changed || changed_keys.len() > 1 {
                result.insert("color".to_string(), colors.changed.clone());
            }
        }
        PaintCategory::Removed => {
            result.insert("color".to_string(), colors.removed.clone());
            result.insert("fontcolor".to_string(), colors.removed.clone());
            result.insert("style".to_string(), "dashed".to_string());
        }
    }
    result
}

fn cluster_id(prefix: &str, name: &str) -> String {
    match name.strip_prefix("cluster") {
        Some(rest) => format!("cluster_{}{}", prefix, rest.trim_start_matches('_')),
        None => format!("{}{}", prefix, name),
    }
}

fn endpoint_ref(prefix: &str, node: &str, port: Option<&Port>) -> String {
    let id = quote(&format!("{}{}", prefix, node));
    match port {
        Some(port) => match &port.compass {
            Some(compass) => format!("{}:{}:{}", id, quote(&port.name), identifier(compass)),
            None => format!("{}:{}", id, quote(&port.name)),
        },
        None => id,
    }
}

fn write_attribute_statements(out: &mut String, indent: &str, attributes: &Attributes) {
    for (key, value) in attributes {
        let _ = writeln!(out, "{}{}={};", indent, identifier(key), quote(value));
    }
}

fn attribute_list(attributes: &Attributes) -> String {
    if attributes.is_empty() {
        return String::new();
    }
    let entries: Vec<String> = attributes
        .iter()
        .map(|(key, value)| format!("{}={}", identifier(key), quote(value)))
        .collect();
    format!(" [{}]", entries.join(", "))
}

/// Double-quoted DOT string
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => {}
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Bare DOT identifier when `value` is one, quoted string otherwise
fn identifier(value: &str) -> String {
    let mut chars = value.chars();
    let bare = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare {
        value.to_string()
    } else {
        quote(value)
    }
}
