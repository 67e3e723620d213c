use std::collections::HashSet;
use std::rc::Rc;
use viewdiff_common::{formats, Cluster, Content, Graph, Node, Result, ViewDiffError, ViewTree};

const GRAPH_ICON: &str = "diagram-ffbb00";

/// View tree of a graph: a "Graph" leaf with the whole graph and a "Nodes"
/// branch with one leaf per node, sorted by name, holding that node's
/// neighbourhood. Leaf content is serialized on first read.
pub fn graph_view_tree(graph: Graph) -> ViewTree {
    let graph = Rc::new(graph);

    let mut names: Vec<String> = graph.nodes.iter().map(|n| n.name.clone()).collect();
    names.sort();
    names.dedup();

    let mut nodes = ViewTree::new("Nodes");
    for name in names {
        let source = Rc::clone(&graph);
        let focus = name.clone();
        let content = Content::lazy(move || to_json(&neighbourhood(&source, &focus)));
        nodes = nodes.with_child(ViewTree::leaf(name, formats::GRAPH, content).with_icon(GRAPH_ICON));
    }

    let whole = Rc::clone(&graph);
    let overview = ViewTree::leaf("Graph", formats::GRAPH, Content::lazy(move || to_json(&whole)))
        .with_icon(GRAPH_ICON);

    ViewTree::new("").with_child(overview).with_child(nodes)
}

/// The node with its outgoing links, their targets, and the nodes linking to it
pub fn neighbourhood(graph: &Graph, name: &str) -> Graph {
    let mut result = Graph::new(name);
    result.directed = graph.directed;
    result.attributes = graph.attributes.clone();

    let Some(focus) = graph.node(name) else {
        return result;
    };
    result.add_node(focus.clone());

    for link in &focus.links {
        if let Some(target) = graph.node(&link.target.node) {
            if target.name != focus.name {
                result.add_node(target.shallow_copy());
            }
        }
    }

    for node in graph.nodes.iter().filter(|n| n.name != name) {
        let incoming: Vec<_> = node
            .links
            .iter()
            .filter(|l| l.target.node == name)
            .cloned()
            .collect();
        if !incoming.is_empty() {
            result.add_node(Node {
                links: incoming,
                ..node.shallow_copy()
            });
        }
    }

    let members: HashSet<&str> = result.nodes.iter().map(|n| n.name.as_str()).collect();
    result.clusters = graph
        .clusters
        .iter()
        .filter_map(|c| retain_members(c, &members))
        .collect();
    result
}

fn retain_members(cluster: &Cluster, members: &HashSet<&str>) -> Option<Cluster> {
    let nodes: Vec<String> = cluster
        .nodes
        .iter()
        .filter(|n| members.contains(n.as_str()))
        .cloned()
        .collect();
    let clusters: Vec<Cluster> = cluster
        .clusters
        .iter()
        .filter_map(|c| retain_members(c, members))
        .collect();

    if nodes.is_empty() && clusters.is_empty() {
        return None;
    }
    Some(Cluster {
        name: cluster.name.clone(),
        attributes: cluster.attributes.clone(),
        nodes,
        clusters,
    })
}

fn to_json(graph: &Graph) -> Result<String> {
    serde_json::to_string_pretty(graph).map_err(|e| ViewDiffError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewdiff_common::Link;

    fn sample() -> Graph {
        Graph::new("fs")
            .with_node(Node::new("Kernel").with_link(Link::new("drives", "Disk")))
            .with_node(
                Node::new("OS")
                    .with_attr("label", "OS")
                    .with_link(Link::new("boots", "Kernel")),
            )
            .with_node(Node::new("Disk"))
            .with_node(Node::new("Shell").with_link(Link::new("runs-on", "OS")))
            .with_cluster(
                Cluster::new("cluster_hw")
                    .with_node("Disk")
                    .with_cluster(Cluster::new("cluster_io").with_node("Shell")),
            )
    }

    #[test]
    fn test_tree_layout() {
        let tree = graph_view_tree(sample());
        assert!(tree.is_anonymous());
        assert_eq!(tree.children[0].name, "Graph");

        let nodes = tree.child("Nodes").unwrap();
        let names: Vec<_> = nodes.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Disk", "Kernel", "OS", "Shell"]);
        assert!(nodes.children.iter().all(|c| c.format == formats::GRAPH));
        assert!(!nodes.children[0].content.as_ref().unwrap().is_computed());
    }

    #[test]
    fn test_neighbourhood_contents() {
        let graph = sample();
        let around_os = neighbourhood(&graph, "OS");

        let mut names: Vec<_> = around_os.nodes.iter().map(|n| n.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Kernel", "OS", "Shell"]);
        assert!(around_os.node("Kernel").unwrap().links.is_empty());
        assert_eq!(around_os.node("Shell").unwrap().links.len(), 1);
        assert_eq!(around_os.clusters.len(), 1);
        assert!(around_os.clusters[0].nodes.is_empty());
        assert_eq!(around_os.clusters[0].clusters[0].nodes, vec!["Shell".to_string()]);

        assert!(neighbourhood(&graph, "Missing").is_empty());
    }

    #[test]
    fn test_leaf_content_is_graph_json() {
        let tree = graph_view_tree(sample());
        let leaf = tree.for_path(&["Nodes", "Disk"]).unwrap();
        let parsed: Graph = serde_json::from_str(leaf.content.as_ref().unwrap().get().unwrap()).unwrap();

        assert_eq!(parsed.name, "Disk");
        assert!(parsed.node("Kernel").is_some());
        assert_eq!(parsed.link_count(), 1);
    }
}
