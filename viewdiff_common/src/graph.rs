//! Attributed directed graph model.
//!
//! Graphs are produced by an external parser (the JSON form of these types is the
//! interchange format) and only read by the diff engine. Nodes are identified by
//! name, links by their `name` attribute.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute key carrying a link's identity.
pub const LINK_NAME_ATTR: &str = "name";

/// Attribute key whose change gets a distinct visual treatment.
pub const LABEL_ATTR: &str = "label";

pub type Attributes = IndexMap<String, String>;

/// A named sub-location within a node that a link may attach to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compass: Option<String>,
}

impl Port {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            compass: None,
        }
    }

    pub fn with_compass(mut self, compass: impl Into<String>) -> Self {
        self.compass = Some(compass.into());
        self
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.compass {
            Some(compass) => write!(f, "{}:{}", self.name, compass),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Reference to a node, optionally qualified by a port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoint {
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<Port>,
}

impl Endpoint {
    pub fn node(name: impl Into<String>) -> Self {
        Self {
            node: name.into(),
            port: None,
        }
    }

    pub fn with_port(mut self, port: Port) -> Self {
        self.port = Some(port);
        self
    }

    /// Parse the `node[:port[:compass]]` shorthand
    pub fn parse(reference: &str) -> Self {
        let mut parts = reference.splitn(3, ':');
        let node = parts.next().unwrap_or_default().to_string();
        let port = parts.next().map(|name| Port {
            name: name.to_string(),
            compass: parts.next().map(str::to_string),
        });
        Self { node, port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.port {
            Some(port) => write!(f, "{}:{}", self.node, port),
            None => write!(f, "{}", self.node),
        }
    }
}

// Endpoints accept either the full object form or the "node:port" shorthand.
impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Short(String),
            Full {
                node: String,
                #[serde(default)]
                port: Option<Port>,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Short(reference) => Endpoint::parse(&reference),
            Repr::Full { node, port } => Endpoint { node, port },
        })
    }
}

/// Outgoing directed edge of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Port on the owning node the link leaves from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_port: Option<Port>,
    pub target: Endpoint,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Link {
    /// Create a link carrying the `name` identity attribute
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::to(target).with_attr(LINK_NAME_ATTR, name)
    }

    /// Create an anonymous link
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            source_port: None,
            target: Endpoint::parse(&target.into()),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_source_port(mut self, port: Port) -> Self {
        self.source_port = Some(port);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.attributes.get(LINK_NAME_ATTR).map(String::as_str)
    }

    pub fn label(&self) -> Option<&str> {
        self.attributes.get(LABEL_ATTR).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            links: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    /// First outgoing link whose `name` attribute matches
    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name() == Some(name))
    }

    /// Copy of the node without its outgoing links
    pub fn shallow_copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            links: Vec::new(),
        }
    }
}

/// Rendering-only grouping of nodes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
    /// Names of member nodes
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
}

impl Cluster {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.nodes.push(node.into());
        self
    }

    pub fn with_cluster(mut self, cluster: Cluster) -> Self {
        self.clusters.push(cluster);
        self
    }}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_directed")]
    pub directed: bool,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
}

fn default_directed() -> bool {
    true
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("")
    }
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directed: true,
            attributes: Attributes::new(),
            nodes: Vec::new(),
            clusters: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.add_node(node);
        self
    }

    pub fn with_cluster(mut self, cluster: Cluster) -> Self {
        self.clusters.push(cluster);
        self
    }

    /// Add a node; a node with the same name absorbs the new attributes and links
    pub fn add_node(&mut self, node: Node) {
        match self.nodes.iter_mut().find(|n| n.name == node.name) {
            Some(existing) => {
                existing.attributes.extend(node.attributes);
                existing.links.extend(node.links);
            }
            None => self.nodes.push(node),
        }
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn link_count(&self) -> usize {
        self.nodes.iter().map(|n| n.links.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
