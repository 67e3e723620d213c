use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

/// Well-known content format tags
pub mod formats {
    /// JSON form of the graph model
    pub const GRAPH: &str = "graph";
    pub const GRAPHVIZ_DOT: &str = "graphviz-dot";
    pub const TEXT: &str = "text";
    pub const HTML: &str = "html";
}

pub type ContentProducer = Box<dyn Fn() -> Result<String>>;

struct ContentCell {
    value: OnceCell<String>,
    producer: Option<ContentProducer>,
}

/// Leaf content of a view tree node, computed at most once.
///
/// Clones share the same cell, so a copied tree node never recomputes content
/// that its original already produced. A failed computation is not cached.
#[derive(Clone)]
pub struct Content(Rc<ContentCell>);

impl Content {
    /// Content that is already available
    pub fn text(value: impl Into<String>) -> Self {
        let value_cell = OnceCell::new();
        let _ = value_cell.set(value.into());
        Self(Rc::new(ContentCell {
            value: value_cell,
            producer: None,
        }))
    }

    /// Content computed on first read
    pub fn lazy<F>(producer: F) -> Self
    where
        F: Fn() -> Result<String> + 'static,
    {
        Self(Rc::new(ContentCell {
            value: OnceCell::new(),
            producer: Some(Box::new(producer)),
        }))
    }

    pub fn get(&self) -> Result<&str> {
        if let Some(value) = self.0.value.get() {
            return Ok(value);
        }
        let produced = match &self.0.producer {
            Some(producer) => producer()?,
            None => String::new(),
        };
        Ok(self.0.value.get_or_init(|| produced))
    }

    pub fn is_computed(&self) -> bool {
        self.0.value.get().is_some()
    }

    /// Whether both handles point at the same memoized cell
    pub fn ptr_eq(&self, other: &Content) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.value.get() {
            Some(value) => f.debug_tuple("Content").field(value).finish(),
            None => f.write_str("Content(<pending>)"),
        }
    }
}

/// Change marker attached to every node of a merged tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffTag {
    Added,
    Removed,
    Changed,
    Unchanged,
}

impl DiffTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffTag::Added => "added",
            DiffTag::Removed => "removed",
            DiffTag::Changed => "changed",
            DiffTag::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for DiffTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named, ordered presentation tree with lazily rendered leaf content
#[derive(Debug, Clone, Default)]
pub struct ViewTree {
    /// Empty for anonymous nodes
    pub name: String,
    pub format: String,
    pub content: Option<Content>,
    pub icon: Option<String>,
    pub tag: Option<DiffTag>,
    pub children: Vec<ViewTree>,
}

impl ViewTree {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn leaf(name: impl Into<String>, format: impl Into<String>, content: Content) -> Self {
        Self {
            name: name.into(),
            format: format.into(),
            content: Some(content),
            ..Default::default()
        }
    }

    pub fn with_child(mut self, child: ViewTree) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }

    /// Copy of name, format and icon only
    pub fn shell(&self) -> Self {
        Self {
            name: self.name.clone(),
            format: self.format.clone(),
            icon: self.icon.clone(),
            ..Default::default()
        }
    }

    /// Full copy of the subtree with every node tagged `tag`
    pub fn tagged_copy(&self, tag: DiffTag) -> Self {
        Self {
            name: self.name.clone(),
            format: self.format.clone(),
            content: self.content.clone(),
            icon: self.icon.clone(),
            tag: Some(tag),
            children: self.children.iter().map(|c| c.tagged_copy(tag)).collect(),
        }
    }

    pub fn child(&self, name: &str) -> Option<&ViewTree> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Follow a path of child names, first match at each level
    pub fn for_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&ViewTree> {
        path.iter()
            .try_fold(self, |node, segment| node.child(segment.as_ref()))
    }

    /// Name decorated with the change tag, for presentation
    pub fn display_name(&self) -> String {
        let name = if self.is_anonymous() { "(root)" } else { self.name.as_str() };
        match self.tag {
            Some(DiffTag::Added) => format!("{} (Added)", name),
            Some(DiffTag::Removed) => format!("{} (Removed)", name),
            Some(DiffTag::Changed) => format!("{} (Changed)", name),
            Some(DiffTag::Unchanged) | None => name.to_string(),
        }
    }

    /// Append `child` under `leaf_name`.
    ///
    /// An anonymous child, or an empty `leaf_name`, adds no intermediate level:
    /// the child's shell is renamed and its children are carried over.
    pub fn append(&mut self, child: ViewTree, leaf_name: &str) {
        let appended = if child.is_anonymous() || leaf_name.is_empty() {
            let name = if leaf_name.is_empty() {
                child.name.clone()
            } else {
                leaf_name.to_string()
            };
            ViewTree { name, ..child }
        } else {
            ViewTree::new(leaf_name).with_child(child)
        };
        self.children.push(appended);
    }

    /// Number of nodes in the subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ViewTree::node_count).sum::<usize>()
    }

    /// Pre-order traversal
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ViewTree, usize)) {
        fn go<'a>(node: &'a ViewTree, depth: usize, visit: &mut dyn FnMut(&'a ViewTree, usize)) {
            visit(node, depth);
            for child in &node.children {
                go(child, depth + 1, visit);
            }
        }
        go(self, 0, visit);
    }

    /// Serializable form, forcing every lazy content
    pub fn snapshot(&self) -> Result<TreeSnapshot> {
        let content = match &self.content {
            Some(content) => Some(content.get()?.to_string()),
            None => None,
        };
        Ok(TreeSnapshot {
            name: self.name.clone(),
            format: self.format.clone(),
            content,
            icon: self.icon.clone(),
            tag: self.tag,
            children: self
                .children
                .iter()
                .map(ViewTree::snapshot)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

/// JSON interchange form of a [`ViewTree`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TreeSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<DiffTag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeSnapshot>,
}

impl From<TreeSnapshot> for ViewTree {
    fn from(snapshot: TreeSnapshot) -> Self {
        ViewTree {
            name: snapshot.name,
            format: snapshot.format,
            content: snapshot.content.map(Content::text),
            icon: snapshot.icon,
            tag: snapshot.tag,
            children: snapshot.children.into_iter().map(ViewTree::from).collect(),
        }
    }
}
