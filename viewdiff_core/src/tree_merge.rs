//! Merge of two view trees into one tree of differences.
//!
//! Children are paired by name, greedily and in encounter order. Matched pairs are
//! compared and recursed into; unmatched old children come out tagged removed and
//! unmatched new children tagged added, with the tag applied to every descendant.
//! Merged children keep the old order, followed by added children in new order.

use crate::engine::{EngineContext, EngineRegistry};
use crate::normalize::ContentNormalizer;
use serde::Serialize;
use tracing::{debug, info, warn};
use viewdiff_common::{formats, AppConfig, Content, DiffTag, Result, ViewTree};

pub const EMPTY_ON_PREVIOUS: &str = "empty on previous version";
pub const EMPTY_ON_CURRENT: &str = "empty on current version";

/// Number of nodes per tag in a merged tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TagCounts {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl TagCounts {
    pub fn of(tree: &ViewTree) -> Self {
        let mut counts = Self::default();
        tree.walk(&mut |node, _| match node.tag {
            Some(DiffTag::Added) => counts.added += 1,
            Some(DiffTag::Removed) => counts.removed += 1,
            Some(DiffTag::Changed) => counts.changed += 1,
            Some(DiffTag::Unchanged) | None => counts.unchanged += 1,
        });
        counts
    }

    pub fn has_changes(&self) -> bool {
        self.added + self.removed + self.changed > 0
    }
}

pub struct TreeMerger {
    registry: EngineRegistry,
    context: EngineContext,
    normalizer: ContentNormalizer,
}

impl Default for TreeMerger {
    fn default() -> Self {
        Self::new(
            EngineRegistry::default(),
            EngineContext::default(),
            ContentNormalizer::default(),
        )
    }
}

impl TreeMerger {
    pub fn new(registry: EngineRegistry, context: EngineContext, normalizer: ContentNormalizer) -> Self {
        Self {
            registry,
            context,
            normalizer,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            EngineRegistry::from_config(config),
            EngineContext::from_config(config),
            ContentNormalizer::from_config(&config.normalization),
        )
    }

    /// Merge `old` and `new` into a new tagged tree. The inputs are only read.
    ///
    /// `engine` names the engine to prefer for changed leaves; without it, or
    /// when it does not support a leaf's format, engines are resolved by format.
    pub fn diff_merge(&self, old: &ViewTree, new: &ViewTree, engine: Option<&str>) -> ViewTree {
        info!(
            "Merging view trees ({} and {} nodes)",
            old.node_count(),
            new.node_count()
        );

        let mut path = Vec::new();
        let merged = self.merge_node(old, new, engine, &mut path);

        let counts = TagCounts::of(&merged);
        info!(
            "Merge complete: {} added, {} removed, {} changed, {} unchanged",
            counts.added, counts.removed, counts.changed, counts.unchanged
        );
        merged
    }

    fn merge_node(
        &self,
        old: &ViewTree,
        new: &ViewTree,
        engine: Option<&str>,
        path: &mut Vec<String>,
    ) -> ViewTree {
        let mut merged = old.shell();
        self.compare_content(&mut merged, old, new, engine, path);

        if !old.children.is_empty() || !new.children.is_empty() {
            merged.children = self.merge_children(old, new, engine, path);
        }
        merged
    }

    fn merge_children(
        &self,
        old: &ViewTree,
        new: &ViewTree,
        engine: Option<&str>,
        path: &mut Vec<String>,
    ) -> Vec<ViewTree> {
        let mut consumed = vec![false; new.children.len()];
        let mut children = Vec::with_capacity(old.children.len().max(new.children.len()));

        for old_child in &old.children {
            let counterpart = new
                .children
                .iter()
                .enumerate()
                .find(|(i, c)| !consumed[*i] && c.name == old_child.name)
                .map(|(i, _)| i);

            match counterpart {
                Some(index) => {
                    consumed[index] = true;
                    path.push(old_child.name.clone());
                    children.push(self.merge_node(old_child, &new.children[index], engine, path));
                    path.pop();
                }
                None => children.push(old_child.tagged_copy(DiffTag::Removed)),
            }
        }

        for (new_child, _) in new.children.iter().zip(&consumed).filter(|(_, used)| !**used) {
            children.push(new_child.tagged_copy(DiffTag::Added));
        }
        children
    }

    fn compare_content(
        &self,
        merged: &mut ViewTree,
        old: &ViewTree,
        new: &ViewTree,
        engine: Option<&str>,
        path: &[String],
    ) {
        let location = if path.is_empty() {
            "(root)".to_string()
        } else {
            path.join("/")
        };

        let contents = read_content(old).and_then(|o| Ok((o, read_content(new)?)));
        let (old_content, new_content) = match contents {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Unable to read content of {}: {}", location, e);
                set_placeholder(merged, format!("Unable to read content: {}", e));
                return;
            }
        };

        match (old_content, new_content) {
            (None, None) => merged.tag = Some(DiffTag::Unchanged),
            (None, Some(_)) => set_placeholder(merged, EMPTY_ON_PREVIOUS.to_string()),
            (Some(_), None) => set_placeholder(merged, EMPTY_ON_CURRENT.to_string()),
            (Some(old_text), Some(new_text)) if self.normalizer.equivalent(old_text, new_text) => {
                merged.tag = Some(DiffTag::Unchanged);
                merged.format = new.format.clone();
                merged.content = new.content.clone();
            }
            (Some(old_text), Some(new_text)) => {
                let kind = self.registry.resolve(engine, &old.format);
                debug!("Diffing {} with engine {}", location, kind);

                let name = if old.is_anonymous() { location.as_str() } else { old.name.as_str() };
                match kind.diff(&self.context, name, old_text, new_text) {
                    Ok(leaf) => {
                        merged.tag = Some(DiffTag::Changed);
                        merged.format = leaf.format;
                        merged.content = Some(Content::text(leaf.content));
                        if leaf.icon.is_some() {
                            merged.icon = leaf.icon;
                        }
                    }
                    Err(e) => {
                        warn!("Engine {} failed on {}: {}", kind, location, e);
                        set_placeholder(merged, format!("Unable to compute differences: {}", e));
                    }
                }
            }
        }
    }
}

/// Leaf content, with `None` for absent or empty content
fn read_content(tree: &ViewTree) -> Result<Option<&str>> {
    match &tree.content {
        Some(content) => Ok(Some(content.get()?).filter(|text| !text.is_empty())),
        None => Ok(None),
    }
}

fn set_placeholder(merged: &mut ViewTree, message: String) {
    merged.tag = Some(DiffTag::Changed);
    merged.format = formats::TEXT.to_string();
    merged.content = Some(Content::text(message));
}

/// Top-level view holding the differences and both versions
pub fn comparison_view(merged: ViewTree, current: ViewTree, previous: ViewTree) -> ViewTree {
    let mut view = ViewTree::new("");
    view.append(merged, "Differences");
    view.append(current, "Current Version");
    view.append(previous, "Previous Version");
    view
}
