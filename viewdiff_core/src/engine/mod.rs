//! Leaf diff engines and their selection.

pub mod side_by_side;
pub mod text;

pub use text::{DiffChangeType, DiffLine, TextDiffEngine};

use crate::graph_diff::GraphDiffEngine;
use crate::resources::ResourceProvider;
use std::fmt::{self, Write};
use std::rc::Rc;
use tracing::{debug, warn};
use viewdiff_common::{formats, AppConfig, Graph, GraphDiffConfig, Result, ViewDiffError};

/// Turns graph leaf content into the graph model
pub trait GraphParser {
    fn parse(&self, content: &str) -> Result<Graph>;
}

/// Parser for the JSON form of [`Graph`]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGraphParser;

impl GraphParser for JsonGraphParser {
    fn parse(&self, content: &str) -> Result<Graph> {
        serde_json::from_str(content).map_err(|e| ViewDiffError::Parse(e.to_string()))
    }
}

/// Everything engines need besides the two contents
#[derive(Clone)]
pub struct EngineContext {
    pub parser: Rc<dyn GraphParser>,
    pub resources: ResourceProvider,
    pub graph: GraphDiffConfig,
}

impl Default for EngineContext {
    fn default() -> Self {
        Self {
            parser: Rc::new(JsonGraphParser),
            resources: ResourceProvider::default(),
            graph: GraphDiffConfig::default(),
        }
    }
}

impl EngineContext {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            resources: ResourceProvider::new(config.resource_dir.clone()),
            graph: config.graph.clone(),
            ..Default::default()
        }
    }

    pub fn with_parser(mut self, parser: Rc<dyn GraphParser>) -> Self {
        self.parser = parser;
        self
    }
}

/// Rendered result of one leaf comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafDiff {
    pub format: String,
    pub content: String,
    pub icon: Option<String>,
}

impl LeafDiff {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            format: formats::TEXT.to_string(),
            content: content.into(),
            icon: None,
        }
    }
}

const GRAPH_FORMATS: &[&str] = &[formats::GRAPH, formats::GRAPHVIZ_DOT, "dot"];
const TEXT_FORMATS: &[&str] = &[formats::TEXT, "plain", "markdown", "csv"];

/// Engine names that are known but not provided by this build
const UNAVAILABLE_ENGINES: &[&str] = &["html"];

/// The available leaf diff engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffEngineKind {
    /// Structural graph diff rendered as DOT
    DotGraph,
    /// Unified line diff
    Text,
    /// Both contents next to each other in an HTML table
    SideBySide,
    /// Reports that the content differs, without detail
    Fallback,
}

impl DiffEngineKind {
    pub const ALL: [DiffEngineKind; 4] = [
        DiffEngineKind::DotGraph,
        DiffEngineKind::Text,
        DiffEngineKind::SideBySide,
        DiffEngineKind::Fallback,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DiffEngineKind::DotGraph => "dot-graph",
            DiffEngineKind::Text => "text",
            DiffEngineKind::SideBySide => "side-by-side",
            DiffEngineKind::Fallback => "fallback",
        }
    }

    /// Case-insensitive lookup by name or alias
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dot-graph" | "dot" | "graph" | "graphviz" => Some(DiffEngineKind::DotGraph),
            "text" | "plain" => Some(DiffEngineKind::Text),
            "side-by-side" | "sidebyside" => Some(DiffEngineKind::SideBySide),
            "fallback" | "dummy" => Some(DiffEngineKind::Fallback),
            _ => None,
        }
    }

    pub fn supports(&self, format: &str) -> bool {
        let listed = |list: &[&str]| list.iter().any(|f| f.eq_ignore_ascii_case(format));
        match self {
            DiffEngineKind::DotGraph => listed(GRAPH_FORMATS),
            DiffEngineKind::Text => listed(TEXT_FORMATS),
            DiffEngineKind::SideBySide | DiffEngineKind::Fallback => true,
        }
    }

    /// Compare the raw contents of the leaf called `name`
    pub fn diff(&self, context: &EngineContext, name: &str, old: &str, new: &str) -> Result<LeafDiff> {
        match self {
            DiffEngineKind::DotGraph => {
                let old_graph = context.parser.parse(old)?;
                let new_graph = context.parser.parse(new)?;
                let diff = GraphDiffEngine::from_config(&context.graph).compare(&old_graph, &new_graph)?;

                let mut content = String::new();
                for diagnostic in diff.diagnostics() {
                    let _ = writeln!(content, "// {}", diagnostic);
                }
                content.push_str(&diff.to_dot(&context.graph.colors));

                Ok(LeafDiff {
                    format: formats::GRAPHVIZ_DOT.to_string(),
                    content,
                    icon: Some("diagram-ff0000".to_string()),
                })
            }
            DiffEngineKind::Text => Ok(LeafDiff {
                format: formats::TEXT.to_string(),
                content: TextDiffEngine::new().unified(name, old, new),
                icon: Some("diff".to_string()),
            }),
            DiffEngineKind::SideBySide => Ok(LeafDiff {
                format: formats::HTML.to_string(),
                content: side_by_side::render(&context.resources, name, old, new)?,
                icon: None,
            }),
            DiffEngineKind::Fallback => Ok(LeafDiff::text(format!("{}: Content differs", name))),
        }
    }
}

impl fmt::Display for DiffEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered engine list used for format-based resolution
#[derive(Debug, Clone)]
pub struct EngineRegistry {
    order: Vec<DiffEngineKind>,
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self {
            order: vec![
                DiffEngineKind::DotGraph,
                DiffEngineKind::Text,
                DiffEngineKind::Fallback,
            ],
        }
    }
}

impl EngineRegistry {
    /// Registry from engine names; unknown names are skipped and the
    /// fallback engine always comes last, wherever it was listed.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut order = Vec::new();
        for name in names {
            match DiffEngineKind::from_name(name.as_ref()) {
                Some(DiffEngineKind::Fallback) => {}
                Some(kind) if !order.contains(&kind) => order.push(kind),
                Some(_) => {}
                None => warn!("Skipping unknown diff engine '{}'", name.as_ref()),
            }
        }
        order.push(DiffEngineKind::Fallback);
        Self { order }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        if config.engine_order.is_empty() {
            Self::default()
        } else {
            Self::from_names(&config.engine_order)
        }
    }

    pub fn engines(&self) -> &[DiffEngineKind] {
        &self.order
    }

    /// Engine for `format`: the explicitly named one when it supports the
    /// format, otherwise the first registered engine that does.
    pub fn resolve(&self, explicit: Option<&str>, format: &str) -> DiffEngineKind {
        if let Some(name) = explicit.filter(|n| !n.trim().is_empty()) {
            match DiffEngineKind::from_name(name) {
                Some(kind) if kind.supports(format) => {
                    debug!("Using engine {} for format '{}'", kind, format);
                    return kind;
                }
                Some(kind) => debug!("Engine {} does not support format '{}'", kind, format),
                None if UNAVAILABLE_ENGINES.contains(&name.trim().to_ascii_lowercase().as_str()) => {
                    warn!("Diff engine '{}' is not available, resolving by format", name)
                }
                None => warn!("Unknown diff engine '{}', resolving by format", name),
            }
        }

        let kind = self
            .order
            .iter()
            .copied()
            .find(|engine| engine.supports(format))
            .unwrap_or(DiffEngineKind::Fallback);
        debug!("Resolved engine {} for format '{}'", kind, format);
        kind
    }
}
