pub mod graph_diff;
pub mod engine;
pub mod normalize;
pub mod resources;
pub mod tree_merge;
pub mod graph_view;

pub use graph_diff::{AnnotatedGraph, GraphDiff, GraphDiffEngine, PaintCategory};
pub use engine::{DiffEngineKind, EngineContext, EngineRegistry, GraphParser, JsonGraphParser, LeafDiff};
pub use normalize::ContentNormalizer;
pub use resources::ResourceProvider;
pub use tree_merge::{comparison_view, TagCounts, TreeMerger};
pub use graph_view::graph_view_tree;
