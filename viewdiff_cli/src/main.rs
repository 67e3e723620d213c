use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use viewdiff_common::{
    ensure_config, load_config, load_config_from, save_config, AppConfig, DiffTag, Graph,
    LoadedConfig, TreeSnapshot, ViewTree,
};
use viewdiff_core::graph_diff::{DiffState, DiffSummary};
use viewdiff_core::{comparison_view, graph_view_tree, GraphDiffEngine, TagCounts, TreeMerger};

/// Process exit status when the inputs differ
const EXIT_DIFFERENT: i32 = 2;

#[derive(Parser)]
#[command(name = "viewdiff")]
#[command(author = "ViewDiff Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Structural differences between versions of graph and tree views", long_about = None)]
struct Cli {
    /// Configuration file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Look for the configuration next to the executable
    #[arg(long, global = true)]
    portable: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two graphs given in the JSON graph model
    Graph {
        /// Previous version
        old: PathBuf,

        /// Current version
        new: PathBuf,

        /// Write the DOT document to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output the change classification as JSON
        #[arg(long)]
        json: bool,

        /// Skip copying unchanged links between materialized nodes
        #[arg(long)]
        no_context: bool,
    },

    /// Merge two view trees given as JSON snapshots
    Tree {
        /// Previous version
        old: PathBuf,

        /// Current version
        new: PathBuf,

        /// Diff engine for every leaf (dot-graph, text, side-by-side, fallback)
        #[arg(short, long)]
        engine: Option<String>,

        /// Output the merged tree as a JSON snapshot
        #[arg(long)]
        json: bool,

        /// Show only added, removed and changed nodes
        #[arg(short = 'd', long)]
        diff_only: bool,
    },

    /// Build the view trees of two graphs and merge them
    View {
        /// Previous version
        old: PathBuf,

        /// Current version
        new: PathBuf,

        /// Diff engine for every leaf (dot-graph, text, side-by-side, fallback)
        #[arg(short, long)]
        engine: Option<String>,

        /// Output the view as a JSON snapshot
        #[arg(long)]
        json: bool,

        /// Output only the differences, without both versions alongside
        #[arg(short = 'd', long)]
        diff_only: bool,
    },

    /// Print the active configuration
    Config {
        /// Write the default configuration if no file exists yet
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    // Logs go to stderr so JSON output stays clean on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;
    let portable = cli.portable;

    let outcome = match cli.command {
        Commands::Graph {
            old,
            new,
            out,
            json,
            no_context,
        } => run_graph(&old, &new, out, json, no_context, config, portable)
            .context("Graph comparison failed"),
        Commands::Tree {
            old,
            new,
            engine,
            json,
            diff_only,
        } => run_tree(&old, &new, engine, json, diff_only, config, portable)
            .context("Tree merge failed"),
        Commands::View {
            old,
            new,
            engine,
            json,
            diff_only,
        } => run_view(&old, &new, engine, json, diff_only, config, portable)
            .context("View comparison failed"),
        Commands::Config { init } => run_config(init, config, portable).map(|_| false),
    };

    match outcome {
        Ok(true) => std::process::exit(EXIT_DIFFERENT),
        Ok(false) => {}
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

fn load(config: Option<PathBuf>, portable: bool) -> Result<LoadedConfig> {
    let loaded = match config {
        Some(path) => load_config_from(&path)?,
        None => load_config(portable)?,
    };
    if loaded.exists {
        info!("Using configuration {}", loaded.path.display());
    }
    Ok(loaded)
}

fn read_input(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("Input does not exist: {}", path.display());
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_graph(path: &Path) -> Result<Graph> {
    let data = read_input(path)?;
    serde_json::from_str(&data).with_context(|| format!("Invalid graph in {}", path.display()))
}

fn read_tree(path: &Path) -> Result<ViewTree> {
    let data = read_input(path)?;
    let snapshot: TreeSnapshot =
        serde_json::from_str(&data).with_context(|| format!("Invalid tree in {}", path.display()))?;
    Ok(ViewTree::from(snapshot))
}

#[derive(Serialize)]
struct GraphReport<'a> {
    old: String,
    new: String,
    summary: DiffSummary,
    changes: &'a DiffState,
    diagnostics: &'a [String],
}

/// Returns whether the graphs differ
fn run_graph(
    old: &Path,
    new: &Path,
    out: Option<PathBuf>,
    json: bool,
    no_context: bool,
    config: Option<PathBuf>,
    portable: bool,
) -> Result<bool> {
    let loaded = load(config, portable)?;
    let mut graph_config = loaded.config.graph;
    if no_context {
        graph_config.context_completion = false;
    }

    info!("Comparing graphs:");
    info!("  Previous: {}", old.display());
    info!("  Current:  {}", new.display());

    let old_graph = read_graph(old)?;
    let new_graph = read_graph(new)?;
    debug!(
        "Loaded {} nodes / {} links and {} nodes / {} links",
        old_graph.nodes.len(),
        old_graph.link_count(),
        new_graph.nodes.len(),
        new_graph.link_count()
    );
    let diff = GraphDiffEngine::from_config(&graph_config).compare(&old_graph, &new_graph)?;

    if json {
        let report = GraphReport {
            old: old.display().to_string(),
            new: new.display().to_string(),
            summary: diff.summary(),
            changes: diff.state(),
            diagnostics: diff.diagnostics(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let dot = diff.to_dot(&graph_config.colors);
        match out {
            Some(path) => {
                fs::write(&path, dot).with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Wrote {}", path.display());
            }
            None => print!("{dot}"),
        }
    }

    Ok(!diff.is_empty())
}

/// Returns whether the trees differ
fn run_tree(
    old: &Path,
    new: &Path,
    engine: Option<String>,
    json: bool,
    diff_only: bool,
    config: Option<PathBuf>,
    portable: bool,
) -> Result<bool> {
    let loaded = load(config, portable)?;
    let old_tree = read_tree(old)?;
    let new_tree = read_tree(new)?;

    let merged = merge(&loaded.config, &old_tree, &new_tree, engine);
    let counts = TagCounts::of(&merged);
    let merged = if diff_only { retain_changes(&merged) } else { merged };

    print_tree(&merged, json)?;
    print_counts(&counts, json);
    Ok(counts.has_changes())
}

/// Returns whether the graphs' views differ
fn run_view(
    old: &Path,
    new: &Path,
    engine: Option<String>,
    json: bool,
    diff_only: bool,
    config: Option<PathBuf>,
    portable: bool,
) -> Result<bool> {
    let loaded = load(config, portable)?;
    let old_view = graph_view_tree(read_graph(old)?);
    let new_view = graph_view_tree(read_graph(new)?);

    let merged = merge(&loaded.config, &old_view, &new_view, engine);
    let counts = TagCounts::of(&merged);
    let view = if diff_only {
        retain_changes(&merged)
    } else {
        comparison_view(merged, new_view, old_view)
    };

    print_tree(&view, json)?;
    print_counts(&counts, json);
    Ok(counts.has_changes())
}

fn run_config(init: bool, config: Option<PathBuf>, portable: bool) -> Result<()> {
    let loaded = match (init, config) {
        (true, Some(path)) => {
            let loaded = load_config_from(&path)?;
            if !loaded.exists {
                save_config(&path, &loaded.config)?;
            }
            loaded
        }
        (true, None) => ensure_config(portable)?,
        (false, config) => load(config, portable)?,
    };

    println!("# {}", loaded.path.display());
    print!("{}", toml::to_string_pretty(&loaded.config)?);
    Ok(())
}

fn merge(config: &AppConfig, old: &ViewTree, new: &ViewTree, engine: Option<String>) -> ViewTree {
    let engine = engine.or_else(|| config.default_engine.clone());
    if let Some(name) = &engine {
        info!("Using diff engine {}", name);
    }
    TreeMerger::from_config(config).diff_merge(old, new, engine.as_deref())
}

/// Copy of the tree without unchanged subtrees; the root is always kept
fn retain_changes(tree: &ViewTree) -> ViewTree {
    fn prune(node: &ViewTree) -> Option<ViewTree> {
        let children: Vec<ViewTree> = node.children.iter().filter_map(prune).collect();
        let changed = matches!(node.tag, Some(tag) if tag != DiffTag::Unchanged);
        if !changed && children.is_empty() {
            return None;
        }
        Some(ViewTree {
            children,
            ..without_children(node)
        })
    }

    ViewTree {
        children: tree.children.iter().filter_map(prune).collect(),
        ..without_children(tree)
    }
}

fn without_children(node: &ViewTree) -> ViewTree {
    ViewTree {
        content: node.content.clone(),
        tag: node.tag,
        ..node.shell()
    }
}

fn print_tree(tree: &ViewTree, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&tree.snapshot()?)?);
        return Ok(());
    }

    tree.walk(&mut |node, depth| {
        println!("{}{}", "  ".repeat(depth), node.display_name());
    });
    Ok(())
}

fn print_counts(counts: &TagCounts, json: bool) {
    if json {
        return;
    }
    println!("\n{}", "=".repeat(40));
    println!("Summary:");
    println!("  Added:     {}", counts.added);
    println!("  Removed:   {}", counts.removed);
    println!("  Changed:   {}", counts.changed);
    println!("  Unchanged: {}", counts.unchanged);
    println!("{}", "=".repeat(40));
}
