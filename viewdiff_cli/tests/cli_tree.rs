use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const OLD_TREE: &str = r#"{
    "name": "",
    "children": [
        {"name": "README", "format": "text", "content": "one\ntwo\nthree\n"},
        {"name": "docs", "children": [
            {"name": "intro", "format": "text", "content": "hello"},
            {"name": "legacy", "format": "text", "content": "old"}
        ]}
    ]
}"#;

const NEW_TREE: &str = r#"{
    "name": "",
    "children": [
        {"name": "README", "format": "text", "content": "one\n2\nthree\n"},
        {"name": "docs", "children": [
            {"name": "intro", "format": "text", "content": "hello"},
            {"name": "guide", "format": "text", "content": "new"}
        ]}
    ]
}"#;

fn run_cli(args: &[&str]) -> Output {
    let exe = env!("CARGO_BIN_EXE_viewdiff");
    let config_dir = TempDir::new().expect("config dir");
    Command::new(exe)
        .args(args)
        .env("XDG_CONFIG_HOME", config_dir.path())
        .env("APPDATA", config_dir.path())
        .env("HOME", config_dir.path())
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run viewdiff")
}

fn run_cli_json(args: &[&str]) -> (Option<i32>, Value) {
    let output = run_cli(args);
    let code = output.status.code();
    assert!(
        code == Some(0) || code == Some(2),
        "command failed: {} (expected 0 or 2)\n{}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout not utf-8");
    (code, serde_json::from_str(&stdout).expect("invalid json output"))
}

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write input");
    path.to_string_lossy().into_owned()
}

fn child<'a>(node: &'a Value, name: &str) -> &'a Value {
    node["children"]
        .as_array()
        .expect("children")
        .iter()
        .find(|c| c["name"] == name)
        .unwrap_or_else(|| panic!("no child {name}"))
}

fn child_names(node: &Value) -> Vec<String> {
    node["children"]
        .as_array()
        .map(|children| {
            children
                .iter()
                .map(|c| c["name"].as_str().expect("name").to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn test_tree_merge_json() {
    let dir = TempDir::new().expect("input dir");
    let old = write(dir.path(), "old.json", OLD_TREE);
    let new = write(dir.path(), "new.json", NEW_TREE);

    let (code, merged) = run_cli_json(&["tree", &old, &new, "--json"]);
    assert_eq!(code, Some(2));

    assert_eq!(child_names(&merged), vec!["README", "docs"]);
    let readme = child(&merged, "README");
    assert_eq!(readme["tag"], "changed");
    let diff = readme["content"].as_str().expect("diff text");
    assert!(diff.contains("-two"));
    assert!(diff.contains("+2"));

    let docs = child(&merged, "docs");
    assert_eq!(child_names(docs), vec!["intro", "legacy", "guide"]);
    assert_eq!(child(docs, "intro")["tag"], "unchanged");
    assert_eq!(child(docs, "legacy")["tag"], "removed");
    assert_eq!(child(docs, "guide")["tag"], "added");
}

#[test]
fn test_tree_diff_only_drops_unchanged() {
    let dir = TempDir::new().expect("input dir");
    let old = write(dir.path(), "old.json", OLD_TREE);
    let new = write(dir.path(), "new.json", NEW_TREE);

    let (_, merged) = run_cli_json(&["tree", &old, &new, "--json", "--diff-only"]);
    let docs = child(&merged, "docs");
    assert_eq!(child_names(docs), vec!["legacy", "guide"]);
}

#[test]
fn test_tree_explicit_engine() {
    let dir = TempDir::new().expect("input dir");
    let old = write(dir.path(), "old.json", OLD_TREE);
    let new = write(dir.path(), "new.json", NEW_TREE);

    let (_, merged) = run_cli_json(&["tree", &old, &new, "--json", "--engine", "fallback"]);
    let readme = child(&merged, "README");
    assert_eq!(readme["content"], "README: Content differs");
}

#[test]
fn test_identical_trees_exit_zero() {
    let dir = TempDir::new().expect("input dir");
    let old = write(dir.path(), "old.json", OLD_TREE);

    let output = run_cli(&["tree", &old, &old]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8(output.stdout).expect("stdout not utf-8");
    assert!(stdout.contains("(root)"));
    assert!(stdout.contains("  README"));
    assert!(stdout.contains("Unchanged: 5"));
    assert!(!stdout.contains("(Changed)"));
}

#[test]
fn test_view_of_graphs() {
    let dir = TempDir::new().expect("input dir");
    let old = write(
        dir.path(),
        "old.json",
        r#"{"nodes": [{"name": "A", "links": [{"target": "B", "attributes": {"name": "ab"}}]},
                      {"name": "B"}]}"#,
    );
    let new = write(
        dir.path(),
        "new.json",
        r#"{"nodes": [{"name": "A", "links": [{"target": "C", "attributes": {"name": "ab"}}]},
                      {"name": "B"}, {"name": "C"}]}"#,
    );

    let (code, view) = run_cli_json(&["view", &old, &new, "--json"]);
    assert_eq!(code, Some(2));
    assert_eq!(
        child_names(&view),
        vec!["Differences", "Current Version", "Previous Version"]
    );

    let differences = child(&view, "Differences");
    let overview = child(differences, "Graph");
    assert_eq!(overview["tag"], "changed");
    assert_eq!(overview["format"], "graphviz-dot");
    assert!(overview["content"].as_str().expect("dot").contains("digraph"));

    let nodes = child(differences, "Nodes");
    assert_eq!(child(nodes, "C")["tag"], "added");
    assert_eq!(child(nodes, "A")["tag"], "changed");
}

#[test]
fn test_config_init_writes_defaults() {
    let dir = TempDir::new().expect("config dir");
    let path = dir.path().join("viewdiff.toml");
    let path_arg = path.to_str().expect("utf-8 path");

    let output = run_cli(&["config", "--init", "--config", path_arg]);
    assert_eq!(output.status.code(), Some(0));
    assert!(path.exists());

    let written = fs::read_to_string(&path).expect("config file");
    assert!(written.contains("context_completion = true"));
    let stdout = String::from_utf8(output.stdout).expect("stdout not utf-8");
    assert!(stdout.contains("#CC3311"));
}

#[test]
fn test_invalid_tree_fails() {
    let dir = TempDir::new().expect("input dir");
    let old = write(dir.path(), "old.json", OLD_TREE);
    let broken = write(dir.path(), "broken.json", "{ not json");

    let output = run_cli(&["tree", &old, &broken]);
    assert_eq!(output.status.code(), Some(1));
}
