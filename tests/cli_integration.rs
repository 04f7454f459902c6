//! Integration tests for the `shelf` CLI.
//!
//! Each test creates a temp shelf directory, runs `shelf` as a subprocess,
//! and verifies stdout and/or file contents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use pretty_assertions::assert_eq;
use serde_json::Value;

/// Path to the built `shelf` binary.
fn shelf_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_shelf"))
}

const CONFIG: &str = r#"[shelf]
name = "test-shelf"

[sections]
grouping = "status"
locked = []
"#;

const ITEMS: &str = r#"[
  {"id": "SHOW-001", "title": "Severance", "kind": "show", "status": "upcoming", "high_priority": true, "added": "2025-01-01", "order": 1000},
  {"id": "BOOK-001", "title": "Dune", "kind": "book", "status": "doing", "added": "2025-01-01", "order": 1000},
  {"id": "BOOK-002", "title": "Piranesi", "kind": "book", "status": "upcoming", "added": "2025-01-01", "order": 1000},
  {"id": "MOVIE-001", "title": "Heat", "kind": "movie", "status": "upcoming", "added": "2025-01-01", "order": 2000},
  {"id": "GAME-001", "title": "Hades", "kind": "game", "status": "done", "completed": 2023, "added": "2025-01-01", "order": 1000}
]
"#;

/// Create a test shelf:
///
/// [high] SHOW-001 [doing] BOOK-001 [upcoming] BOOK-002 MOVIE-001 [done] GAME-001
fn create_test_shelf(root: &Path) {
    create_shelf_with(root, CONFIG, ITEMS);
}

fn create_shelf_with(root: &Path, config: &str, items: &str) {
    let shelf_dir = root.join("shelf");
    fs::create_dir_all(&shelf_dir).unwrap();
    fs::write(shelf_dir.join("shelf.toml"), config).unwrap();
    fs::write(shelf_dir.join("items.json"), items).unwrap();
}

/// Run `shelf` with the given args in the given directory, returning (stdout, stderr, success).
fn run_shelf(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(shelf_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run shelf");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `shelf` expecting success, return stdout.
fn run_shelf_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_shelf(dir, args);
    if !success {
        panic!(
            "shelf {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// `shelf list --json`, as (section id, [item ids]) pairs
fn sections(dir: &Path) -> Vec<(String, Vec<String>)> {
    let out = run_shelf_ok(dir, &["list", "--json"]);
    let parsed: Value = serde_json::from_str(&out).unwrap();
    parsed["sections"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            let ids = s["items"]
                .as_array()
                .unwrap()
                .iter()
                .map(|i| i["id"].as_str().unwrap().to_string())
                .collect();
            (s["id"].as_str().unwrap().to_string(), ids)
        })
        .collect()
}

fn stored_item(dir: &Path, id: &str) -> Value {
    let text = fs::read_to_string(dir.join("shelf/items.json")).unwrap();
    let items: Vec<Value> = serde_json::from_str(&text).unwrap();
    items
        .into_iter()
        .find(|i| i["id"] == id)
        .unwrap_or_else(|| panic!("{} not stored", id))
}

fn s(v: &[&str]) -> Vec<String> {
    v.iter().map(|x| x.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Read command tests
// ---------------------------------------------------------------------------

#[test]
fn test_list_default() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());

    let out = run_shelf_ok(tmp.path(), &["list"]);
    assert!(out.contains("== High priority (1) =="));
    assert!(out.contains("== Upcoming (2) =="));
    let pos = |id: &str| out.find(id).unwrap();
    assert!(pos("SHOW-001") < pos("BOOK-001"));
    assert!(pos("BOOK-001") < pos("BOOK-002"));
    assert!(pos("BOOK-002") < pos("MOVIE-001"));
    assert!(pos("MOVIE-001") < pos("GAME-001"));
}

#[test]
fn test_list_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());

    assert_eq!(
        sections(tmp.path()),
        vec![
            ("high".to_string(), s(&["SHOW-001"])),
            ("doing".to_string(), s(&["BOOK-001"])),
            ("upcoming".to_string(), s(&["BOOK-002", "MOVIE-001"])),
            ("done".to_string(), s(&["GAME-001"])),
        ]
    );
}

#[test]
fn test_list_by_year() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());

    let out = run_shelf_ok(tmp.path(), &["list", "--grouping", "year", "--json"]);
    let parsed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["grouping"], "year");
    assert_eq!(parsed["sections"][0]["id"], "pending");
    assert_eq!(parsed["sections"][0]["items"].as_array().unwrap().len(), 4);
    assert_eq!(parsed["sections"][1]["id"], "y2023");
    assert_eq!(parsed["sections"][1]["name"], "2023");
}

#[test]
fn test_not_a_shelf() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, success) = run_shelf(tmp.path(), &["list"]);
    assert!(!success);
    assert!(stderr.contains("not a shelf"));
}

#[test]
fn test_shelf_dir_flag() {
    let tmp = tempfile::TempDir::new().unwrap();
    let elsewhere = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());

    let dir = tmp.path().to_str().unwrap();
    let out = run_shelf_ok(elsewhere.path(), &["-C", dir, "list"]);
    assert!(out.contains("SHOW-001"));
}

// ---------------------------------------------------------------------------
// Write command tests
// ---------------------------------------------------------------------------

#[test]
fn test_add_goes_to_end_of_section() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());

    let out = run_shelf_ok(tmp.path(), &["add", "Arrival", "--kind", "movie"]);
    assert_eq!(out.trim(), "MOVIE-002");
    assert_eq!(
        sections(tmp.path())[2],
        ("upcoming".to_string(), s(&["BOOK-002", "MOVIE-001", "MOVIE-002"]))
    );
    let stored = stored_item(tmp.path(), "MOVIE-002");
    assert_eq!(stored["order"], 3000);
    assert_eq!(stored["title"], "Arrival");
}

#[test]
fn test_add_json_with_status() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());

    let out = run_shelf_ok(
        tmp.path(),
        &["add", "Outer Wilds", "--kind", "game", "--status", "doing", "--owned", "--json"],
    );
    let parsed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["id"], "GAME-002");
    assert_eq!(parsed["status"], "doing");
    assert_eq!(parsed["owned"], true);
    assert_eq!(parsed["order"], 2000);
}

#[test]
fn test_mv_before_within_section() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());

    run_shelf_ok(tmp.path(), &["mv", "MOVIE-001", "--before", "BOOK-002"]);
    assert_eq!(
        sections(tmp.path())[2],
        ("upcoming".to_string(), s(&["MOVIE-001", "BOOK-002"]))
    );
    // only the moved item got a new key
    assert_eq!(stored_item(tmp.path(), "MOVIE-001")["order"], 500);
    assert_eq!(stored_item(tmp.path(), "BOOK-002")["order"], 1000);
}

#[test]
fn test_mv_after_into_other_section() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());

    let out = run_shelf_ok(tmp.path(), &["mv", "BOOK-002", "--after", "BOOK-001", "--json"]);
    let parsed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["moved"], true);
    assert_eq!(parsed["from_section"], "upcoming");
    assert_eq!(parsed["to_section"], "doing");
    assert_eq!(parsed["order"], 2000);

    assert_eq!(stored_item(tmp.path(), "BOOK-002")["status"], "doing");
    assert_eq!(
        sections(tmp.path())[1],
        ("doing".to_string(), s(&["BOOK-001", "BOOK-002"]))
    );
}

#[test]
fn test_mv_top_of_high_sets_priority() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());

    run_shelf_ok(tmp.path(), &["mv", "BOOK-002", "--top", "--section", "high"]);
    assert_eq!(
        sections(tmp.path())[0],
        ("high".to_string(), s(&["BOOK-002", "SHOW-001"]))
    );
    let stored = stored_item(tmp.path(), "BOOK-002");
    assert_eq!(stored["high_priority"], true);
    assert_eq!(stored["order"], 500);
}

#[test]
fn test_mv_already_in_place() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());
    let before = fs::read_to_string(tmp.path().join("shelf/items.json")).unwrap();

    let out = run_shelf_ok(tmp.path(), &["mv", "MOVIE-001", "--bottom"]);
    assert!(out.contains("already in place"));
    let after = fs::read_to_string(tmp.path().join("shelf/items.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_mv_into_locked_section_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_shelf_with(
        tmp.path(),
        &CONFIG.replace("locked = []", "locked = [\"done\"]"),
        ITEMS,
    );
    let before = fs::read_to_string(tmp.path().join("shelf/items.json")).unwrap();

    let (_, stderr, success) = run_shelf(
        tmp.path(),
        &["mv", "BOOK-002", "--bottom", "--section", "done"],
    );
    assert!(!success);
    assert!(stderr.contains("does not accept dragged items"));
    let after = fs::read_to_string(tmp.path().join("shelf/items.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_mv_requires_a_place() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());
    let (_, _, success) = run_shelf(tmp.path(), &["mv", "BOOK-002"]);
    assert!(!success);
}

#[test]
fn test_rm_drops_empty_section() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());

    let out = run_shelf_ok(tmp.path(), &["rm", "game-001"]);
    assert!(out.contains("removed GAME-001 (Hades)"));
    let ids: Vec<String> = sections(tmp.path()).into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, s(&["high", "doing", "upcoming"]));
}

#[test]
fn test_status_moves_item() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());

    let out = run_shelf_ok(tmp.path(), &["status", "BOOK-002", "done"]);
    assert!(out.contains("now in Done"));
    let done = &sections(tmp.path())[3];
    assert_eq!(done.0, "done");
    assert!(done.1.contains(&"BOOK-002".to_string()));
    assert!(stored_item(tmp.path(), "BOOK-002")["completed"].is_i64());

    let check = run_shelf_ok(tmp.path(), &["check"]);
    assert!(check.contains("✓ shelf is valid"));
}

#[test]
fn test_status_priority_only() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());

    run_shelf_ok(tmp.path(), &["status", "SHOW-001", "--no-high"]);
    assert_eq!(sections(tmp.path())[0].0, "doing");
    assert_eq!(stored_item(tmp.path(), "SHOW-001")["high_priority"], false);
}

#[test]
fn test_status_needs_a_change() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());
    let (_, stderr, success) = run_shelf(tmp.path(), &["status", "BOOK-002"]);
    assert!(!success);
    assert!(stderr.contains("nothing to change"));
}

#[test]
fn test_check_and_rebalance() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_shelf_with(
        tmp.path(),
        CONFIG,
        r#"[
  {"id": "BOOK-001", "title": "A", "kind": "book", "added": "2025-01-01", "order": 7},
  {"id": "BOOK-002", "title": "B", "kind": "book", "added": "2025-01-01", "order": 7}
]"#,
    );

    let out = run_shelf_ok(tmp.path(), &["check", "--json"]);
    let parsed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["valid"], false);
    assert_eq!(parsed["errors"][0]["type"], "order_collision");

    let out = run_shelf_ok(tmp.path(), &["rebalance", "upcoming"]);
    assert!(out.contains("upcoming: 2 items re-spaced"));
    assert_eq!(stored_item(tmp.path(), "BOOK-001")["order"], 1000);
    assert_eq!(stored_item(tmp.path(), "BOOK-002")["order"], 2000);

    let out = run_shelf_ok(tmp.path(), &["check"]);
    assert!(out.contains("✓ shelf is valid"));
}

// ---------------------------------------------------------------------------
// Section management
// ---------------------------------------------------------------------------

#[test]
fn test_section_lock_and_unlock() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());

    let out = run_shelf_ok(tmp.path(), &["section", "lock", "done"]);
    assert_eq!(out.trim(), "locked done");
    let toml = fs::read_to_string(tmp.path().join("shelf/shelf.toml")).unwrap();
    assert!(toml.contains("\"done\""));
    assert!(toml.contains("name = \"test-shelf\""));

    let (_, _, success) = run_shelf(tmp.path(), &["mv", "MOVIE-001", "--after", "GAME-001"]);
    assert!(!success);

    let out = run_shelf_ok(tmp.path(), &["section", "unlock", "done"]);
    assert_eq!(out.trim(), "unlocked done");
    run_shelf_ok(tmp.path(), &["mv", "MOVIE-001", "--after", "GAME-001"]);
    assert_eq!(stored_item(tmp.path(), "MOVIE-001")["status"], "done");
}

#[test]
fn test_section_lock_unknown_id() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_shelf(tmp.path());
    let (_, stderr, success) = run_shelf(tmp.path(), &["section", "lock", "y2023"]);
    assert!(!success);
    assert!(stderr.contains("unknown section"));
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

#[test]
fn test_init_creates_empty_shelf() {
    let tmp = tempfile::TempDir::new().unwrap();

    let out = run_shelf_ok(tmp.path(), &["init", "--name", "My Shelf", "--grouping", "year"]);
    assert!(out.contains("Initialized shelf: My Shelf"));
    assert_eq!(
        fs::read_to_string(tmp.path().join("shelf/items.json")).unwrap(),
        "[]\n"
    );
    let out = run_shelf_ok(tmp.path(), &["list"]);
    assert!(out.contains("(empty shelf)"));

    let (_, stderr, success) = run_shelf(tmp.path(), &["init"]);
    assert!(!success);
    assert!(stderr.contains("already exists"));
}

#[test]
fn test_init_then_add_and_list() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_shelf_ok(tmp.path(), &["init"]);
    run_shelf_ok(tmp.path(), &["add", "Dune", "--kind", "book"]);
    run_shelf_ok(tmp.path(), &["add", "Heat", "--kind", "movie", "--high"]);
    assert_eq!(
        sections(tmp.path()),
        vec![
            ("high".to_string(), s(&["MOVIE-001"])),
            ("upcoming".to_string(), s(&["BOOK-001"])),
        ]
    );
}
