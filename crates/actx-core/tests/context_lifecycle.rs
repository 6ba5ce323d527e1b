use actx_core::{ContextError, ContextStore, TokenApproach, TokenMeter};
use tempfile::tempdir;

#[test]
fn initialize_replace_append_scenario() {
    let dir = tempdir().expect("tempdir");
    let store = ContextStore::initialize(dir.path().join("repo"), "master").expect("initialize");

    store.replace("master", "hello", "seed").expect("replace");
    store.append("master", " world", "grow").expect("append");

    assert_eq!(store.read_current("master").unwrap(), "hello world");

    let page = store.history("master", 10, None).unwrap();
    // Two content versions plus the initialization version.
    assert_eq!(page.total_versions, 3);
    assert_eq!(page.versions[0].message, "grow");
    assert_eq!(page.versions[1].message, "seed");
    assert!(!page.has_more);
}

#[test]
fn read_after_initialize_is_empty() {
    let dir = tempdir().expect("tempdir");
    let store = ContextStore::initialize(dir.path().join("repo"), "main").expect("initialize");
    assert_eq!(store.read_current("main").unwrap(), "");
}

#[test]
fn replace_returns_exactly_what_was_written() {
    let dir = tempdir().expect("tempdir");
    let store = ContextStore::initialize(dir.path().join("repo"), "main").expect("initialize");

    for content in ["first", "second\nwith lines", "", "third after empty"] {
        store.replace("main", content, "write").unwrap();
        assert_eq!(store.read_current("main").unwrap(), content);
    }
}

#[test]
fn append_equals_replace_of_concatenation() {
    let dir = tempdir().expect("tempdir");
    let store = ContextStore::initialize(dir.path().join("repo"), "main").expect("initialize");

    store.replace("main", "alpha", "seed").unwrap();
    let before = store.read_current("main").unwrap();
    store.append("main", "-beta", "append").unwrap();
    assert_eq!(store.read_current("main").unwrap(), format!("{before}-beta"));

    // Appending to empty content is plain assignment.
    store.replace("main", "", "clear").unwrap();
    store.append("main", "fresh", "append to empty").unwrap();
    assert_eq!(store.read_current("main").unwrap(), "fresh");
}

#[test]
fn snapshot_preserves_every_version_ever_created() {
    let dir = tempdir().expect("tempdir");
    let store = ContextStore::initialize(dir.path().join("repo"), "main").expect("initialize");

    let mut written = Vec::new();
    for i in 0..5 {
        let content = format!("state {i}");
        let id = store.replace("main", &content, &format!("commit {i}")).unwrap();
        written.push((id, content));
    }

    // Later operations must not disturb earlier snapshots.
    store.replace("main", "final", "overwrite everything").unwrap();

    for (id, content) in &written {
        let snap = store.snapshot(&id.to_hex()).unwrap();
        assert_eq!(&snap.content, content);
    }
}

#[test]
fn operations_on_missing_repository_fail_cleanly() {
    let dir = tempdir().expect("tempdir");
    match ContextStore::open(dir.path().join("nowhere")) {
        Err(ContextError::NotInitialized) => {}
        other => panic!("expected NotInitialized, got {other:?}"),
    }
}

#[test]
fn token_metrics_annotate_content() {
    let dir = tempdir().expect("tempdir");
    let store = ContextStore::initialize(dir.path().join("repo"), "main").expect("initialize");
    store.replace("main", &"x".repeat(4000), "fill").unwrap();

    let content = store.read_current("main").unwrap();
    let meter = TokenMeter::new(TokenApproach::CharDiv4);
    let metrics = meter.metrics(&content, 8000);
    assert_eq!(metrics.token_count, 1000);
    assert_eq!(metrics.token_pressure, 0.125);
}

#[test]
fn operation_log_records_commits() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("repo");
    let store = ContextStore::initialize(&root, "main").expect("initialize");
    store.replace("main", "logged", "first write").unwrap();

    let log = std::fs::read_to_string(root.join("logs/main.log")).unwrap();
    assert!(log.contains("initialized repository"));
    assert!(log.contains("first write"));
}
