use actx_core::ContextStore;
use tempfile::tempdir;

fn seeded_store() -> (tempfile::TempDir, ContextStore) {
    let dir = tempdir().expect("tempdir");
    let store = ContextStore::initialize(dir.path().join("repo"), "main").expect("initialize");
    store
        .replace("main", "deploy plan: rolling", "Plan the deploy")
        .unwrap();
    store
        .replace("main", "rollback notes", "Record incident followup")
        .unwrap();
    store
        .replace("main", "final summary", "Compress context")
        .unwrap();
    (dir, store)
}

fn kw(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[test]
fn matches_message_or_content_case_insensitively() {
    let (_dir, store) = seeded_store();

    // "DEPLOY" appears in content of the first commit and message of none.
    let hits = store.search("main", &kw(&["DEPLOY"]), 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].message, "Plan the deploy");

    // "incident" appears only in a commit message.
    let hits = store.search("main", &kw(&["incident"]), 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].message, "Record incident followup");
}

#[test]
fn any_keyword_matches_and_order_is_most_recent_first() {
    let (_dir, store) = seeded_store();
    let hits = store.search("main", &kw(&["summary", "rollback"]), 10).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].message, "Compress context");
    assert_eq!(hits[1].message, "Record incident followup");
}

#[test]
fn search_results_are_a_subset_of_history() {
    let (_dir, store) = seeded_store();
    let history = store.history("main", usize::MAX, None).unwrap();
    let hits = store.search("main", &kw(&["context"]), 10).unwrap();

    for hit in &hits {
        assert!(history.versions.iter().any(|v| v.id == hit.id));
    }
}

#[test]
fn absent_keyword_returns_nothing() {
    let (_dir, store) = seeded_store();
    let hits = store.search("main", &kw(&["zebra"]), 10).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn empty_keyword_list_returns_nothing() {
    let (_dir, store) = seeded_store();
    let hits = store.search("main", &[], 10).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn limit_bounds_collected_matches() {
    let dir = tempdir().expect("tempdir");
    let store = ContextStore::initialize(dir.path().join("repo"), "main").expect("initialize");
    for i in 0..6 {
        store
            .replace("main", &format!("needle {i}"), &format!("commit {i}"))
            .unwrap();
    }

    let hits = store.search("main", &kw(&["needle"]), 4).unwrap();
    assert_eq!(hits.len(), 4);
    // Most recent matches come first, older ones fall off the page.
    assert_eq!(hits[0].message, "commit 5");
    assert_eq!(hits[3].message, "commit 2");
}

#[test]
fn search_is_branch_scoped() {
    let (_dir, store) = seeded_store();
    let branches = actx_core::BranchManager::new(&store);
    branches.create("side", "main").unwrap();
    store.replace("side", "only on side", "side note").unwrap();

    let main_hits = store.search("main", &kw(&["side note"]), 10).unwrap();
    assert!(main_hits.is_empty());
    let side_hits = store.search("side", &kw(&["side note"]), 10).unwrap();
    assert_eq!(side_hits.len(), 1);
}
