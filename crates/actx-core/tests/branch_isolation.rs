use actx_core::{BranchManager, ContextStore};
use tempfile::tempdir;

#[test]
fn writes_on_one_branch_never_leak_to_another() {
    let dir = tempdir().expect("tempdir");
    let store = ContextStore::initialize(dir.path().join("repo"), "main").expect("initialize");
    let branches = BranchManager::new(&store);

    branches.create("agent-a", "main").unwrap();
    branches.create("agent-b", "main").unwrap();

    store.replace("agent-a", "a's scratchpad", "a writes").unwrap();
    store.replace("agent-b", "b's scratchpad", "b writes").unwrap();

    assert_eq!(store.read_current("agent-a").unwrap(), "a's scratchpad");
    assert_eq!(store.read_current("agent-b").unwrap(), "b's scratchpad");
    assert_eq!(store.read_current("main").unwrap(), "");
}

#[test]
fn fork_shares_history_without_copying_content() {
    let dir = tempdir().expect("tempdir");
    let store = ContextStore::initialize(dir.path().join("repo"), "main").expect("initialize");
    store.replace("main", "inherited", "seed").unwrap();
    let parent_tip = store.history("main", 1, None).unwrap().versions[0].id;

    let branches = BranchManager::new(&store);
    branches.create("child", "main").unwrap();

    // The child's tip is the same version record, not a copy.
    let child_tip = store.history("child", 1, None).unwrap().versions[0].id;
    assert_eq!(child_tip, parent_tip);
    assert_eq!(store.read_current("child").unwrap(), "inherited");
}

#[test]
fn parent_moves_do_not_move_the_child() {
    let dir = tempdir().expect("tempdir");
    let store = ContextStore::initialize(dir.path().join("repo"), "main").expect("initialize");
    store.replace("main", "before fork", "seed").unwrap();

    let branches = BranchManager::new(&store);
    branches.create("child", "main").unwrap();
    store.replace("main", "after fork", "parent update").unwrap();

    assert_eq!(store.read_current("child").unwrap(), "before fork");
}

#[test]
fn child_history_extends_from_the_fork_point() {
    let dir = tempdir().expect("tempdir");
    let store = ContextStore::initialize(dir.path().join("repo"), "main").expect("initialize");
    store.replace("main", "shared", "shared commit").unwrap();

    let branches = BranchManager::new(&store);
    branches.create("child", "main").unwrap();
    store.replace("child", "child only", "child commit").unwrap();

    let child_history = store.history("child", 10, None).unwrap();
    let messages: Vec<&str> = child_history
        .versions
        .iter()
        .map(|v| v.message.as_str())
        .collect();
    assert_eq!(
        messages,
        vec![
            "child commit",
            "shared commit",
            "Initialize context repository"
        ]
    );

    // The shared commit stays reachable from both branches.
    let main_history = store.history("main", 10, None).unwrap();
    assert!(main_history
        .versions
        .iter()
        .any(|v| v.message == "shared commit"));
}

#[test]
fn snapshots_survive_branch_divergence() {
    let dir = tempdir().expect("tempdir");
    let store = ContextStore::initialize(dir.path().join("repo"), "main").expect("initialize");
    let id = store.replace("main", "pre-fork state", "seed").unwrap();

    let branches = BranchManager::new(&store);
    branches.create("child", "main").unwrap();
    store.replace("main", "main diverged", "m").unwrap();
    store.replace("child", "child diverged", "c").unwrap();

    let snap = store.snapshot(&id.to_hex()).unwrap();
    assert_eq!(snap.content, "pre-fork state");
}
