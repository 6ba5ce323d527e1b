//! The context version store: durable, ordered, content-addressed storage
//! of the context blob's history, scoped per branch.
//!
//! On-disk layout under one repository root:
//!
//! ```text
//! <root>/
//!   objects/<hh>/<rest>     version records, content-addressed
//!   refs/<branch>           tip pointers
//!   HEAD                    checked-out branch name
//!   config.json             global config
//!   configs/<branch>.json   per-branch config overrides
//!   logs/<branch>.log       append-only operation log
//! ```

pub mod objects;
pub mod refs;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::debug;

use crate::config::ConfigResolver;
use crate::domain::error::{ContextError, Result};
use crate::domain::version::{HistoryPage, Snapshot, Version, VersionId, VersionSummary};
use crate::oplog::BranchLog;

use objects::ObjectStore;
use refs::RefStore;

const INIT_MESSAGE: &str = "Initialize context repository";

/// The version store. One instance per repository root.
///
/// Same-branch commits are serialized by a per-branch lock, and the pointer
/// update itself is a compare-and-swap, so two concurrent writers on one
/// branch race safely: one wins, the other sees `ConcurrentUpdateConflict`.
/// Cross-process writers only get the compare-and-swap; the window between
/// their read and their rename is not mutually excluded.
#[derive(Debug)]
pub struct ContextStore {
    root: PathBuf,
    objects: ObjectStore,
    refs: RefStore,
    commit_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ContextStore {
    /// Create the repository and its first branch with empty content.
    ///
    /// The claim on `<root>/objects` is a single atomic directory creation:
    /// with two concurrent initializers the first wins and the second gets
    /// `AlreadyInitialized`, never a half-initialized state it could open.
    pub fn initialize(root: impl AsRef<Path>, initial_branch: &str) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let objects = ObjectStore::create(&root)?;
        let refs = RefStore::create(&root)?;

        let resolver = ConfigResolver::new(&root);
        resolver.initialize_default()?;
        fs::create_dir_all(root.join("logs"))?;

        let initial = Version {
            parent: None,
            branch: initial_branch.to_string(),
            message: INIT_MESSAGE.to_string(),
            timestamp: Utc::now(),
            content: String::new(),
        };
        let id = objects.put(&initial)?;
        refs.create_branch(initial_branch, &id)?;
        refs.set_head(initial_branch)?;

        let store = Self {
            root,
            objects,
            refs,
            commit_locks: Mutex::new(HashMap::new()),
        };
        store
            .log(initial_branch)
            .info(&format!("initialized repository, branch '{initial_branch}' at {}", id.short()));
        Ok(store)
    }

    /// Open an existing repository.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let objects = ObjectStore::open(&root)?;
        let refs = RefStore::open(&root)?;
        Ok(Self {
            root,
            objects,
            refs,
            commit_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn refs(&self) -> &RefStore {
        &self.refs
    }

    fn log(&self, branch: &str) -> BranchLog {
        BranchLog::open(&self.root, branch)
    }

    fn commit_lock(&self, branch: &str) -> Arc<Mutex<()>> {
        let mut map = self
            .commit_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(branch.to_string()).or_default().clone()
    }

    /// Content at the branch tip.
    pub fn read_current(&self, branch: &str) -> Result<String> {
        let tip = self.refs.read(branch)?;
        let version = self.objects.get(&tip)?;
        self.log(branch)
            .info(&format!("read {} characters from tip {}", version.content.len(), tip.short()));
        Ok(version.content)
    }

    /// Record `new_content` as a new version on `branch` and advance the tip.
    ///
    /// The new version's content is exactly `new_content`; nothing is merged
    /// with the prior value.
    pub fn replace(&self, branch: &str, new_content: &str, message: &str) -> Result<VersionId> {
        let lock = self.commit_lock(branch);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let tip = self.refs.read(branch)?;
        self.commit(branch, tip, new_content.to_string(), message)
    }

    /// Append `text` to the branch's current content as a new version.
    ///
    /// Equivalent to `replace(branch, read_current(branch) + text)` carried
    /// out as one logical operation. A pointer race lost to an outside
    /// writer is retried once against the new tip, since append is defined
    /// against the content current at commit time.
    pub fn append(&self, branch: &str, text: &str, message: &str) -> Result<VersionId> {
        let lock = self.commit_lock(branch);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut attempts = 0;
        loop {
            let tip = self.refs.read(branch)?;
            let current = self.objects.get(&tip)?.content;
            let combined = format!("{current}{text}");
            match self.commit(branch, tip, combined, message) {
                Err(ContextError::ConcurrentUpdateConflict { .. }) if attempts == 0 => {
                    attempts += 1;
                    self.log(branch).info("append lost pointer race, retrying once");
                }
                other => return other,
            }
        }
    }

    // Single commit step: parent is the observed tip, pointer advance is a
    // compare-and-swap against it. Caller holds the branch commit lock.
    fn commit(
        &self,
        branch: &str,
        parent: VersionId,
        content: String,
        message: &str,
    ) -> Result<VersionId> {
        let version = Version {
            parent: Some(parent),
            branch: branch.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
            content,
        };
        let id = self.objects.put(&version)?;
        self.refs.compare_and_swap(branch, &parent, &id)?;

        debug!(branch, version = %id.short(), "committed context version");
        self.log(branch)
            .info(&format!("committed {}: {message}", id.short()));
        Ok(id)
    }

    /// One page of branch history, most recent first.
    ///
    /// `starting_after` resumes the walk strictly after that version. Pages
    /// already handed out never change retroactively; new versions only grow
    /// the set of pages at the front.
    pub fn history(
        &self,
        branch: &str,
        limit: usize,
        starting_after: Option<&VersionId>,
    ) -> Result<HistoryPage> {
        let tip = self.refs.read(branch)?;
        let total_versions = self.count_from(tip)?;

        let mut cursor = match starting_after {
            Some(after) => self.find_on_line(tip, after)?.parent,
            None => Some(tip),
        };

        let mut versions = Vec::new();
        let mut has_more = false;
        while let Some(id) = cursor {
            if versions.len() == limit {
                break;
            }
            let version = self.objects.get(&id)?;
            cursor = version.parent;
            has_more = version.parent.is_some();
            versions.push(version.summary(id));
        }
        if versions.is_empty() {
            has_more = false;
        }

        self.log(branch).info(&format!(
            "history: {} of {total_versions} versions (has_more={has_more})",
            versions.len()
        ));
        Ok(HistoryPage {
            versions,
            total_versions,
            has_more,
        })
    }

    /// Content, message, and timestamp of one version, looked up by full
    /// identifier or unique prefix, independent of any branch pointer.
    pub fn snapshot(&self, id_or_prefix: &str) -> Result<Snapshot> {
        let id = self.objects.resolve(id_or_prefix)?;
        let version = self.objects.get(&id)?;
        Ok(Snapshot {
            content: version.content,
            message: version.message,
            timestamp: version.timestamp,
        })
    }

    /// Versions on `branch` whose message or content contains any of the
    /// given keywords, case-insensitive, most recent first. The walk stops
    /// once `limit` matches are collected or history is exhausted.
    pub fn search(
        &self,
        branch: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<VersionSummary>> {
        let tip = self.refs.read(branch)?;
        if keywords.is_empty() {
            return Ok(Vec::new());
        }
        let needles: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

        let mut matches = Vec::new();
        let mut cursor = Some(tip);
        while let Some(id) = cursor {
            if matches.len() == limit {
                break;
            }
            let version = self.objects.get(&id)?;
            let haystack = format!("{}\n{}", version.message, version.content).to_lowercase();
            if needles.iter().any(|needle| haystack.contains(needle)) {
                matches.push(version.summary(id));
            }
            cursor = version.parent;
        }

        self.log(branch)
            .info(&format!("search matched {} versions", matches.len()));
        Ok(matches)
    }

    // Depth of the parent chain starting at `from`, inclusive.
    fn count_from(&self, from: VersionId) -> Result<usize> {
        let mut count = 0;
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            count += 1;
            cursor = self.objects.get(&id)?.parent;
        }
        Ok(count)
    }

    // Walk the branch line from `tip` looking for `target`.
    fn find_on_line(&self, tip: VersionId, target: &VersionId) -> Result<Version> {
        let mut cursor = Some(tip);
        while let Some(id) = cursor {
            let version = self.objects.get(&id)?;
            if id == *target {
                return Ok(version);
            }
            cursor = version.parent;
        }
        Err(ContextError::VersionNotFound {
            id: target.to_hex(),
        })
    }
}
