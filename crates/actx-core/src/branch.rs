//! Branch lifecycle layered on the version store, plus configuration wiring.

use crate::config::ConfigResolver;
use crate::domain::error::{ContextError, Result};
use crate::oplog::BranchLog;
use crate::store::ContextStore;

/// Creates, lists, and switches branches inside one repository.
///
/// The "current" branch recorded in `HEAD` is only the persisted default a
/// front end resolves at invocation time; core operations always take the
/// branch explicitly, so concurrent sessions can address different branches
/// without interfering.
pub struct BranchManager<'a> {
    store: &'a ContextStore,
}

impl<'a> BranchManager<'a> {
    pub fn new(store: &'a ContextStore) -> Self {
        Self { store }
    }

    /// Fork `name` off `from_branch`.
    ///
    /// The new branch's tip equals the source's tip at this instant; history
    /// is shared structurally and the two lines diverge only from here. An
    /// empty config overlay slot is seeded so the branch falls through to
    /// the global config until a key is set.
    pub fn create(&self, name: &str, from_branch: &str) -> Result<()> {
        let refs = self.store.refs();
        if refs.exists(name) {
            return Err(ContextError::BranchAlreadyExists {
                branch: name.to_string(),
            });
        }
        let tip = refs.read(from_branch)?;
        refs.create_branch(name, &tip)?;

        ConfigResolver::new(self.store.root()).seed_branch_overlay(name)?;

        BranchLog::open(self.store.root(), name)
            .info(&format!("created from '{from_branch}' at {}", tip.short()));
        Ok(())
    }

    /// Make `name` the session default branch.
    pub fn checkout(&self, name: &str) -> Result<()> {
        let refs = self.store.refs();
        if !refs.exists(name) {
            return Err(ContextError::BranchNotFound {
                branch: name.to_string(),
            });
        }
        refs.set_head(name)?;
        BranchLog::open(self.store.root(), name).info("checked out");
        Ok(())
    }

    /// All branch names, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        self.store.refs().list()
    }

    /// The checked-out branch.
    pub fn current(&self) -> Result<String> {
        self.store.refs().head()
    }
}
