//! Branch pointer table and the checked-out branch marker.
//!
//! One file per branch under `<root>/refs/`, holding the tip's hex
//! identifier, plus a `HEAD` file naming the checked-out branch. All
//! updates go through write-new-then-rename so a concurrent reader sees
//! either the old or the new pointer, never a partial write.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::error::{ContextError, Result};
use crate::domain::version::VersionId;

const REFS_DIR: &str = "refs";
const HEAD_FILE: &str = "HEAD";

#[derive(Debug)]
pub struct RefStore {
    refs_dir: PathBuf,
    head_path: PathBuf,
}

impl RefStore {
    /// Lay out the refs directory and HEAD slot under a freshly claimed root.
    pub fn create(root: &Path) -> Result<Self> {
        let refs_dir = root.join(REFS_DIR);
        fs::create_dir_all(&refs_dir)?;
        Ok(Self {
            refs_dir,
            head_path: root.join(HEAD_FILE),
        })
    }

    /// Open an existing refs table.
    pub fn open(root: &Path) -> Result<Self> {
        let refs_dir = root.join(REFS_DIR);
        if !refs_dir.is_dir() {
            return Err(ContextError::NotInitialized);
        }
        Ok(Self {
            refs_dir,
            head_path: root.join(HEAD_FILE),
        })
    }

    fn ref_path(&self, branch: &str) -> PathBuf {
        self.refs_dir.join(branch)
    }

    pub fn exists(&self, branch: &str) -> bool {
        self.ref_path(branch).is_file()
    }

    /// Read a branch's tip pointer.
    pub fn read(&self, branch: &str) -> Result<VersionId> {
        let raw = fs::read_to_string(self.ref_path(branch)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ContextError::BranchNotFound {
                    branch: branch.to_string(),
                }
            } else {
                ContextError::StorageIo(e.to_string())
            }
        })?;
        raw.trim()
            .parse()
            .map_err(|_| ContextError::StorageIo(format!("corrupt ref for branch: {branch}")))
    }

    /// Create a branch pointer that must not exist yet.
    pub fn create_branch(&self, branch: &str, tip: &VersionId) -> Result<()> {
        let path = self.ref_path(branch);
        let mut tmp = NamedTempFile::new_in(&self.refs_dir)?;
        writeln!(tmp, "{tip}")?;
        tmp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                ContextError::BranchAlreadyExists {
                    branch: branch.to_string(),
                }
            } else {
                ContextError::StorageIo(e.error.to_string())
            }
        })?;
        Ok(())
    }

    /// Advance a branch pointer from `expected` to `new_tip`.
    ///
    /// The caller must hold the branch's commit lock; the re-read here turns
    /// the update into a compare-and-swap against writers outside this
    /// process, so a lost race surfaces as `ConcurrentUpdateConflict`
    /// instead of silently dropping their version.
    pub fn compare_and_swap(
        &self,
        branch: &str,
        expected: &VersionId,
        new_tip: &VersionId,
    ) -> Result<()> {
        let current = self.read(branch)?;
        if current != *expected {
            return Err(ContextError::ConcurrentUpdateConflict {
                branch: branch.to_string(),
            });
        }

        let mut tmp = NamedTempFile::new_in(&self.refs_dir)?;
        writeln!(tmp, "{new_tip}")?;
        tmp.persist(self.ref_path(branch)).map_err(|e| e.error)?;
        Ok(())
    }

    /// All branch names, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.refs_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Name of the checked-out branch.
    pub fn head(&self) -> Result<String> {
        let raw = fs::read_to_string(&self.head_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ContextError::NotInitialized
            } else {
                ContextError::StorageIo(e.to_string())
            }
        })?;
        Ok(raw.trim().to_string())
    }

    /// Point HEAD at `branch`. Existence is the caller's check.
    pub fn set_head(&self, branch: &str) -> Result<()> {
        let dir = self.head_path.parent().ok_or_else(|| {
            ContextError::StorageIo("HEAD path has no parent directory".to_string())
        })?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        writeln!(tmp, "{branch}")?;
        tmp.persist(&self.head_path).map_err(|e| e.error)?;
        Ok(())
    }
}
