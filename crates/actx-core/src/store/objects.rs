//! Content-addressed storage of version records.
//!
//! Layout: `<root>/objects/<first 2 hex chars>/<remaining hex chars>`, one
//! file per version record (its canonical JSON bytes). Records are immutable
//! and deduplicate by construction.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::error::{ContextError, Result};
use crate::domain::version::{Version, VersionId};

const OBJECTS_DIR: &str = "objects";

/// Minimum identifier prefix length accepted by [`ObjectStore::resolve`].
pub const MIN_PREFIX_LEN: usize = 7;

#[derive(Debug)]
pub struct ObjectStore {
    objects_dir: PathBuf,
}

impl ObjectStore {
    /// Claim a fresh object store under `root`.
    ///
    /// The directory creation is the repository's atomic initialization
    /// claim: the first writer wins and a concurrent (or earlier)
    /// initializer observes `AlreadyInitialized`.
    pub fn create(root: &Path) -> Result<Self> {
        let objects_dir = root.join(OBJECTS_DIR);
        match fs::create_dir(&objects_dir) {
            Ok(()) => Ok(Self { objects_dir }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(ContextError::AlreadyInitialized)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Open an existing object store under `root`.
    pub fn open(root: &Path) -> Result<Self> {
        let objects_dir = root.join(OBJECTS_DIR);
        if !objects_dir.is_dir() {
            return Err(ContextError::NotInitialized);
        }
        Ok(Self { objects_dir })
    }

    fn record_path(&self, id: &VersionId) -> PathBuf {
        let hex = id.to_hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    /// Store a version record and return its identifier.
    pub fn put(&self, version: &Version) -> Result<VersionId> {
        let bytes = version.canonical_bytes()?;
        let id = VersionId::compute(&bytes);
        let path = self.record_path(&id);

        if path.exists() {
            return Ok(id);
        }

        let shard_dir = path.parent().ok_or_else(|| {
            ContextError::StorageIo(format!("record path has no parent: {}", path.display()))
        })?;
        fs::create_dir_all(shard_dir)?;

        // Atomic write: temp file in the same directory, then rename.
        let mut tmp = NamedTempFile::new_in(shard_dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(id)
    }

    /// Load the version record for `id`.
    pub fn get(&self, id: &VersionId) -> Result<Version> {
        let path = self.record_path(id);
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ContextError::VersionNotFound { id: id.to_hex() }
            } else {
                ContextError::StorageIo(e.to_string())
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ContextError::StorageIo(format!("corrupt version record {}: {e}", id.short()))
        })
    }

    /// Resolve a full identifier or a unique hex prefix to a stored version.
    ///
    /// Prefixes shorter than [`MIN_PREFIX_LEN`] characters, unknown ids, and
    /// ambiguous prefixes all resolve to `VersionNotFound`.
    pub fn resolve(&self, id_or_prefix: &str) -> Result<VersionId> {
        if let Ok(id) = id_or_prefix.parse::<VersionId>() {
            return Ok(id);
        }

        let not_found = || ContextError::VersionNotFound {
            id: id_or_prefix.to_string(),
        };

        if id_or_prefix.len() < MIN_PREFIX_LEN
            || !id_or_prefix.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(not_found());
        }

        let prefix = id_or_prefix.to_ascii_lowercase();
        let shard_dir = self.objects_dir.join(&prefix[..2]);
        let entries = match fs::read_dir(&shard_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };

        let rest = &prefix[2..];
        let mut matched: Option<VersionId> = None;
        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(rest) {
                if matched.is_some() {
                    // Ambiguous prefix.
                    return Err(not_found());
                }
                matched = Some(format!("{}{}", &prefix[..2], name).parse()?);
            }
        }
        matched.ok_or_else(not_found)
    }
}
