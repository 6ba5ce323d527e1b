//! Per-branch append-only operation log.
//!
//! One human-readable, line-oriented file per branch under `<root>/logs/`.
//! The log is observability only: the version history is authoritative, and
//! a failed log write never fails the operation that produced it.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

const LOGS_DIR: &str = "logs";

pub struct BranchLog {
    path: PathBuf,
}

impl BranchLog {
    /// Log handle for `branch`. The file is created on first write.
    pub fn open(root: &Path, branch: &str) -> Self {
        Self {
            path: root.join(LOGS_DIR).join(format!("{branch}.log")),
        }
    }

    pub fn info(&self, message: &str) {
        self.append("INFO", message);
    }

    pub fn error(&self, message: &str) {
        self.append("ERROR", message);
    }

    fn append(&self, level: &str, message: &str) {
        // Best effort throughout.
        if let Some(dir) = self.path.parent() {
            let _ = fs::create_dir_all(dir);
        }
        let line = format!(
            "{} {level} {message}\n",
            Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        );
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = file.write_all(line.as_bytes());
        }
    }
}
