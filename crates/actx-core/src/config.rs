//! Layered configuration resolution.
//!
//! Four overlays folded in increasing precedence: built-in defaults, the
//! global `config.json`, the branch's `configs/<branch>.json`, and runtime
//! `key=value` overrides. Merging is field-wise; a field absent at one level
//! falls through to the next lower one. Missing files are empty overlays;
//! present-but-invalid fields are errors. The merged result is recomputed
//! per operation and never persisted.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::domain::error::{ContextError, Result};

pub const GLOBAL_CONFIG_FILE: &str = "config.json";
pub const BRANCH_CONFIGS_DIR: &str = "configs";

const DEFAULT_TOKEN_LIMIT: u64 = 8000;

/// Token counting approach. A single strategy today; the enum keeps the
/// callers closed over future ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenApproach {
    #[serde(rename = "chardiv4")]
    CharDiv4,
}

impl fmt::Display for TokenApproach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CharDiv4 => f.write_str("chardiv4"),
        }
    }
}

impl FromStr for TokenApproach {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "chardiv4" => Ok(Self::CharDiv4),
            other => Err(ContextError::InvalidConfigValue(format!(
                "unsupported token_approach: {other} (only 'chardiv4' is supported)"
            ))),
        }
    }
}

/// Fully-merged configuration used for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub token_approach: TokenApproach,
    pub token_limit: u64,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            token_approach: TokenApproach::CharDiv4,
            token_limit: DEFAULT_TOKEN_LIMIT,
        }
    }
}

/// One optional-field overlay in the precedence chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverlay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_approach: Option<TokenApproach>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_limit: Option<u64>,
}

impl ConfigOverlay {
    fn apply(&self, base: &mut EffectiveConfig) {
        if let Some(approach) = self.token_approach {
            base.token_approach = approach;
        }
        if let Some(limit) = self.token_limit {
            base.token_limit = limit;
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(0) = self.token_limit {
            return Err(ContextError::InvalidConfigValue(
                "token_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse `key=value` pairs (process flags) into a runtime overlay.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        let mut overlay = Self::default();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                ContextError::InvalidConfigValue(format!(
                    "invalid override: {pair} (expected key=value)"
                ))
            })?;
            overlay.set(key.trim(), value.trim())?;
        }
        Ok(overlay)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "token_approach" => self.token_approach = Some(value.parse()?),
            "token_limit" => {
                let limit: u64 = value.parse().map_err(|_| {
                    ContextError::InvalidConfigValue(format!(
                        "token_limit must be a positive integer, got: {value}"
                    ))
                })?;
                if limit == 0 {
                    return Err(ContextError::InvalidConfigValue(
                        "token_limit must be positive".to_string(),
                    ));
                }
                self.token_limit = Some(limit);
            }
            other => {
                return Err(ContextError::UnknownConfigKey {
                    key: other.to_string(),
                })
            }
        }
        Ok(())
    }
}

/// Loads and merges configuration overlays for a repository root.
pub struct ConfigResolver {
    home: PathBuf,
}

impl ConfigResolver {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            home: root.as_ref().to_path_buf(),
        }
    }

    fn global_path(&self) -> PathBuf {
        self.home.join(GLOBAL_CONFIG_FILE)
    }

    fn branch_path(&self, branch: &str) -> PathBuf {
        self.home.join(BRANCH_CONFIGS_DIR).join(format!("{branch}.json"))
    }

    /// Effective configuration for `branch` with `runtime` applied last.
    pub fn effective(&self, branch: &str, runtime: &ConfigOverlay) -> Result<EffectiveConfig> {
        runtime.validate()?;

        let mut merged = EffectiveConfig::default();
        for overlay in [
            self.load_overlay(&self.global_path())?,
            self.load_overlay(&self.branch_path(branch))?,
        ] {
            overlay.apply(&mut merged);
        }
        runtime.apply(&mut merged);
        Ok(merged)
    }

    /// Validate and persist one override into the branch's overlay file.
    pub fn set_branch_override(&self, branch: &str, key: &str, value: &str) -> Result<()> {
        let path = self.branch_path(branch);
        let mut overlay = self.load_overlay(&path)?;
        overlay.set(key, value)?;
        self.write_overlay(&path, &overlay)
    }

    /// Branch overrides as stored, without merging.
    pub fn branch_overrides(&self, branch: &str) -> Result<ConfigOverlay> {
        self.load_overlay(&self.branch_path(branch))
    }

    /// Write the default global config if none exists yet.
    pub fn initialize_default(&self) -> Result<()> {
        fs::create_dir_all(self.home.join(BRANCH_CONFIGS_DIR))?;
        let path = self.global_path();
        if path.exists() {
            return Ok(());
        }
        let defaults = EffectiveConfig::default();
        let overlay = ConfigOverlay {
            token_approach: Some(defaults.token_approach),
            token_limit: Some(defaults.token_limit),
        };
        self.write_overlay(&path, &overlay)
    }

    /// Seed an empty overlay slot for a freshly created branch. The branch
    /// falls through entirely to the global config until a key is set.
    pub fn seed_branch_overlay(&self, branch: &str) -> Result<()> {
        let path = self.branch_path(branch);
        if path.exists() {
            return Ok(());
        }
        self.write_overlay(&path, &ConfigOverlay::default())
    }

    fn load_overlay(&self, path: &Path) -> Result<ConfigOverlay> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ConfigOverlay::default())
            }
            Err(e) => return Err(e.into()),
        };
        let overlay: ConfigOverlay = serde_json::from_str(&raw).map_err(|e| {
            ContextError::InvalidConfigValue(format!("{}: {e}", path.display()))
        })?;
        overlay.validate()?;
        Ok(overlay)
    }

    // Write-new-then-rename, so a concurrent reader sees old or new content,
    // never a partial file.
    fn write_overlay(&self, path: &Path, overlay: &ConfigOverlay) -> Result<()> {
        let dir = path.parent().ok_or_else(|| {
            ContextError::StorageIo(format!("config path has no parent: {}", path.display()))
        })?;
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(serde_json::to_string_pretty(overlay)?.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_resolver() -> (tempfile::TempDir, ConfigResolver) {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ConfigResolver::new(dir.path());
        (dir, resolver)
    }

    fn no_runtime() -> ConfigOverlay {
        ConfigOverlay::default()
    }

    #[test]
    fn defaults_when_nothing_is_present() {
        let (_dir, resolver) = make_resolver();
        let config = resolver.effective("main", &no_runtime()).unwrap();
        assert_eq!(config.token_approach, TokenApproach::CharDiv4);
        assert_eq!(config.token_limit, 8000);
    }

    #[test]
    fn branch_overrides_global() {
        let (dir, resolver) = make_resolver();
        fs::write(dir.path().join("config.json"), r#"{"token_limit": 4000}"#).unwrap();
        resolver.set_branch_override("main", "token_limit", "12000").unwrap();

        let main = resolver.effective("main", &no_runtime()).unwrap();
        assert_eq!(main.token_limit, 12000);

        // Other branches still see the global value.
        let other = resolver.effective("experiment", &no_runtime()).unwrap();
        assert_eq!(other.token_limit, 4000);
    }

    #[test]
    fn runtime_has_highest_precedence() {
        let (_dir, resolver) = make_resolver();
        resolver.set_branch_override("main", "token_limit", "12000").unwrap();

        let runtime = ConfigOverlay::from_pairs(&["token_limit=500"]).unwrap();
        let config = resolver.effective("main", &runtime).unwrap();
        assert_eq!(config.token_limit, 500);
    }

    #[test]
    fn merge_is_field_wise() {
        let (dir, resolver) = make_resolver();
        fs::write(
            dir.path().join("config.json"),
            r#"{"token_approach": "chardiv4", "token_limit": 4000}"#,
        )
        .unwrap();
        // Branch overlay only touches the limit; the approach falls through.
        resolver.set_branch_override("main", "token_limit", "9000").unwrap();

        let config = resolver.effective("main", &no_runtime()).unwrap();
        assert_eq!(config.token_approach, TokenApproach::CharDiv4);
        assert_eq!(config.token_limit, 9000);
    }

    #[test]
    fn zero_token_limit_in_file_is_invalid() {
        let (dir, resolver) = make_resolver();
        fs::write(dir.path().join("config.json"), r#"{"token_limit": 0}"#).unwrap();
        match resolver.effective("main", &no_runtime()) {
            Err(ContextError::InvalidConfigValue(msg)) => assert!(msg.contains("positive")),
            other => panic!("expected InvalidConfigValue, got {other:?}"),
        }
    }

    #[test]
    fn wrong_type_in_file_is_invalid() {
        let (dir, resolver) = make_resolver();
        fs::write(dir.path().join("config.json"), r#"{"token_limit": "lots"}"#).unwrap();
        assert!(matches!(
            resolver.effective("main", &no_runtime()),
            Err(ContextError::InvalidConfigValue(_))
        ));
    }

    #[test]
    fn unknown_key_rejected_on_set() {
        let (_dir, resolver) = make_resolver();
        match resolver.set_branch_override("main", "token_budget", "100") {
            Err(ContextError::UnknownConfigKey { key }) => assert_eq!(key, "token_budget"),
            other => panic!("expected UnknownConfigKey, got {other:?}"),
        }
    }

    #[test]
    fn invalid_values_rejected_on_set() {
        let (_dir, resolver) = make_resolver();
        assert!(resolver.set_branch_override("main", "token_limit", "0").is_err());
        assert!(resolver.set_branch_override("main", "token_limit", "-5").is_err());
        assert!(resolver.set_branch_override("main", "token_approach", "tiktoken").is_err());
    }

    #[test]
    fn runtime_pairs_parse_and_validate() {
        let overlay =
            ConfigOverlay::from_pairs(&["token_limit=12000", "token_approach=chardiv4"]).unwrap();
        assert_eq!(overlay.token_limit, Some(12000));
        assert_eq!(overlay.token_approach, Some(TokenApproach::CharDiv4));

        assert!(ConfigOverlay::from_pairs(&["token_limit"]).is_err());
        assert!(ConfigOverlay::from_pairs(&["nope=1"]).is_err());
    }

    #[test]
    fn initialize_default_writes_global_once() {
        let (dir, resolver) = make_resolver();
        resolver.initialize_default().unwrap();
        let first = fs::read_to_string(dir.path().join("config.json")).unwrap();
        assert!(first.contains("chardiv4"));
        assert!(first.contains("8000"));

        // A later call must not clobber edits.
        fs::write(dir.path().join("config.json"), r#"{"token_limit": 100}"#).unwrap();
        resolver.initialize_default().unwrap();
        let kept = fs::read_to_string(dir.path().join("config.json")).unwrap();
        assert!(kept.contains("100"));
    }

    #[test]
    fn seeded_overlay_is_empty_and_falls_through() {
        let (dir, resolver) = make_resolver();
        resolver.seed_branch_overlay("feature").unwrap();
        assert!(dir.path().join("configs/feature.json").is_file());

        let config = resolver.effective("feature", &no_runtime()).unwrap();
        assert_eq!(config.token_limit, 8000);
    }
}
