//! Worker configuration stored at `<repo>/worker.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Worker configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Queue document location, relative to the repository root.
    pub queue_path: String,

    /// Task log directory, relative to the repository root.
    pub log_dir: String,

    /// Default sleep between loop cycles when `--interval` is not given.
    pub default_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_path: "queue.json".to_string(),
            log_dir: "logs".to_string(),
            default_interval_secs: 30,
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_path.trim().is_empty() {
            return Err(anyhow!("queue_path must be non-empty"));
        }
        if self.log_dir.trim().is_empty() {
            return Err(anyhow!("log_dir must be non-empty"));
        }
        if self.default_interval_secs == 0 {
            return Err(anyhow!("default_interval_secs must be > 0"));
        }
        Ok(())
    }
}

/// Resolved locations the worker reads and writes for one repository.
#[derive(Debug, Clone)]
pub struct WorkerPaths {
    pub queue_path: PathBuf,
    pub log_dir: PathBuf,
}

impl WorkerPaths {
    pub fn new(root: &Path, config: &WorkerConfig) -> Self {
        Self {
            queue_path: root.join(&config.queue_path),
            log_dir: root.join(&config.log_dir),
        }
    }

    /// `:(exclude)` pathspecs hiding the worker's own artifacts from change
    /// detection and staging, so they never count as task output.
    ///
    /// Only artifacts inside the working tree are returned; a queue or log
    /// directory placed outside the repository needs no exclusion.
    pub fn exclude_pathspecs(&self, root: &Path) -> Vec<String> {
        let candidates = [
            self.queue_path.clone(),
            self.queue_path.with_extension("json.tmp"),
            self.log_dir.clone(),
            config_path(root),
        ];
        candidates
            .iter()
            .filter_map(|path| path.strip_prefix(root).ok())
            .map(|rel| format!(":(exclude){}", rel.display()))
            .collect()
    }
}

/// Path of the config file for a repository root.
pub fn config_path(root: &Path) -> PathBuf {
    root.join("worker.toml")
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `WorkerConfig::default()`.
pub fn load_config(path: &Path) -> Result<WorkerConfig> {
    if !path.exists() {
        let cfg = WorkerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: WorkerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &WorkerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
