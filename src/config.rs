use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::clock::MS_PER_SEC;

/// Application configuration: where data lives and how often it is flushed.
/// User writing preferences live in the persisted settings record instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the database; platform state dir when unset
    pub data_dir: Option<PathBuf>,
    /// Skip persistence entirely
    pub memory_only: bool,
    pub text_debounce_ms: u64,
    pub checkpoint_interval_secs: u64,
    pub display_tick_ms: u64,
    /// Session records older than this are not resumed
    pub stale_session_minutes: u64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            memory_only: false,
            text_debounce_ms: 1000,
            checkpoint_interval_secs: 30,
            display_tick_ms: 1000,
            stale_session_minutes: 60,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn db_path(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.join("writeflow.db"),
            None => crate::storage::default_db_path(),
        }
    }

    pub fn text_debounce_ms(&self) -> i64 {
        clamp_ms(self.text_debounce_ms)
    }

    pub fn checkpoint_interval_ms(&self) -> i64 {
        clamp_ms(self.checkpoint_interval_secs.saturating_mul(MS_PER_SEC as u64))
    }

    pub fn display_tick_ms(&self) -> i64 {
        clamp_ms(self.display_tick_ms)
    }

    pub fn stale_session_ms(&self) -> i64 {
        clamp_ms(self.stale_session_minutes.saturating_mul(60 * MS_PER_SEC as u64))
    }
}

// Intervals of zero would spin the scheduler.
fn clamp_ms(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX).max(1)
}

pub trait ConfigStore {
    fn load(&self) -> AppConfig;
    fn save(&self, cfg: &AppConfig) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("writeflow_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> AppConfig {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<AppConfig>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "ignoring malformed config")
                }
            }
        }
        AppConfig::default()
    }

    fn save(&self, cfg: &AppConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = AppConfig::default();
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nested").join("config.json"));
        let cfg = AppConfig {
            data_dir: Some(dir.path().to_path_buf()),
            memory_only: true,
            text_debounce_ms: 250,
            checkpoint_interval_secs: 10,
            display_tick_ms: 500,
            stale_session_minutes: 5,
            log_level: "debug".into(),
        };
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn missing_or_broken_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), AppConfig::default());
        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(store.load(), AppConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{"text_debounce_ms": 400}"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.text_debounce_ms, 400);
        assert_eq!(cfg.checkpoint_interval_secs, 30);
    }

    #[test]
    fn derived_intervals() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.text_debounce_ms(), 1000);
        assert_eq!(cfg.checkpoint_interval_ms(), 30_000);
        assert_eq!(cfg.display_tick_ms(), 1000);
        assert_eq!(cfg.stale_session_ms(), 3_600_000);
        let zero = AppConfig {
            display_tick_ms: 0,
            ..Default::default()
        };
        assert_eq!(zero.display_tick_ms(), 1);
        let dir = PathBuf::from("/tmp/wf");
        let custom = AppConfig {
            data_dir: Some(dir.clone()),
            ..Default::default()
        };
        assert_eq!(custom.db_path(), dir.join("writeflow.db"));
    }
}
