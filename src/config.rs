use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::manager::ManagerOptions;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub tick_interval_ms: u64,
    /// Cap on the gap a running session may accrue while the app was gone.
    pub max_resume_gap_secs: Option<u64>,
    pub db_path: Option<PathBuf>,
    /// Completed-workout CSV.
    pub history_path: Option<PathBuf>,
    /// Where `watch` writes its log files.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            max_resume_gap_secs: None,
            db_path: None,
            history_path: None,
            log_dir: None,
        }
    }
}

impl Config {
    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            max_resume_gap: self.max_resume_gap_secs.and_then(resume_gap),
        }
    }
}

fn resume_gap(secs: u64) -> Option<chrono::Duration> {
    let gap = i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds);
    if gap.is_none() {
        tracing::warn!(
            max_resume_gap_secs = secs,
            "max_resume_gap_secs out of range, resume gap not capped"
        );
    }
    gap
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "pacekeep") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("pacekeep_config.json")
        };
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
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "ignoring malformed config"
                ),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data).map_err(write_err)
    }
}
