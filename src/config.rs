use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::csv_export::CsvQuoting;
use crate::format::DEFAULT_TIME_FORMAT;

pub const DEFAULT_TICK_MILLIS: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Overrides the default location of the stored log.
    pub data_file: Option<PathBuf>,
    /// Directory the csv summary is written to; the working directory when unset.
    pub export_dir: Option<PathBuf>,
    pub csv_quoting: CsvQuoting,
    pub time_format: String,
    pub tick_millis: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: None,
            export_dir: None,
            csv_quoting: CsvQuoting::Necessary,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            tick_millis: DEFAULT_TICK_MILLIS,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_dir()
            .map(|dir| dir.join("config.json"))
            .unwrap_or_else(|| PathBuf::from("tasktally_config.json"));
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
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "ignoring invalid config")
                }
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
