use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "tasktally";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Where the log lives, under $HOME/.local/state/tasktally when HOME is set.
    pub fn data_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn log_dir() -> PathBuf {
        Self::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("logs")
    }
}
