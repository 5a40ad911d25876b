use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/blink/progress.db`, or the platform data dir.
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("blink");
            Some(state_dir.join("progress.db"))
        } else {
            ProjectDirs::from("", "", "blink")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("progress.db"))
        }
    }
}
