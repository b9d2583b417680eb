//! User configuration
//!
//! ## Responsibilities
//!
//! - Load the static JSON configuration file once at startup
//! - Normalize photo/video paths relative to the config file location
//! - Create capture directories when missing

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Process-wide configuration, immutable after load
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    /// Directory for captured photos
    pub photos_path: PathBuf,
    /// Directory for captured videos
    pub videos_path: PathBuf,
    /// Detection min-width for "less" sensitivity
    pub less_sensitivity: u32,
    /// Detection min-width for "default" sensitivity
    pub min_width: u32,
    /// Detection max-width, fixed across sensitivity levels
    pub max_width: u32,
    /// Detection min-width for "more" sensitivity
    pub more_sensitivity: u32,
}

impl UserConfig {
    /// Load configuration from a JSON file
    ///
    /// Relative photo/video paths are resolved against the directory
    /// containing the config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config: UserConfig = serde_json::from_str(&raw)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.photos_path = resolve(base, &config.photos_path);
        config.videos_path = resolve(base, &config.videos_path);

        Ok(config)
    }

    /// Create the photo/video directories if they do not exist
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.photos_path, &self.videos_path] {
            if !dir.is_dir() {
                tracing::warn!(path = %dir.display(), "Capture directory does not exist, creating path");
                std::fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
