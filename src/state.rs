//! Application state
//!
//! Holds all shared components and state

use crate::camera_controller::CameraController;
use crate::change_detector::ChangeDetector;
use crate::config::UserConfig;
use crate::time_sync::ClockService;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Path to the user configuration JSON file
    pub config_path: PathBuf,
    /// V4L2 capture device
    pub video_device: String,
    /// Static client build directory
    pub static_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("NATUREWATCH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("NATUREWATCH_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            config_path: std::env::var("NATUREWATCH_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config.json")),
            video_device: std::env::var("NATUREWATCH_VIDEO_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            static_dir: std::env::var("NATUREWATCH_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static/client/build")),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// User configuration (thresholds, capture paths)
    pub user_config: Arc<UserConfig>,
    /// Camera collaborator
    pub camera: Arc<CameraController>,
    /// Detector collaborator
    pub detector: Arc<ChangeDetector>,
    /// Clock setter for one-shot time synchronization
    pub clock: Arc<ClockService>,
    /// Whether the device clock was set this process lifetime
    pub time_set: Arc<AtomicBool>,
}
