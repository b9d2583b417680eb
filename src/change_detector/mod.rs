//! ChangeDetector - Capture Session and Sensitivity State
//!
//! ## Responsibilities
//!
//! - Track the current session mode (idle / photo / video)
//! - Record the session start timestamp
//! - Hold the motion-detection width thresholds the API reads and writes
//!
//! The detection algorithm itself runs outside this state surface; the
//! HTTP layer only starts/stops sessions and tunes sensitivity.

use crate::config::UserConfig;
use crate::models::SessionStatus;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Current operating mode of the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Idle,
    Photo,
    Video,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Idle => "idle",
            SessionMode::Photo => "photo",
            SessionMode::Video => "video",
        }
    }
}

#[derive(Debug)]
struct DetectorState {
    mode: SessionMode,
    session_start_time: Option<f64>,
    min_width: u32,
    max_width: u32,
}

/// Detector collaborator shared across handlers
pub struct ChangeDetector {
    state: RwLock<DetectorState>,
}

impl ChangeDetector {
    /// Create a detector with the default sensitivity from config
    pub fn new(config: &UserConfig) -> Self {
        Self {
            state: RwLock::new(DetectorState {
                mode: SessionMode::Idle,
                session_start_time: None,
                min_width: config.min_width,
                max_width: config.max_width,
            }),
        }
    }

    pub async fn mode(&self) -> SessionMode {
        self.state.read().await.mode
    }

    /// Session start time as epoch seconds, None when no session ran
    pub async fn session_start_time(&self) -> Option<f64> {
        self.state.read().await.session_start_time
    }

    /// Start a motion-triggered photo session
    pub async fn start_photo_session(&self) {
        self.start_session(SessionMode::Photo).await;
    }

    /// Start a motion-triggered video session
    pub async fn start_video_session(&self) {
        self.start_session(SessionMode::Video).await;
    }

    async fn start_session(&self, mode: SessionMode) {
        let mut state = self.state.write().await;
        state.mode = mode;
        state.session_start_time = Some(Utc::now().timestamp_micros() as f64 / 1_000_000.0);
        tracing::info!(mode = mode.as_str(), "Capture session started");
    }

    /// Stop any active session
    pub async fn stop_session(&self) {
        let mut state = self.state.write().await;
        state.mode = SessionMode::Idle;
        state.session_start_time = None;
        tracing::info!("Capture session stopped");
    }

    /// Current minimum detection width
    pub async fn min_width(&self) -> u32 {
        self.state.read().await.min_width
    }

    /// Current maximum detection width
    pub async fn max_width(&self) -> u32 {
        self.state.read().await.max_width
    }

    /// Update detection width thresholds
    pub async fn set_sensitivity(&self, min_width: u32, max_width: u32) {
        let mut state = self.state.write().await;
        state.min_width = min_width;
        state.max_width = max_width;
        tracing::info!(min_width, max_width, "Detector sensitivity updated");
    }

    /// Snapshot of the current session status
    pub async fn status(&self) -> SessionStatus {
        let state = self.state.read().await;
        SessionStatus {
            mode: state.mode,
            time_started: state.session_start_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> UserConfig {
        UserConfig {
            photos_path: "photos".into(),
            videos_path: "videos".into(),
            less_sensitivity: 300,
            min_width: 150,
            max_width: 500,
            more_sensitivity: 50,
        }
    }

    #[tokio::test]
    async fn test_initial_state() {
        let detector = ChangeDetector::new(&test_config());
        assert_eq!(detector.mode().await, SessionMode::Idle);
        assert_eq!(detector.session_start_time().await, None);
        assert_eq!(detector.min_width().await, 150);
        assert_eq!(detector.max_width().await, 500);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let detector = ChangeDetector::new(&test_config());

        detector.start_photo_session().await;
        assert_eq!(detector.mode().await, SessionMode::Photo);
        assert!(detector.session_start_time().await.is_some());

        detector.start_video_session().await;
        assert_eq!(detector.mode().await, SessionMode::Video);

        detector.stop_session().await;
        assert_eq!(detector.mode().await, SessionMode::Idle);
        assert_eq!(detector.session_start_time().await, None);
    }

    #[tokio::test]
    async fn test_set_sensitivity() {
        let detector = ChangeDetector::new(&test_config());
        detector.set_sensitivity(50, 500).await;
        assert_eq!(detector.min_width().await, 50);
        assert_eq!(detector.max_width().await, 500);
    }
}
