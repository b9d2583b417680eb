//! CameraController - Frame Capture and Exposure State
//!
//! ## Responsibilities
//!
//! - Grab JPEG frames from the V4L2 device using ffmpeg
//! - Keep the latest encoded frame available for the HTTP layer
//! - Track rotation and exposure settings
//!
//! The controller starts lazily: the first feed/frame request calls
//! `start()`, which spawns the capture loop. The loop never stops on grab
//! failures; they are logged and retried so an unplugged camera recovers
//! without a restart.

use crate::error::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::{watch, RwLock};

/// Shutter speed applied when exposure is switched off with no explicit
/// value (microseconds)
pub const DEFAULT_SHUTTER_SPEED: u32 = 5000;

/// Exposure mode of the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExposureMode {
    /// Camera meters exposure itself
    Auto,
    /// Fixed shutter speed and ISO
    Off,
}

impl ExposureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExposureMode::Auto => "auto",
            ExposureMode::Off => "off",
        }
    }
}

/// Capture configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// V4L2 device path
    pub device: String,
    /// Interval between frame grabs
    pub frame_interval: Duration,
    /// Timeout for a single ffmpeg grab
    pub grab_timeout: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            frame_interval: Duration::from_millis(200),
            grab_timeout: Duration::from_secs(5),
        }
    }
}

/// Mutable camera settings
#[derive(Debug, Clone)]
struct CameraSettings {
    rotation: i32,
    exposure_mode: ExposureMode,
    iso: u32,
    shutter_speed: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            rotation: 0,
            exposure_mode: ExposureMode::Auto,
            iso: 0,
            shutter_speed: 0,
        }
    }
}

/// Camera collaborator shared across handlers
pub struct CameraController {
    config: CameraConfig,
    running: AtomicBool,
    settings: RwLock<CameraSettings>,
    /// Latest encoded JPEG frame; None until the first grab succeeds
    frame_tx: watch::Sender<Option<Bytes>>,
}

impl CameraController {
    /// Create a new controller; capture does not begin until `start()`
    pub fn new(config: CameraConfig) -> Self {
        let (frame_tx, _) = watch::channel(None);
        Self {
            config,
            running: AtomicBool::new(false),
            settings: RwLock::new(CameraSettings::default()),
            frame_tx,
        }
    }

    /// Whether the capture loop is running
    pub fn is_alive(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the capture loop (idempotent)
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let camera = Arc::clone(self);
        tokio::spawn(async move {
            camera.capture_loop().await;
        });

        tracing::info!(device = %self.config.device, "Camera controller started");
    }

    /// Stop the capture loop
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Latest encoded JPEG frame
    ///
    /// Fails until the capture loop (or `publish_frame`) has produced at
    /// least one frame.
    pub fn get_image_binary(&self) -> Result<Bytes> {
        self.frame_tx
            .borrow()
            .clone()
            .ok_or_else(|| Error::Camera("no frame available yet".to_string()))
    }

    /// Wait for the next published frame
    pub async fn next_frame(&self) -> Result<Bytes> {
        let mut rx = self.frame_tx.subscribe();
        rx.changed()
            .await
            .map_err(|_| Error::Camera("frame channel closed".to_string()))?;
        let frame = rx.borrow_and_update().clone();
        frame.ok_or_else(|| Error::Camera("no frame available yet".to_string()))
    }

    /// Publish an encoded frame into the latest-frame buffer
    ///
    /// Entry point for the capture loop and for tests feeding frames
    /// without camera hardware.
    pub fn publish_frame(&self, data: Bytes) {
        self.frame_tx.send_replace(Some(data));
    }

    pub async fn rotation(&self) -> i32 {
        self.settings.read().await.rotation
    }

    pub async fn set_rotation(&self, degrees: i32) {
        self.settings.write().await.rotation = degrees;
        tracing::info!(rotation = degrees, "Camera rotation updated");
    }

    pub async fn exposure_mode(&self) -> ExposureMode {
        self.settings.read().await.exposure_mode
    }

    pub async fn iso(&self) -> u32 {
        self.settings.read().await.iso
    }

    pub async fn shutter_speed(&self) -> u32 {
        self.settings.read().await.shutter_speed
    }

    /// Fix exposure to the given shutter speed and ISO
    pub async fn set_exposure(&self, shutter_speed: u32, iso: u32) {
        let mut settings = self.settings.write().await;
        settings.exposure_mode = ExposureMode::Off;
        settings.shutter_speed = shutter_speed;
        settings.iso = iso;
        tracing::info!(shutter_speed, iso, "Exposure fixed");
    }

    /// Return exposure control to the camera
    pub async fn auto_exposure(&self) {
        self.settings.write().await.exposure_mode = ExposureMode::Auto;
        tracing::info!("Auto exposure enabled");
    }

    /// Capture loop: grab a frame each tick, publish it, retry on failure
    async fn capture_loop(&self) {
        let mut interval = tokio::time::interval(self.config.frame_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while self.running.load(Ordering::SeqCst) {
            interval.tick().await;
            match self.grab_frame().await {
                Ok(frame) => {
                    self.publish_frame(frame);
                }
                Err(e) => {
                    tracing::warn!(device = %self.config.device, error = %e, "Frame grab failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        tracing::info!(device = %self.config.device, "Camera controller stopped");
    }

    /// Grab a single JPEG frame from the V4L2 device using ffmpeg
    ///
    /// kill_on_drop ensures the ffmpeg process is killed when the timeout
    /// cancels the wait, so unresponsive devices do not accumulate zombies.
    async fn grab_frame(&self) -> Result<Bytes> {
        use std::process::Stdio;

        let rotation = self.settings.read().await.rotation;

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-f", "video4linux2", "-i", &self.config.device]);
        cmd.args(["-frames:v", "1"]);
        if rotation == 180 {
            cmd.args(["-vf", "hflip,vflip"]);
        }
        cmd.args(["-f", "image2pipe", "-vcodec", "mjpeg", "-loglevel", "error", "-y", "-"]);

        let child = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Camera(format!("ffmpeg spawn failed: {}", e)))?;

        match tokio::time::timeout(self.config.grab_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(Error::Camera(format!("ffmpeg failed: {}", stderr.trim())));
                }

                if output.stdout.is_empty() {
                    return Err(Error::Camera("ffmpeg returned empty output".to_string()));
                }

                Ok(Bytes::from(output.stdout))
            }
            Ok(Err(e)) => Err(Error::Camera(format!("ffmpeg execution failed: {}", e))),
            Err(_) => Err(Error::Camera(format!(
                "ffmpeg timeout ({}s)",
                self.config.grab_timeout.as_secs()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_frame_before_capture() {
        let camera = CameraController::new(CameraConfig::default());
        assert!(camera.get_image_binary().is_err());
    }

    #[tokio::test]
    async fn test_publish_and_read_frame() {
        let camera = CameraController::new(CameraConfig::default());
        camera.publish_frame(Bytes::from_static(b"\xff\xd8jpeg\xff\xd9"));

        let frame = camera.get_image_binary().unwrap();
        assert_eq!(&frame[..], b"\xff\xd8jpeg\xff\xd9");
    }

    #[tokio::test]
    async fn test_next_frame_sees_new_publish() {
        let camera = Arc::new(CameraController::new(CameraConfig::default()));

        let waiter = {
            let camera = camera.clone();
            tokio::spawn(async move { camera.next_frame().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        camera.publish_frame(Bytes::from_static(b"frame-2"));

        let frame = waiter.await.unwrap().unwrap();
        assert_eq!(&frame[..], b"frame-2");
    }

    #[tokio::test]
    async fn test_start_and_stop_toggle_liveness() {
        let camera = Arc::new(CameraController::new(CameraConfig::default()));
        assert!(!camera.is_alive());

        camera.start();
        assert!(camera.is_alive());

        camera.stop();
        assert!(!camera.is_alive());
    }

    #[tokio::test]
    async fn test_exposure_state() {
        let camera = CameraController::new(CameraConfig::default());
        assert_eq!(camera.exposure_mode().await, ExposureMode::Auto);

        camera.set_exposure(8000, 400).await;
        assert_eq!(camera.exposure_mode().await, ExposureMode::Off);
        assert_eq!(camera.shutter_speed().await, 8000);
        assert_eq!(camera.iso().await, 400);

        camera.auto_exposure().await;
        assert_eq!(camera.exposure_mode().await, ExposureMode::Auto);
        // Fixed values are kept for the settings document
        assert_eq!(camera.shutter_speed().await, 8000);
    }
}
