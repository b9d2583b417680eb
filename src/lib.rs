//! Naturewatch Camera Server
//!
//! HTTP control surface for a Raspberry Pi based wildlife camera.
//!
//! ## Components
//!
//! 1. CameraController - frame capture and exposure state
//! 2. ChangeDetector - capture session and sensitivity state
//! 3. Settings - settings document translation
//! 4. TimeSync - one-shot device clock synchronization
//! 5. WebApi - REST API endpoints and MJPEG feed

pub mod camera_controller;
pub mod change_detector;
pub mod config;
pub mod error;
pub mod models;
pub mod settings;
pub mod state;
pub mod time_sync;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
