//! Shared models and types
//!
//! Types shared across modules to avoid circular dependencies.

use crate::change_detector::SessionMode;
use serde::{Deserialize, Serialize};

/// Session status as exposed by the session endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub mode: SessionMode,
    pub time_started: Option<f64>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub camera_alive: bool,
    pub session_mode: SessionMode,
}
