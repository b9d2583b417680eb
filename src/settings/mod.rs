//! Settings - Settings Document Translation
//!
//! ## Responsibilities
//!
//! - Build the settings document from live camera/detector state
//! - Apply a partial settings update to the collaborators
//!
//! The document is a derived view; it is rebuilt on every request and
//! never persisted.

use crate::camera_controller::{CameraController, ExposureMode, DEFAULT_SHUTTER_SPEED};
use crate::change_detector::ChangeDetector;
use crate::config::UserConfig;
use serde::{Deserialize, Serialize};

/// Three-level sensitivity, mapped to numeric width thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Less,
    Default,
    More,
}

impl Sensitivity {
    /// Minimum detection width configured for this level
    pub fn min_width(&self, config: &UserConfig) -> u32 {
        match self {
            Sensitivity::Less => config.less_sensitivity,
            Sensitivity::Default => config.min_width,
            Sensitivity::More => config.more_sensitivity,
        }
    }
}

/// Exposure section of the settings document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureSettings {
    pub mode: ExposureMode,
    pub iso: u32,
    pub shutter_speed: u32,
}

/// Full settings document returned by GET/POST /api/settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsDocument {
    pub rotation: i32,
    pub exposure: ExposureSettings,
    pub sensitivity: Sensitivity,
}

/// Partial exposure update; iso/shutter_speed default to 0 when omitted
#[derive(Debug, Clone, Deserialize)]
pub struct ExposureUpdate {
    pub mode: Option<ExposureMode>,
    #[serde(default)]
    pub iso: u32,
    #[serde(default)]
    pub shutter_speed: u32,
}

/// Partial settings update accepted by POST /api/settings
///
/// Only the fields present are applied. A missing exposure object is a
/// no-op rather than an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub rotation: Option<i32>,
    pub sensitivity: Option<Sensitivity>,
    pub exposure: Option<ExposureUpdate>,
}

/// Build the settings document from current collaborator state
///
/// Sensitivity is derived by exact equality against the configured
/// thresholds; anything else reads as "default".
pub async fn construct_settings(
    camera: &CameraController,
    detector: &ChangeDetector,
    config: &UserConfig,
) -> SettingsDocument {
    let min_width = detector.min_width().await;
    let sensitivity = if min_width == config.less_sensitivity {
        Sensitivity::Less
    } else if min_width == config.min_width {
        Sensitivity::Default
    } else if min_width == config.more_sensitivity {
        Sensitivity::More
    } else {
        Sensitivity::Default
    };

    SettingsDocument {
        rotation: camera.rotation().await,
        exposure: ExposureSettings {
            mode: camera.exposure_mode().await,
            iso: camera.iso().await,
            shutter_speed: camera.shutter_speed().await,
        },
        sensitivity,
    }
}

/// Apply the fields present in a partial update to the collaborators
pub async fn apply_settings(
    update: &SettingsUpdate,
    camera: &CameraController,
    detector: &ChangeDetector,
    config: &UserConfig,
) {
    if let Some(rotation) = update.rotation {
        camera.set_rotation(rotation).await;
    }

    if let Some(sensitivity) = update.sensitivity {
        detector
            .set_sensitivity(sensitivity.min_width(config), config.max_width)
            .await;
    }

    if let Some(exposure) = &update.exposure {
        match exposure.mode {
            Some(ExposureMode::Auto) => camera.auto_exposure().await,
            Some(ExposureMode::Off) => {
                let shutter_speed = if exposure.shutter_speed == 0 {
                    DEFAULT_SHUTTER_SPEED
                } else {
                    exposure.shutter_speed
                };
                camera.set_exposure(shutter_speed, exposure.iso).await;
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_controller::CameraConfig;

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

    fn collaborators() -> (CameraController, ChangeDetector, UserConfig) {
        let config = test_config();
        (
            CameraController::new(CameraConfig::default()),
            ChangeDetector::new(&config),
            config,
        )
    }

    #[tokio::test]
    async fn test_rotation_only_update_leaves_rest_unchanged() {
        let (camera, detector, config) = collaborators();
        let before = construct_settings(&camera, &detector, &config).await;

        let update = SettingsUpdate {
            rotation: Some(180),
            ..Default::default()
        };
        apply_settings(&update, &camera, &detector, &config).await;

        let after = construct_settings(&camera, &detector, &config).await;
        assert_eq!(after.rotation, 180);
        assert_eq!(after.sensitivity, before.sensitivity);
        assert_eq!(after.exposure.mode, before.exposure.mode);
        assert_eq!(after.exposure.iso, before.exposure.iso);
        assert_eq!(after.exposure.shutter_speed, before.exposure.shutter_speed);
    }

    #[tokio::test]
    async fn test_sensitivity_maps_to_configured_thresholds() {
        let (camera, detector, config) = collaborators();

        for (level, expected) in [
            (Sensitivity::Less, 300),
            (Sensitivity::Default, 150),
            (Sensitivity::More, 50),
        ] {
            let update = SettingsUpdate {
                sensitivity: Some(level),
                ..Default::default()
            };
            apply_settings(&update, &camera, &detector, &config).await;
            assert_eq!(detector.min_width().await, expected);
            assert_eq!(detector.max_width().await, 500);

            let doc = construct_settings(&camera, &detector, &config).await;
            assert_eq!(doc.sensitivity, level);
        }
    }

    #[tokio::test]
    async fn test_unknown_min_width_reads_as_default() {
        let (camera, detector, config) = collaborators();
        detector.set_sensitivity(42, 500).await;

        let doc = construct_settings(&camera, &detector, &config).await;
        assert_eq!(doc.sensitivity, Sensitivity::Default);
    }

    #[tokio::test]
    async fn test_exposure_off_defaults_zero_shutter_speed() {
        let (camera, detector, config) = collaborators();

        let update = SettingsUpdate {
            exposure: Some(ExposureUpdate {
                mode: Some(ExposureMode::Off),
                iso: 200,
                shutter_speed: 0,
            }),
            ..Default::default()
        };
        apply_settings(&update, &camera, &detector, &config).await;

        assert_eq!(camera.exposure_mode().await, ExposureMode::Off);
        assert_eq!(camera.shutter_speed().await, DEFAULT_SHUTTER_SPEED);
        assert_eq!(camera.iso().await, 200);
    }

    #[tokio::test]
    async fn test_exposure_auto_overrides_fixed() {
        let (camera, detector, config) = collaborators();
        camera.set_exposure(8000, 400).await;

        let update = SettingsUpdate {
            exposure: Some(ExposureUpdate {
                mode: Some(ExposureMode::Auto),
                iso: 0,
                shutter_speed: 0,
            }),
            ..Default::default()
        };
        apply_settings(&update, &camera, &detector, &config).await;
        assert_eq!(camera.exposure_mode().await, ExposureMode::Auto);
    }

    #[tokio::test]
    async fn test_missing_exposure_is_noop() {
        let (camera, detector, config) = collaborators();

        let update: SettingsUpdate = serde_json::from_str(r#"{"rotation": 90}"#).unwrap();
        apply_settings(&update, &camera, &detector, &config).await;

        assert_eq!(camera.rotation().await, 90);
        assert_eq!(camera.exposure_mode().await, ExposureMode::Auto);
    }

    #[tokio::test]
    async fn test_exposure_without_mode_is_noop() {
        let (camera, detector, config) = collaborators();

        let update: SettingsUpdate =
            serde_json::from_str(r#"{"exposure": {"iso": 800, "shutter_speed": 100}}"#).unwrap();
        apply_settings(&update, &camera, &detector, &config).await;

        assert_eq!(camera.exposure_mode().await, ExposureMode::Auto);
        assert_eq!(camera.iso().await, 0);
    }

    #[test]
    fn test_document_serialization_shape() {
        let doc = SettingsDocument {
            rotation: 180,
            exposure: ExposureSettings {
                mode: ExposureMode::Off,
                iso: 200,
                shutter_speed: 5000,
            },
            sensitivity: Sensitivity::Less,
        };

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["rotation"], 180);
        assert_eq!(value["exposure"]["mode"], "off");
        assert_eq!(value["exposure"]["shutter_speed"], 5000);
        assert_eq!(value["sensitivity"], "less");
    }
}
