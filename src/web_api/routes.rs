//! API Routes

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::{Bytes, BytesMut};
use serde_json::json;
use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::camera_controller::CameraController;
use crate::settings::{self, SettingsUpdate};
use crate::state::AppState;
use crate::time_sync::{self, ClockUpdate};

/// Multipart boundary prefix for one MJPEG part
const FRAME_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";

/// How long the feed waits on a frame before logging that it is stalled
const FEED_STALL_WARN_AFTER: Duration = Duration::from_secs(5);

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Camera
        .route("/api/feed", get(feed))
        .route("/api/frame", get(frame))
        // Settings
        .route("/api/settings", get(get_settings).post(update_settings))
        // Sessions
        .route("/api/session", get(get_session))
        .route("/api/session/start/:session_type", post(start_session))
        .route("/api/session/stop", post(stop_session))
        // Device clock
        .route("/api/time/:unix_seconds", post(update_time))
        .with_state(state)
}

/// Frame a JPEG payload as one multipart MJPEG part
fn mjpeg_part(frame: &[u8]) -> Bytes {
    let mut part = BytesMut::with_capacity(FRAME_HEADER.len() + frame.len() + 2);
    part.extend_from_slice(FRAME_HEADER);
    part.extend_from_slice(frame);
    part.extend_from_slice(b"\r\n");
    part.freeze()
}

/// Poll-start the camera until the capture loop reports alive
async fn wait_until_alive(camera: &Arc<CameraController>) {
    while !camera.is_alive() {
        camera.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

// ========================================
// Camera Handlers
// ========================================

/// MJPEG feed: unbounded multipart stream, ended by client disconnect
///
/// The stream holds only the camera handle; dropping the connection drops
/// the stream and cancels the producer.
async fn feed(State(state): State<AppState>) -> impl IntoResponse {
    tracing::info!("Serving camera feed");
    wait_until_alive(&state.camera).await;

    let stream = futures::stream::unfold(state.camera.clone(), |camera| async move {
        let frame = loop {
            match tokio::time::timeout(FEED_STALL_WARN_AFTER, camera.next_frame()).await {
                Ok(Ok(frame)) => break frame,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Feed frame retrieval failed, closing stream");
                    return None;
                }
                Err(_) => {
                    // Keep the connection open; the capture loop logs its
                    // own grab failures
                    tracing::warn!(
                        waited_secs = FEED_STALL_WARN_AFTER.as_secs(),
                        "Feed waiting on camera, no frame published yet"
                    );
                }
            }
        };
        Some((Ok::<_, Infallible>(mjpeg_part(&frame)), camera))
    });

    (
        [(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=frame",
        )],
        Body::from_stream(stream),
    )
}

/// Single framed JPEG; failures are masked with a sentinel body
async fn frame(State(state): State<AppState>) -> Response {
    tracing::info!("Requested camera frame");
    wait_until_alive(&state.camera).await;

    match state.camera.get_image_binary() {
        Ok(frame) => mjpeg_part(&frame).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not retrieve image binary");
            Bytes::from_static(b"Empty").into_response()
        }
    }
}

// ========================================
// Settings Handlers
// ========================================

async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    let document =
        settings::construct_settings(&state.camera, &state.detector, &state.user_config).await;
    Json(document)
}

/// Apply a partial update, then return the resulting full document
async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> impl IntoResponse {
    settings::apply_settings(&update, &state.camera, &state.detector, &state.user_config).await;

    let document =
        settings::construct_settings(&state.camera, &state.detector, &state.user_config).await;
    Json(document)
}

// ========================================
// Session Handlers
// ========================================

async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.detector.status().await)
}

/// Start a photo or video session; unknown types are a no-op but the
/// current status is still returned
async fn start_session(
    State(state): State<AppState>,
    Path(session_type): Path<String>,
) -> impl IntoResponse {
    match session_type.as_str() {
        "photo" => state.detector.start_photo_session().await,
        "video" => state.detector.start_video_session().await,
        other => {
            tracing::warn!(session_type = other, "Ignoring unknown session type");
        }
    }

    Json(state.detector.status().await)
}

async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    state.detector.stop_session().await;
    Json(state.detector.status().await)
}

// ========================================
// Device Clock Handler
// ========================================

/// One-shot clock synchronization gated by the process-wide flag
async fn update_time(
    State(state): State<AppState>,
    Path(unix_seconds): Path<i64>,
) -> Response {
    let value = unix_seconds.to_string();

    match time_sync::evaluate(unix_seconds, state.time_set.load(Ordering::SeqCst)) {
        ClockUpdate::Rejected => {
            (StatusCode::BAD_REQUEST, Json(json!({ "ERROR": value }))).into_response()
        }
        ClockUpdate::AlreadySet => {
            (StatusCode::NOT_MODIFIED, Json(json!({ "NOT_MODIFIED": value }))).into_response()
        }
        ClockUpdate::Apply => match state.clock.set_system_clock(unix_seconds).await {
            Ok(()) => {
                state.time_set.store(true, Ordering::SeqCst);
                (StatusCode::OK, Json(json!({ "SUCCESS": value }))).into_response()
            }
            Err(e) => {
                tracing::error!(error = %e, "Error running date command");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "ERROR": value })),
                )
                    .into_response()
            }
        },
    }
}
