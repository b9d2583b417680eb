//! Naturewatch Camera Server
//!
//! Main entry point for the camera server application.

use naturewatch_camera_server::{
    camera_controller::{CameraConfig, CameraController},
    change_detector::ChangeDetector,
    config::UserConfig,
    state::{AppConfig, AppState},
    time_sync::ClockService,
    web_api,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "naturewatch_camera_server=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting naturewatch camera server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    let user_config = Arc::new(UserConfig::load(&config.config_path)?);
    user_config.ensure_directories()?;
    tracing::info!(
        config_path = %config.config_path.display(),
        photos_path = %user_config.photos_path.display(),
        videos_path = %user_config.videos_path.display(),
        "Configuration loaded"
    );

    // Instantiate collaborators; the camera starts lazily on first request
    let camera = Arc::new(CameraController::new(CameraConfig {
        device: config.video_device.clone(),
        ..CameraConfig::default()
    }));
    let detector = Arc::new(ChangeDetector::new(&user_config));
    tracing::info!(device = %config.video_device, "Collaborators initialized");

    // Create application state
    let state = AppState {
        config,
        user_config,
        camera,
        detector,
        clock: Arc::new(ClockService::default()),
        time_set: Arc::new(AtomicBool::new(false)),
    };

    // Create router with static client serving
    let static_dir = state.config.static_dir.clone();
    let serve_dir = ServeDir::new(&static_dir)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    let app = web_api::create_router(state.clone())
        .fallback_service(serve_dir)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    tracing::info!(static_dir = %static_dir.display(), "Static file serving enabled");

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    let camera_shutdown = state.camera.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received, stopping capture");
            camera_shutdown.stop();
        })
        .await?;

    Ok(())
}
