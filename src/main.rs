//! Flomodoro - A focus/break timer service
//!
//! This is the main entry point for the flomodoro application.

use std::sync::Arc;
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use flomodoro::{
    config::Config,
    state::{AppState, Collaborators},
    api::create_router,
    services::{DesktopNotifier, LogThemeApplier},
    store::FileStore,
    tasks::{ticker_task, wake_up_recovery_task},
    utils::{shutdown_signal, SystemClock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("flomodoro={},tower_http=info", config.log_level()))
        .init();

    info!("Starting flomodoro server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, data_dir={}, tick={}ms",
          config.host, config.port, config.data_dir.display(), config.tick_interval().as_millis());

    let store = FileStore::open(&config.data_dir)
        .context("Failed to open data directory")?;

    let collaborators = Collaborators {
        store: Arc::new(store),
        notifier: Arc::new(DesktopNotifier::new(!config.no_notify, !config.no_sound)),
        theme: Arc::new(LogThemeApplier),
        clock: Arc::new(SystemClock),
    };

    // Restore settings and timer, reconciling against elapsed real time
    let state = Arc::new(AppState::load(
        collaborators,
        &config.settings_overrides(),
        config.port,
        config.host.clone(),
        config.tick_interval(),
    ));
    state.request_notification_permission();

    // Start the countdown scheduler
    let ticker_state = Arc::clone(&state);
    tokio::spawn(async move {
        ticker_task(ticker_state).await;
    });

    // Reconcile promptly after the host wakes up
    let recovery_state = Arc::clone(&state);
    tokio::spawn(async move {
        wake_up_recovery_task(recovery_state).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /toggle     - Start or pause the countdown");
    info!("  POST /skip       - Skip to the next phase");
    info!("  GET  /status     - Current mode, time left and round");
    info!("  GET  /settings   - Current settings");
    info!("  PUT  /settings   - Update settings (values are clamped)");
    info!("  GET  /health     - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    if let Err(e) = state.persist() {
        tracing::error!("Failed to save timer on shutdown: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}
