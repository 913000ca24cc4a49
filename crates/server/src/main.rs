use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use selectarr_core::{
    load_config, validate_config, PolicyStore, ProwlarrSearcher, ReleasePolicy, ReleaseSource,
    SessionState,
};
use selectarr_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("SELECTARR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Versions configured: {}", config.versions().len());

    // Policy state survives restarts; session state does not
    let policy_file = config.policy.policy_file();
    let store = Arc::new(PolicyStore::open(&policy_file));
    let policy = Arc::new(ReleasePolicy::new(store, config.policy.settings()));
    info!("Policy state loaded from {:?}", policy_file);

    let session = Arc::new(SessionState::new());

    // Create searcher if configured
    let searcher: Option<Arc<dyn ReleaseSource>> = match &config.searcher.prowlarr {
        Some(prowlarr_config) => match ProwlarrSearcher::new(prowlarr_config.clone()) {
            Ok(searcher) => {
                info!("Initializing Prowlarr searcher at {}", prowlarr_config.url);
                Some(Arc::new(searcher))
            }
            Err(e) => {
                error!("Failed to create Prowlarr searcher: {}", e);
                None
            }
        },
        None => {
            info!("No searcher configured");
            None
        }
    };

    let addr = SocketAddr::new(config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(config, session, policy, searcher));

    // Create router
    let app = create_router(state);

    // Start server
    info!("Starting selectarr v{} on {}", VERSION, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
