use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yggzn_core::{
    create_authenticator, load_config, validate_config, ArtifactCache, Authenticator,
    BrowserDriver, ChromiumDriver, DownloadGateway, HttpArtifactCache, Scraper, SessionManager,
};
use yggzn_server::api::create_router;
use yggzn_server::state::AppState;

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
    let config_path = std::env::var("YGGZN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded successfully");

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Launch the browser
    info!(headless = config.browser.headless, "Launching browser");
    let driver: Arc<dyn BrowserDriver> = Arc::new(
        ChromiumDriver::launch(&config.browser)
            .await
            .context("Failed to launch browser")?,
    );

    let session = Arc::new(SessionManager::new(
        driver,
        config.site.clone(),
        config.session.clone(),
    ));
    let scraper = Arc::new(Scraper::new(Arc::clone(&session), config.scraper.clone()));

    // Create artifact cache client if configured
    let cache: Option<Arc<dyn ArtifactCache>> = match &config.cache {
        Some(cache_config) => {
            info!("Using artifact cache at {}", cache_config.url);
            Some(Arc::new(HttpArtifactCache::new(cache_config)))
        }
        None => {
            info!("No artifact cache configured");
            None
        }
    };
    let gateway = Arc::new(DownloadGateway::new(Arc::clone(&scraper), cache));

    // Initial login; a failure here is retried on the first request
    info!("Logging in to {}", config.site.origin());
    match session.login().await {
        Ok(true) => info!("Logged in"),
        Ok(false) => warn!("Initial login failed, will retry on first request"),
        Err(e) => warn!(error = %e, "Initial login errored, will retry on first request"),
    }

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        scraper,
        gateway,
    ));
    info!(config = ?state.sanitized_config(), "Effective configuration");

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    info!("Shutting down browser");
    session.close().await;

    served.context("Server error")?;
    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
