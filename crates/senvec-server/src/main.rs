//! senvec: sentence embedding HTTP service.

use std::sync::Arc;

use senvec_core::SenvecConfig;
use senvec_server::startup::{check_indexes, create_indexes, verify_indexes};
use senvec_server::{build_router, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = SenvecConfig::from_env()?;

    if args.len() > 1 {
        match args[1].as_str() {
            "check" | "--check" => {
                let store = senvec_store::connect(&config.store, config.store_timeout).await?;
                let missing = check_indexes(store.as_ref()).await?;
                store.shutdown().await;
                std::process::exit(if missing.is_empty() { 0 } else { 1 });
            }
            "create-indexes" => {
                let store = senvec_store::connect(&config.store, config.store_timeout).await?;
                create_indexes(store.as_ref()).await?;
                store.shutdown().await;
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("senvec: sentence embedding service");
                println!();
                println!("Usage: senvec [command]");
                println!();
                println!("Commands:");
                println!("  (none)           Start the server");
                println!("  check            Verify the search indexes exist");
                println!("  create-indexes   Create missing search indexes");
                println!("  help             Show this help message");
                println!();
                println!("Environment: PORT, SENVEC_HOST, REDIS_URL, SENVEC_MODEL_DIR,");
                println!("  SENVEC_STORE_TIMEOUT_MS, SENVEC_CACHE_SIZE, SENVEC_CACHE_TTL_SECS,");
                println!("  SENVEC_CREATE_INDEXES");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'senvec help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    // Store first: a bad REDIS_URL should fail before models are loaded.
    let store = senvec_store::connect(&config.store, config.store_timeout)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect vector store: {}", e))?;
    if config.create_indexes {
        create_indexes(store.as_ref()).await?;
    }
    let unverified = verify_indexes(store.as_ref()).await;
    if !unverified.is_empty() {
        warn!(
            "{} of {} search indexes unavailable; run `senvec create-indexes`",
            unverified.len(),
            senvec_core::ModelKind::ALL.len()
        );
    }

    info!("Model directory: {}", config.model_dir.display());
    let encoders = senvec_infer::create_encoders(&config.model_dir, config.cache_size, config.cache_ttl);

    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(encoders, Arc::clone(&store)));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(backend = store.backend_name(), "senvec listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.shutdown().await;
    Ok(())
}
