use mimalloc::MiMalloc;
use std::future::IntoFuture;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use erpnext_bridge::api::build_http_client;
use erpnext_bridge::config::Config;
use erpnext_bridge::crypto::CredentialCipher;
use erpnext_bridge::db::Storage;
use erpnext_bridge::{AppState, app_router};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn init_tracing(cfg: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.log_level.clone()));
    let registry = tracing_subscriber::registry().with(env_filter);
    if cfg.is_production() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(false),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_level(true)
                    .with_target(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;
    init_tracing(&cfg);
    info!(
        env = ?cfg.node_env,
        port = cfg.port,
        database_url = %cfg.database_url,
        log_level = %cfg.log_level,
        s3 = cfg.s3_configured(),
        "configuration loaded"
    );

    let storage = Storage::connect(&cfg.database_url).await?;
    let http = build_http_client(&cfg)?;
    let cipher = CredentialCipher::from_config(&cfg)?;

    let grace = cfg.shutdown_timeout();
    let prune_every = cfg.rate_limit_window();
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let state = AppState::new(cfg, storage.clone(), http, cipher);

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let pruner = state.limiter.spawn_pruner(prune_every, stop_rx.clone());
    let app = app_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    tokio::select! {
        res = server.into_future() => res?,
        _ = async {
            let _ = stop_rx.wait_for(|stopping| *stopping).await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(?grace, "in-flight requests did not finish in time, forcing shutdown");
        }
    }

    pruner.abort();
    storage.close().await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
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
    info!("shutdown signal received, draining connections");
}
