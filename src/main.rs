mod bucket;
mod client_ip;
mod config;
mod error;
mod evictor;
mod handlers;
mod metrics;
mod models;
mod rate_limit;
mod registry;
mod routes;
mod state;

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Args;
use crate::evictor::spawn_evictor;
use crate::rate_limit::RateLimiter;
use crate::registry::ClientRegistry;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("greenlight_gateway=info")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();

    run(args)
        .await
        .inspect_err(|e| error!(error = %format!("{e:#}"), "server failed"))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let limiter_config = args.rate_limiter_config()?;
    let eviction_config = args.eviction_config(&limiter_config)?;

    // bind before spawning anything that would need stopping
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    // one registry per process, shared by the middleware and the evictor
    let registry = Arc::new(ClientRegistry::new(&limiter_config));
    let shutdown = CancellationToken::new();
    let evictor_handle = spawn_evictor(Arc::clone(&registry), eviction_config, shutdown.clone());

    let state = Arc::new(AppState {
        limiter: RateLimiter::new(limiter_config, registry),
        environment: args.env.clone(),
        version: env!("CARGO_PKG_VERSION"),
    });
    let app = routes::app(state);

    info!(
        %addr,
        env = %args.env,
        limiter_enabled = limiter_config.enabled,
        limiter_rps = limiter_config.requests_per_second,
        limiter_burst = limiter_config.burst,
        "starting server"
    );

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await;

    // stop the evictor even if serving failed
    shutdown.cancel();
    evictor_handle.await.context("evictor task panicked")?;
    served.context("serving http")?;

    info!(%addr, "stopped server");
    Ok(())
}

// Resolves on Ctrl-C or SIGTERM and cancels the shared token
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
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
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => {},
    }

    info!("shutting down server");
    shutdown.cancel();
}
