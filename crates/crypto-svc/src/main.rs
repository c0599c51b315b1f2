//! `crypto-svc` — service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing, optional OTLP).
//! 3. Build the configured credential provider and probe it once.
//! 4. Build the [`EnvelopeService`] for the configured cipher suite.
//! 5. Build the Axum router and serve until interrupted.

mod config;
mod crypto;
mod secret;
mod server;
mod service;
mod telemetry;

use anyhow::{Context, Result};
use tracing::{info, warn};

use config::Config;
use server::state::AppState;
use service::EnvelopeService;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        cipher_suite = %cfg.cipher_suite,
        secret_backend = %cfg.secret_backend,
        kdf_iterations = cfg.kdf_iterations,
        "crypto-svc starting"
    );

    // -----------------------------------------------------------------------
    // 3. Credential provider
    // -----------------------------------------------------------------------
    let secrets = secret::from_config(&cfg).await?;

    // -----------------------------------------------------------------------
    // 4. Envelope service
    // -----------------------------------------------------------------------
    let service = EnvelopeService::new(
        secrets,
        cfg.kdf_params(),
        cfg.cipher_suite,
        cfg.secret_fetch_timeout(),
    );
    if cfg.cipher_suite == crypto::CipherSuite::LegacyCbc {
        warn!("legacy-cbc suite enabled: envelopes carry no integrity protection");
    }

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(AppState::new(service));

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("crypto-svc stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
