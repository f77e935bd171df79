//! zncproxy-node — the authenticating, metering reverse proxy binary.
//!
//! Startup sequence:
//!   1. Parse config (CLI flags / environment, spec.md §4.12)
//!   2. Connect + migrate storage, connect cache
//!   3. Construct every component in dependency order (C1→C11)
//!   4. Spawn the idle-session reaper (spec.md §4.4)
//!   5. Serve the axum router (spec.md §6) until shutdown

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use zncproxy_admission::AdmissionPipeline;
use zncproxy_auth::AuthPort;
use zncproxy_bundles::BundleShop;
use zncproxy_cache::CacheClient;
use zncproxy_core::clock::SystemClock;
use zncproxy_forwarder::{HttpForwarder, UpstreamConfig};
use zncproxy_ledger::Ledger;
use zncproxy_payment::MockPaymentProvider;
use zncproxy_ratelimit::RateLimiter;
use zncproxy_sessions::SessionTracker;
use zncproxy_storage::StorageDb;
use zncproxy_tokens::TokenLifecycle;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,zncproxy=debug".parse().unwrap()),
        )
        .init();

    let config = Config::parse();
    info!("zncproxy-node starting");

    // ── Storage + cache ───────────────────────────────────────────────────
    let db = StorageDb::connect(&config.database_url)
        .await
        .context("connecting to storage")?;
    db.migrate().await.context("running storage migrations")?;
    info!("storage connected and migrated");

    let cache = CacheClient::connect(&config.redis_url)
        .await
        .context("connecting to cache")?;
    info!("cache connected");

    let clock = Arc::new(SystemClock) as Arc<dyn zncproxy_core::clock::Clock>;

    // ── Components, leaves first (C1 → C11) ──────────────────────────────
    let ledger = Ledger::new(db.clone());
    let tokens = TokenLifecycle::new(db.clone(), cache.clone(), ledger.clone(), clock.clone());
    let sessions = SessionTracker::new(db.clone());
    let limiter = RateLimiter::new(cache.clone());
    let bundles = BundleShop::new(db.clone(), ledger.clone(), tokens.clone());
    let admission = AdmissionPipeline::new(
        db.clone(),
        tokens.clone(),
        sessions.clone(),
        limiter.clone(),
        clock.clone(),
    );
    let auth = AuthPort::new(&config.jwt_signing_secret);
    let payments = MockPaymentProvider::new(
        db.clone(),
        config.backend_public_url.clone(),
        config.znc_to_rub_rate,
    );

    let forwarder = HttpForwarder::new(UpstreamConfig {
        base_url: config.upstream_base_url.clone(),
        basic_auth: config.upstream_basic_auth_pair(),
        verify_tls: config.upstream_verify_tls,
        request_timeout: Duration::from_secs(45),
    })
    .context("building upstream HTTP forwarder")?;

    let health = Arc::new(zncproxy_http::HealthFlags::default());

    let state = zncproxy_http::AppState::new(
        db.clone(),
        ledger,
        tokens,
        bundles,
        admission,
        auth,
        payments,
        forwarder,
        config.upstream_base_url.clone(),
        config.upstream_basic_auth_pair(),
        clock,
        health.clone(),
    );

    // ── Idle-session reaper (spec.md §4.4) ────────────────────────────────
    let reap_sessions = sessions.clone();
    let reap_interval = Duration::from_secs(config.session_reap_interval_secs);
    tokio::spawn(async move {
        let threshold = chrono::Duration::minutes(5);
        loop {
            tokio::time::sleep(reap_interval).await;
            if let Err(e) = reap_sessions.reap_idle(threshold, chrono::Utc::now()).await {
                warn!(error = %e, "idle-session reap sweep failed");
            }
        }
    });

    // ── Background health probes (spec.md §4.13) ──────────────────────────
    let health_db = db.clone();
    let health_cache = cache.clone();
    let health_interval = Duration::from_secs(config.health_check_interval_secs);
    tokio::spawn(async move {
        loop {
            match health_db.ping().await {
                Ok(()) => health.mark_storage_ok(),
                Err(e) => warn!(error = %e, "storage health probe failed"),
            }
            match health_cache.ping().await {
                Ok(()) => health.mark_cache_ok(),
                Err(e) => warn!(error = %e, "cache health probe failed"),
            }
            tokio::time::sleep(health_interval).await;
        }
    });

    // ── HTTP/WS surface (spec.md §6) ───────────────────────────────────────
    let router = zncproxy_http::build_router(state, &config.cors_allowed_origins);

    info!(addr = %config.listen_addr, "zncproxy-node ready");
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    Ok(())
}

/// Resolves once SIGINT or SIGTERM is received, letting in-flight proxy
/// requests and WebSocket sessions drain before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
