use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use zncproxy_admission::AdmissionPipeline;
use zncproxy_auth::AuthPort;
use zncproxy_bundles::BundleShop;
use zncproxy_core::clock::Clock;
use zncproxy_forwarder::{HttpForwarder, UpstreamConfig};
use zncproxy_ledger::Ledger;
use zncproxy_payment::MockPaymentProvider;
use zncproxy_storage::StorageDb;
use zncproxy_tokens::TokenLifecycle;

/// Everything a route handler needs, grouped the way
/// `chronx_rpc::server::RpcServerState` groups a node's shared state —
/// one struct, constructed once at startup, handed to axum behind an
/// `Arc`.
pub struct AppState {
    pub db: StorageDb,
    pub ledger: Ledger,
    pub tokens: TokenLifecycle,
    pub bundles: BundleShop,
    pub admission: AdmissionPipeline,
    pub auth: AuthPort,
    pub payments: MockPaymentProvider,
    pub forwarder: HttpForwarder,
    pub ws_upstream_base: String,
    pub ws_basic_auth: Option<(String, String)>,
    pub clock: Arc<dyn Clock>,
    pub health: Arc<HealthFlags>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: StorageDb,
        ledger: Ledger,
        tokens: TokenLifecycle,
        bundles: BundleShop,
        admission: AdmissionPipeline,
        auth: AuthPort,
        payments: MockPaymentProvider,
        forwarder: HttpForwarder,
        ws_upstream_base: String,
        ws_basic_auth: Option<(String, String)>,
        clock: Arc<dyn Clock>,
        health: Arc<HealthFlags>,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            ledger,
            tokens,
            bundles,
            admission,
            auth,
            payments,
            forwarder,
            ws_upstream_base,
            ws_basic_auth,
            clock,
            health,
        })
    }
}

/// Liveness/readiness composite for `/health` (spec.md §4.13): set once
/// the composition root's background probe loop has observed a
/// successful storage/cache round-trip at least once since startup.
#[derive(Default)]
pub struct HealthFlags {
    storage_ok: AtomicBool,
    cache_ok: AtomicBool,
}

impl HealthFlags {
    pub fn mark_storage_ok(&self) {
        self.storage_ok.store(true, Ordering::Relaxed);
    }

    pub fn mark_cache_ok(&self) {
        self.cache_ok.store(true, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.storage_ok.load(Ordering::Relaxed) && self.cache_ok.load(Ordering::Relaxed)
    }
}

pub type SharedState = Arc<AppState>;

/// Stub config for the upstream HTTP forwarder, built by the composition
/// root from `Config` (spec.md §4.12) and passed in here rather than
/// re-derived, keeping this crate free of environment parsing concerns.
pub fn upstream_config(
    base_url: String,
    basic_auth: Option<(String, String)>,
    verify_tls: bool,
) -> UpstreamConfig {
    UpstreamConfig {
        base_url,
        basic_auth,
        verify_tls,
        request_timeout: std::time::Duration::from_secs(45),
    }
}
