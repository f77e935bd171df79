//! Config (C12): a single typed struct loaded once at startup, fields
//! drawn from CLI flags or their matching environment variable, per
//! spec.md §4.12/§6. Fails fast with a logged diagnostic (via `clap`'s
//! own error reporting) if a required value is absent or unparseable.
//!
//! Grounded on `chronx-node/src/main.rs`'s `Args` (`clap::Parser`)
//! shape; `env` is layered on top of the teacher's plain `--flag` style
//! since this component's values are conventionally environment-supplied
//! (database/cache URIs, secrets) rather than passed on a CLI each run.

use std::net::SocketAddr;

use clap::Parser;
use rust_decimal::Decimal;

#[derive(Parser, Debug)]
#[command(
    name = "zncproxy-node",
    version,
    about = "ZNC authenticating, metering reverse proxy"
)]
pub struct Config {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Redis connection string.
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: String,

    /// Base URL of the upstream HTTP/WS service being fronted.
    #[arg(long, env = "UPSTREAM_BASE_URL")]
    pub upstream_base_url: String,

    /// HS256 signing secret for management-API JWTs.
    #[arg(long, env = "JWT_SIGNING_SECRET")]
    pub jwt_signing_secret: String,

    /// Public URL of this backend, used to build referral links.
    #[arg(long, env = "BACKEND_PUBLIC_URL")]
    pub backend_public_url: String,

    /// ZNC→RUB (or equivalent) conversion rate used by the mock payment port.
    #[arg(long, env = "ZNC_TO_RUB_RATE")]
    pub znc_to_rub_rate: Decimal,

    /// Comma-separated list of allowed CORS origins; empty allows any.
    #[arg(long, env = "CORS_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub cors_allowed_origins: Vec<String>,

    /// `Secure` flag on cookies the management API sets.
    #[arg(long, env = "COOKIE_SECURE", default_value_t = true, action = clap::ArgAction::Set)]
    pub cookie_secure: bool,

    /// `SameSite` policy on cookies the management API sets.
    #[arg(long, env = "COOKIE_SAMESITE", default_value = "lax")]
    pub cookie_samesite: String,

    /// Optional Basic-auth credentials for the upstream, `user:pass`.
    #[arg(long, env = "UPSTREAM_BASIC_AUTH")]
    pub upstream_basic_auth: Option<String>,

    /// Optional TLS verification toggle for the upstream client (testing only).
    #[arg(long, env = "UPSTREAM_VERIFY_TLS", default_value_t = true, action = clap::ArgAction::Set)]
    pub upstream_verify_tls: bool,

    /// Interval between idle-session reap sweeps, in seconds (spec.md §4.4).
    #[arg(long, env = "SESSION_REAP_INTERVAL_SECS", default_value_t = 120)]
    pub session_reap_interval_secs: u64,

    /// Interval between background health probes of storage/cache, in
    /// seconds (spec.md §4.13).
    #[arg(long, env = "HEALTH_CHECK_INTERVAL_SECS", default_value_t = 30)]
    pub health_check_interval_secs: u64,

    /// HTTP listen address for the management + proxy surface.
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: SocketAddr,
}

impl Config {
    pub fn upstream_basic_auth_pair(&self) -> Option<(String, String)> {
        let raw = self.upstream_basic_auth.as_ref()?;
        let (user, pass) = raw.split_once(':')?;
        Some((user.to_string(), pass.to_string()))
    }
}
