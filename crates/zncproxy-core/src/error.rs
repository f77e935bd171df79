use thiserror::Error;

/// The closed set of error kinds the admission pipeline and management API
/// switch on exactly once, at the HTTP boundary (spec.md §7, §9).
#[derive(Debug, Error)]
pub enum ZncProxyError {
    // ── Input validation ─────────────────────────────────────────────────────
    #[error("invalid duration: {hours} hours is not a purchasable token duration")]
    InvalidDuration { hours: i32 },

    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("device id must be between 8 and 255 characters")]
    InvalidDeviceId,

    #[error("unknown scope")]
    InvalidScope,

    // ── Auth ─────────────────────────────────────────────────────────────────
    #[error("missing or invalid access token")]
    Unauthorized,

    #[error("token does not allow access to this path")]
    Forbidden,

    #[error("device id header is required")]
    MissingDeviceId,

    // ── Balance ──────────────────────────────────────────────────────────────
    #[error("insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: String, have: String },

    #[error("amount exceeds storage precision")]
    Overflow,

    // ── Not found ────────────────────────────────────────────────────────────
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("token not found: {0}")]
    TokenNotFound(String),

    #[error("bundle not found or inactive: {0}")]
    BundleNotFound(String),

    #[error("not found: {0}")]
    NotFound(String),

    // ── Token lifecycle ──────────────────────────────────────────────────────
    #[error("token has already been activated and cannot be revoked")]
    CannotRevokeActivated,

    // ── Session tracker ──────────────────────────────────────────────────────
    #[error("device conflict: token is in use on another device since {since} ({other_device_prefix}...)")]
    DeviceConflict {
        since: chrono::DateTime<chrono::Utc>,
        other_device_prefix: String,
    },

    #[error("session tracking failed: {0}")]
    SessionTrackingFailure(String),

    // ── Rate limiting ────────────────────────────────────────────────────────
    #[error("rate limit exceeded")]
    RateLimitExceeded {
        limit: u32,
        window: i64,
        retry_after: i64,
    },

    // ── Upstream ─────────────────────────────────────────────────────────────
    #[error("upstream request timed out")]
    UpstreamTimeout,

    #[error("upstream transport error: {0}")]
    UpstreamTransportError(String),

    // ── Cache ────────────────────────────────────────────────────────────────
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    // ── Storage / serialization ──────────────────────────────────────────────
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    // ── Catch-all ────────────────────────────────────────────────────────────
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for ZncProxyError {
    fn from(e: sqlx::Error) -> Self {
        ZncProxyError::Storage(e.to_string())
    }
}

impl From<redis::RedisError> for ZncProxyError {
    fn from(e: redis::RedisError) -> Self {
        ZncProxyError::CacheUnavailable(e.to_string())
    }
}
