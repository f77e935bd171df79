use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use zncproxy_core::error::ZncProxyError;

/// Maps every `ZncProxyError` variant to the status code and envelope of
/// spec.md §7/§6: `{detail}` for most failures, a richer envelope for
/// rate limiting.
pub struct ApiError(pub ZncProxyError);

impl From<ZncProxyError> for ApiError {
    fn from(e: ZncProxyError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use ZncProxyError::*;

        if let RateLimitExceeded {
            limit,
            window,
            retry_after,
        } = &self.0
        {
            let body = json!({
                "error": "rate_limit_exceeded",
                "message": self.0.to_string(),
                "limit": limit,
                "window": window,
                "retry_after": retry_after,
            });
            return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        }

        let status = match &self.0 {
            InvalidDuration { .. } | InvalidAmount | InvalidScope | CannotRevokeActivated => {
                StatusCode::BAD_REQUEST
            }
            Unauthorized => StatusCode::UNAUTHORIZED,
            Forbidden | InvalidDeviceId | MissingDeviceId => StatusCode::FORBIDDEN,
            InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
            Overflow => StatusCode::BAD_REQUEST,
            UserNotFound(_) | TokenNotFound(_) | BundleNotFound(_) | NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            DeviceConflict { .. } => StatusCode::CONFLICT,
            UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            UpstreamTransportError(_) => StatusCode::BAD_GATEWAY,
            CacheUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SessionTrackingFailure(_) | Storage(_) | Serialization(_) | Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RateLimitExceeded { .. } => unreachable!("handled above"),
        };

        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}
