use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use zncproxy_auth::Principal;
use zncproxy_core::error::ZncProxyError;

use crate::error::ApiError;
use crate::state::SharedState;

/// Management-endpoint principal extraction (spec.md §4.10): pulls the
/// bearer JWT out of `Authorization`, verifies it, and yields the
/// authenticated principal to the handler. Rejections are `Unauthorized`
/// (401) uniformly, matching the Auth Port's own failure collapse.
pub struct AuthenticatedUser(pub Principal);

#[axum::async_trait]
impl FromRequestParts<SharedState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ZncProxyError::Unauthorized)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ZncProxyError::Unauthorized)?;
        let principal = state.auth.authenticate(token)?;
        Ok(AuthenticatedUser(principal))
    }
}
