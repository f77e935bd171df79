use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use zncproxy_core::types::{AccessScope, DurationHours};

use crate::error::ApiError;
use crate::extract::AuthenticatedUser;
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/tokens/purchase", axum::routing::post(purchase))
        .route("/tokens/my-tokens", axum::routing::get(my_tokens))
        .route("/tokens/:id", axum::routing::delete(revoke))
}

#[derive(Deserialize)]
struct PurchaseRequest {
    duration_hours: DurationHours,
    scope: AccessScope,
}

#[derive(Serialize)]
struct TokenView {
    id: Uuid,
    secret: Option<String>,
    duration_hours: DurationHours,
    scope: AccessScope,
    is_activated: bool,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

async fn purchase(
    State(state): State<SharedState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(body): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (token, secret, cost) = state
        .tokens
        .generate(principal.user_id, body.duration_hours, body.scope)
        .await?;

    let view = TokenView {
        id: token.id,
        secret: Some(secret),
        duration_hours: token.duration_hours,
        scope: token.scope,
        is_activated: token.activated_at.is_some(),
        expires_at: token.expires_at(),
    };

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "token": view, "cost": cost })),
    ))
}

#[derive(Deserialize, Default)]
struct MyTokensQuery {
    #[serde(default)]
    active_only: bool,
}

async fn my_tokens(
    State(state): State<SharedState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(q): Query<MyTokensQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state.tokens.list(principal.user_id, q.active_only).await?;
    let views: Vec<TokenView> = tokens
        .into_iter()
        .map(|t| TokenView {
            id: t.id,
            secret: None,
            duration_hours: t.duration_hours,
            scope: t.scope,
            is_activated: t.activated_at.is_some(),
            expires_at: t.expires_at(),
        })
        .collect();
    Ok(Json(views))
}

async fn revoke(
    State(state): State<SharedState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let refund_amount = state.tokens.revoke(id, principal.user_id).await?;
    let new_balance = state.ledger.get_balance(principal.user_id).await?;
    Ok(Json(serde_json::json!({
        "refund_amount": refund_amount,
        "new_balance": new_balance,
    })))
}
