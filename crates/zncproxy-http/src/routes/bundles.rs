use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::AuthenticatedUser;
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/bundles", axum::routing::get(list))
        .route("/bundles/:id/purchase", axum::routing::post(purchase))
}

#[derive(Serialize)]
struct IssuedToken {
    id: Uuid,
    secret: String,
}

async fn list(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let bundles = state.bundles.list(true).await?;
    Ok(Json(bundles))
}

async fn purchase(
    State(state): State<SharedState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(bundle_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.bundles.purchase(bundle_id, principal.user_id).await?;

    let tokens: Vec<IssuedToken> = result
        .tokens
        .into_iter()
        .map(|(token, secret)| IssuedToken {
            id: token.id,
            secret,
        })
        .collect();

    Ok(Json(serde_json::json!({
        "bundle_name": result.bundle.name,
        "tokens_generated": tokens.len(),
        "cost": result.cost,
        "new_balance": result.new_balance,
        "tokens": tokens,
    })))
}
