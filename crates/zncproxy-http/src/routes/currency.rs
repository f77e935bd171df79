use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde::Deserialize;

use zncproxy_core::types::TransactionKind;

use crate::error::ApiError;
use crate::extract::AuthenticatedUser;
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/currency/balance", axum::routing::get(balance))
        .route("/currency/transactions", axum::routing::get(transactions))
}

async fn balance(
    State(state): State<SharedState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state.ledger.get_balance(principal.user_id).await?;
    Ok(Json(
        serde_json::json!({ "balance": balance, "currency": "ZNC" }),
    ))
}

#[derive(Deserialize)]
struct TransactionsQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
    #[serde(rename = "type")]
    kind: Option<TransactionKind>,
}

fn default_limit() -> i64 {
    50
}

async fn transactions(
    State(state): State<SharedState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(q): Query<TransactionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let items = zncproxy_storage::queries::list_transactions_for_user(
        state.db.pool(),
        principal.user_id,
        q.kind,
        q.limit,
        q.offset,
    )
    .await?;
    let total =
        zncproxy_storage::queries::count_transactions_for_user(state.db.pool(), principal.user_id, q.kind)
            .await?;

    Ok(Json(serde_json::json!({
        "items": items,
        "total": total,
        "limit": q.limit,
        "offset": q.offset,
    })))
}
