//! Points API handlers.
//!
//! # Endpoints
//!
//! - `GET /balance`      – the actor's current balance
//! - `GET /transactions` – paginated transaction history, newest first

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use oskx_core::entities::TransactionRecord;
use oskx_core::store::Page;
use oskx_sdk::objects::{BalanceResponse, TransactionPage, TransactionResponse};
use serde::Deserialize;

use crate::api::ApiError;
use crate::api::extractors::Actor;
use crate::state::AppState;

/// Build the Points API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/balance", get(get_balance))
        .route("/transactions", get(list_transactions))
}

fn to_response(t: &TransactionRecord) -> TransactionResponse {
    TransactionResponse {
        transaction_id: t.transaction_id,
        user_id: t.user_id,
        kind: t.kind.into(),
        amount: t.amount,
        reason: t.reason.to_string(),
        related_exchange_id: t.related_exchange_id,
        created_at: t.created_at.unix_timestamp(),
    }
}

/// `GET /balance` — the actor's current points balance.
async fn get_balance(
    state: State<AppState>,
    Actor(user_id): Actor,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state.ledger.balance_of(user_id).await?;
    Ok(Json(BalanceResponse {
        user_id,
        points_balance: balance,
    }))
}

#[derive(Debug, Deserialize)]
struct PageParams {
    offset: Option<u64>,
    limit: Option<u64>,
}

/// `GET /transactions` — paginated transaction history, newest first.
async fn list_transactions(
    state: State<AppState>,
    Actor(user_id): Actor,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let default = Page::default();
    let page = Page {
        offset: params.offset.unwrap_or(default.offset),
        limit: params.limit.unwrap_or(default.limit).min(100),
    };
    let result = state.ledger.transactions_of(user_id, page).await?;
    Ok(Json(TransactionPage {
        transactions: result.items.iter().map(to_response).collect(),
        total: result.total,
        offset: page.offset,
        limit: page.limit,
    }))
}
