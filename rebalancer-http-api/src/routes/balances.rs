use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    routing::get,
};
use serde_json::Value;
use std::sync::Arc;

use rebalancer_runtime::BalanceQuery;

use crate::RebalancerApiState;
use crate::error::{ApiError, ApiResponse, ok};

pub fn router() -> Router<Arc<RebalancerApiState>> {
    Router::new().route("/balances", get(balances))
}

/// `GET /balances?chain=base-sepolia&address=0x...`
async fn balances(
    State(state): State<Arc<RebalancerApiState>>,
    query: Result<Query<BalanceQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let Query(query) = query?;
    Ok(ok(state.actions.wallet_balances(&query).await?))
}
