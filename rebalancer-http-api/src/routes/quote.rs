use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde_json::Value;
use std::sync::Arc;

use rebalancer_runtime::QuoteRequest;

use crate::RebalancerApiState;
use crate::error::{ApiError, ApiResponse, ok};

pub fn router() -> Router<Arc<RebalancerApiState>> {
    Router::new().route("/quote", post(quote))
}

async fn quote(
    State(state): State<Arc<RebalancerApiState>>,
    body: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let Json(request) = body?;
    Ok(ok(state.actions.buy_quote(&request).await?))
}
