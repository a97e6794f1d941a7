use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use rebalancer_runtime::{
    AllocateRequest, ApproveRequest, CheckBalanceRequest, CreatePortfolioRequest, DepositRequest,
    PortfolioLookup, PortfolioLookupRequest, PortfolioValue, PortfolioViewRequest,
    TargetAllocation, TokenBalance, TxOutput,
};

use crate::RebalancerApiState;
use crate::error::{ApiError, ApiResponse, ok};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LookupQuery {
    pub rpc_url: Option<String>,
    pub factory: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RpcQuery {
    pub rpc_url: Option<String>,
}

pub fn router() -> Router<Arc<RebalancerApiState>> {
    Router::new()
        .route("/portfolio/by-user/{user_address}", get(by_user))
        .route("/portfolio/create", post(create))
        .route("/portfolio/approve", post(approve))
        .route("/portfolio/deposit", post(deposit))
        .route("/portfolio/allocate", post(allocate))
        .route("/portfolio/check", post(check))
        .route("/portfolio/{user_contract}/value", get(value))
        .route("/portfolio/{user_contract}/allocation", get(allocation))
}

async fn by_user(
    State(state): State<Arc<RebalancerApiState>>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<LookupQuery>, QueryRejection>,
) -> ApiResult<PortfolioLookup> {
    let Path(user_address) = path?;
    let Query(query) = query?;
    let request = PortfolioLookupRequest {
        user_address,
        rpc_url: query.rpc_url,
        factory: query.factory,
    };
    Ok(ok(state.actions.lookup_portfolio(&request).await?))
}

async fn create(
    State(state): State<Arc<RebalancerApiState>>,
    body: Result<Json<CreatePortfolioRequest>, JsonRejection>,
) -> ApiResult<TxOutput> {
    let Json(request) = body?;
    Ok(ok(state.actions.create_portfolio(&request).await?))
}

async fn approve(
    State(state): State<Arc<RebalancerApiState>>,
    body: Result<Json<ApproveRequest>, JsonRejection>,
) -> ApiResult<TxOutput> {
    let Json(request) = body?;
    Ok(ok(state.actions.approve_max_allowance(&request).await?))
}

async fn deposit(
    State(state): State<Arc<RebalancerApiState>>,
    body: Result<Json<DepositRequest>, JsonRejection>,
) -> ApiResult<TxOutput> {
    let Json(request) = body?;
    Ok(ok(state.actions.deposit(&request).await?))
}

async fn allocate(
    State(state): State<Arc<RebalancerApiState>>,
    body: Result<Json<AllocateRequest>, JsonRejection>,
) -> ApiResult<TxOutput> {
    let Json(request) = body?;
    Ok(ok(state.actions.set_allocation(&request).await?))
}

async fn check(
    State(state): State<Arc<RebalancerApiState>>,
    body: Result<Json<CheckBalanceRequest>, JsonRejection>,
) -> ApiResult<TokenBalance> {
    let Json(request) = body?;
    Ok(ok(state.actions.check_token_balance(&request).await?))
}

async fn value(
    State(state): State<Arc<RebalancerApiState>>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<RpcQuery>, QueryRejection>,
) -> ApiResult<PortfolioValue> {
    let Path(user_contract) = path?;
    let Query(query) = query?;
    let request = PortfolioViewRequest {
        user_contract,
        rpc_url: query.rpc_url,
    };
    Ok(ok(state.actions.portfolio_value(&request).await?))
}

async fn allocation(
    State(state): State<Arc<RebalancerApiState>>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<RpcQuery>, QueryRejection>,
) -> ApiResult<TargetAllocation> {
    let Path(user_contract) = path?;
    let Query(query) = query?;
    let request = PortfolioViewRequest {
        user_contract,
        rpc_url: query.rpc_url,
    };
    Ok(ok(state.actions.target_allocation(&request).await?))
}
