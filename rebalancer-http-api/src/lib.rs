pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

use rebalancer_runtime::PortfolioActions;

pub struct RebalancerApiState {
    pub actions: PortfolioActions,
    pub started_at: Instant,
}

impl RebalancerApiState {
    pub fn new(actions: PortfolioActions) -> Self {
        Self {
            actions,
            started_at: Instant::now(),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let parsed: Vec<HeaderValue> = origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn build_router(state: Arc<RebalancerApiState>) -> Router {
    let cors = cors_layer(&state.actions.config().cors_allowed_origins);
    Router::new()
        .merge(routes::health::router())
        .merge(routes::portfolio::router())
        .merge(routes::quote::router())
        .merge(routes::balances::router())
        .merge(routes::hook::router())
        .merge(routes::jwt::router())
        .layer(cors)
        .with_state(state)
}
