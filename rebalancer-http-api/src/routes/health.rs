use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::RebalancerApiState;

pub fn router() -> Router<Arc<RebalancerApiState>> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<Arc<RebalancerApiState>>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
    }))
}
