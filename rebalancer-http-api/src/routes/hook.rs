use axum::{Json, Router, body::Bytes, routing::post};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::RebalancerApiState;

/// Payment provider webhooks are logged and acknowledged; nothing acts on them.
pub fn router() -> Router<Arc<RebalancerApiState>> {
    Router::new().route("/hook", post(hook))
}

async fn hook(body: Bytes) -> Json<Value> {
    match serde_json::from_slice::<Value>(&body) {
        Ok(event) => {
            let kind = event
                .get("eventType")
                .or_else(|| event.get("type"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            tracing::info!(kind, payload = %event, "webhook received");
        }
        Err(_) => {
            tracing::info!(bytes = body.len(), payload = %String::from_utf8_lossy(&body), "webhook received (non-JSON)");
        }
    }
    Json(json!({"success": true}))
}
