use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::sync::Arc;

use crate::RebalancerApiState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct JwtResponse {
    pub success: bool,
    pub jwt: String,
    pub message: &'static str,
}

pub fn router() -> Router<Arc<RebalancerApiState>> {
    Router::new().route("/", get(issue_jwt))
}

/// `GET /` issues a bearer token for the onramp token endpoint.
async fn issue_jwt(
    State(state): State<Arc<RebalancerApiState>>,
) -> Result<Json<JwtResponse>, ApiError> {
    let issued = state.actions.issue_jwt()?;
    Ok(Json(JwtResponse {
        success: true,
        jwt: issued.jwt,
        message: "JWT generated successfully",
    }))
}
