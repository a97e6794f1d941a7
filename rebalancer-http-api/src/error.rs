//! Conversion of every failure into the `{success:false, error, details?}` body.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use rebalancer_runtime::RebalancerError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub result: T,
}

pub fn ok<T: Serialize>(result: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        result,
    })
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            details: None,
        }
    }
}

impl From<RebalancerError> for ApiError {
    fn from(e: RebalancerError) -> Self {
        let status = match &e {
            RebalancerError::Validation(_) => StatusCode::BAD_REQUEST,
            RebalancerError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RebalancerError::Execution { .. } | RebalancerError::ResponseParse { .. } => {
                StatusCode::BAD_GATEWAY
            }
        };
        Self {
            status,
            error: e.to_string(),
            details: e.details().map(str::to_string),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid JSON body: {}", e.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::bad_request(format!("Invalid query string: {}", e.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        Self::bad_request(format!("Invalid path parameter: {}", e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self.error,
            details: self.details.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}
