//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use order_store::StoreError;
use sourcing::{SourcingError, SupplierErrorKind};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Engine error.
    Sourcing(SourcingError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Sourcing(err) => sourcing_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn sourcing_error_to_response(err: SourcingError) -> (StatusCode, String) {
    let status = match &err {
        SourcingError::UnresolvedCart(_) => StatusCode::CONFLICT,
        SourcingError::Supplier { kind, .. } => match kind {
            SupplierErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            SupplierErrorKind::StalePrice => StatusCode::CONFLICT,
            SupplierErrorKind::ReconnectRequired => StatusCode::UNAUTHORIZED,
            SupplierErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        },
        SourcingError::PlacedOrderNotFound(_) | SourcingError::Store(StoreError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        SourcingError::Domain(DomainError::InvalidCartKey(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

impl From<SourcingError> for ApiError {
    fn from(err: SourcingError) -> Self {
        ApiError::Sourcing(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Sourcing(err.into())
    }
}
