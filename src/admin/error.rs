//! Config API errors.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::catalog::CatalogError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    errors: Vec<ErrorMessage>,
}

#[derive(Serialize)]
struct ErrorMessage {
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Catalog(e) => match e {
                CatalogError::EventTypeNotFound(_)
                | CatalogError::FunctionNotFound(_)
                | CatalogError::SubscriptionNotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::EventTypeAlreadyExists(_)
                | CatalogError::EventTypeHasSubscriptions(_)
                | CatalogError::FunctionAlreadyRegistered(_)
                | CatalogError::FunctionHasSubscriptions(_)
                | CatalogError::SubscriptionAlreadyExists(_)
                | CatalogError::PathConflict(_) => StatusCode::CONFLICT,
                CatalogError::InvalidSubscriptionUpdate(_) | CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Config API request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Config API request rejected");
        }
        let body = ErrorBody {
            errors: vec![ErrorMessage { message: self.to_string() }],
        };
        (status, Json(body)).into_response()
    }
}
