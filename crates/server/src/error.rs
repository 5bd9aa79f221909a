use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bookstore_core::catalog::ParseOrderingError;
use bookstore_core::database::types::StoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),

    #[error("operation requires book ownership or staff privileges")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    BadOrdering(#[from] ParseOrderingError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::InvalidRating(value) => Self::InvalidRating(value),
            StoreError::Forbidden => Self::Forbidden,
            StoreError::NotFound => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidRating(_) | Self::BadOrdering(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(detail) => {
                tracing::error!("Internal error on request: {detail}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        // field-level detail for validation errors, a generic detail otherwise
        let body = match &self {
            Self::InvalidRating(_) => json!({ "rate": self.to_string() }),
            Self::BadOrdering(_) => json!({ "ordering": self.to_string() }),
            _ => json!({ "detail": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            StatusCode::BAD_REQUEST,
            AppError::InvalidRating(6).into_response().status()
        );
        assert_eq!(
            StatusCode::BAD_REQUEST,
            AppError::BadOrdering(ParseOrderingError("owner".into()))
                .into_response()
                .status()
        );
        assert_eq!(
            StatusCode::FORBIDDEN,
            AppError::Forbidden.into_response().status()
        );
        assert_eq!(
            StatusCode::NOT_FOUND,
            AppError::NotFound.into_response().status()
        );
        assert_eq!(
            StatusCode::UNAUTHORIZED,
            AppError::Unauthorized.into_response().status()
        );
        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal("boom".into()).into_response().status()
        );
    }

    #[test]
    fn test_store_error_mapping() {
        let error = AppError::from(StoreError::InvalidRating(6));
        assert!(matches!(error, AppError::InvalidRating(6)));
        let error = AppError::from(StoreError::Forbidden);
        assert!(matches!(error, AppError::Forbidden));
        let error = AppError::from(StoreError::NotFound);
        assert!(matches!(error, AppError::NotFound));
    }
}
