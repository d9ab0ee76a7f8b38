use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use renthub_db::admin::AdminError;

/// The failure taxonomy every handler speaks. Each variant maps to one
/// HTTP status and a JSON `{"error": ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    /// Authenticated but not permitted: wrong owner, or a private listing.
    #[error("not allowed")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("username is taken")]
    Conflict,

    /// Malformed or disallowed identifier on the admin surface.
    #[error("{0}")]
    Query(String),

    /// Missing connection configuration; the message names the env var.
    #[error("{0} is not set")]
    Configuration(&'static str),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: &str, message: &str) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Query(_) => StatusCode::BAD_REQUEST,
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            // Internal details stay in the log, not on the wire.
            ApiError::Internal(err) => {
                error!("internal error: {:#}", err);
                json!({ "error": "Something went wrong, try again later" })
            }
            ApiError::Validation { field, message } => {
                json!({ "error": message, "field": field })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Configuration(name) => ApiError::Configuration(name),
            AdminError::TableNotAllowed(_)
            | AdminError::UnknownTable(_)
            | AdminError::UnknownColumn(_) => ApiError::Query(err.to_string()),
            AdminError::MissingColumn(ref column) => ApiError::Validation {
                field: column.clone(),
                message: err.to_string(),
            },
            AdminError::InvalidValue { ref column, .. } => ApiError::Validation {
                field: column.clone(),
                message: err.to_string(),
            },
            AdminError::EmptyChangeSet(_) => ApiError::Validation {
                field: "values".to_string(),
                message: err.to_string(),
            },
            AdminError::MissingPrimaryKey(_) => ApiError::Validation {
                field: "id".to_string(),
                message: err.to_string(),
            },
            AdminError::Database(db_err) => ApiError::Internal(anyhow::Error::new(db_err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::validation("price", "must be at least 1").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Configuration("RENTHUB_DB_PATH").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn admin_errors_map_onto_the_taxonomy() {
        let missing: ApiError = AdminError::MissingColumn("title".to_string()).into();
        assert!(matches!(missing, ApiError::Validation { ref field, .. } if field == "title"));

        let disallowed: ApiError = AdminError::TableNotAllowed("users".to_string()).into();
        assert!(matches!(disallowed, ApiError::Query(_)));

        let unset: ApiError = AdminError::Configuration("RENTHUB_DB_PATH_PROD").into();
        assert!(matches!(unset, ApiError::Configuration("RENTHUB_DB_PATH_PROD")));
    }
}
