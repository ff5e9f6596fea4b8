//! # Error Handling for List Requests
//!
//! Two families of errors exist in this crate:
//!
//! - [`ListError`] is raised while a request is being processed. Almost every
//!   variant is a caller-input failure (a filter on an unknown field, a page
//!   number that is not numeric, a sort direction that is not `ASC`/`DESC`).
//!   These are reported synchronously and never retried. The remaining variants
//!   wrap failures of the backend that executed the query.
//! - [`MappingError`] is raised while list metadata is loaded. It points at a
//!   broken field declaration and should abort startup or metadata cache
//!   population instead of surfacing per request.
//!
//! `ListError` implements [`IntoResponse`] so handlers can return it directly:
//! input failures become `400 Bad Request` with the message, backend failures
//! become `500 Internal Server Error` with a generic message while the details
//! are logged through `tracing`.
//!
//! ```rust,ignore
//! async fn list_posts(
//!     State(state): State<AppState>,
//!     Json(params): Json<serde_json::Value>,
//! ) -> Result<Json<Vec<post::Model>>, ListError> {
//!     let mut handler = state.factory.orm_handler::<post::Entity>(state.db.clone())?;
//!     let request = ListRequest::from_value(params);
//!     Ok(Json(handler.results(&request).await?))
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

/// Failure while turning a list request into a query or while executing it.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// A filter entry lacks `field`, `operator` or `value.from`.
    #[error("Field, operator and value are required for filter")]
    MalformedFilter,

    #[error("Field \"{field}\" is not filterable")]
    NotFilterable { field: String },

    /// The operator symbol is not known to the backend at all.
    #[error("Unknown filter operator \"{operator}\"")]
    UnknownOperator { operator: String },

    /// The operator is known but not declared for this field.
    #[error("Operator \"{operator}\" is not acceptable for filter field \"{field}\"")]
    OperatorNotAcceptable { operator: String, field: String },

    #[error("From and to values must be given for BETWEEN filter operator on \"{field}\"")]
    BetweenBoundsRequired { field: String },

    #[error("Filter value for \"{field}\" should be scalar, array given")]
    NonScalarValue { field: String },

    #[error("Value \"{value}\" of filter field \"{field}\" is not a valid date")]
    InvalidDate { field: String, value: String },

    #[error("Page number must be numeric, \"{value}\" given")]
    NonNumericPageNumber { value: String },

    #[error("Page limit must be numeric, \"{value}\" given")]
    NonNumericPageLimit { value: String },

    #[error("Field \"{field}\" is not sortable")]
    NotSortable { field: String },

    #[error("Order direction \"{direction}\" is not acceptable. It should be \"ASC\" or \"DESC\"")]
    InvalidDirection { direction: String },

    #[error("Association \"{field}\" does not exist in \"{entity}\"")]
    UnknownAssociation { field: String, entity: String },

    #[error("This list has no search feature")]
    SearchNotSupported,

    #[error("This list has no filter feature")]
    FilteringNotSupported,

    /// The backend knows the operator but has no translation for it.
    #[error("Filter operator \"{operator}\" not implemented yet")]
    OperatorNotImplemented { operator: String },

    #[error("A database error occurred")]
    Database(#[from] DbErr),

    #[error("Search index request failed: {0}")]
    SearchIndex(String),

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl ListError {
    /// Whether the error was caused by the request parameters rather than by a
    /// backend or a metadata definition.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::SearchIndex(_) | Self::Mapping(_)
        )
    }

    /// HTTP status code this error maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        if self.is_invalid_input() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Message that is safe to send to clients.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(_) => "A database error occurred".to_string(),
            Self::SearchIndex(_) => "A search index error occurred".to_string(),
            Self::Mapping(_) => "List is not configured correctly".to_string(),
            other => other.to_string(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database(internal) => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::SearchIndex(details) => {
                tracing::error!(details = %details, "Search index error occurred");
            }
            Self::Mapping(internal) => {
                tracing::error!(error = %internal, "List metadata error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self,
                    status = %self.status_code(),
                    "Invalid list request"
                );
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ListError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };

        (status, Json(body)).into_response()
    }
}

/// Broken list metadata declaration.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("Field \"{field}\" has no target")]
    MissingTarget { field: String },

    #[error("Unknown field target \"{target}\" for field \"{field}\"")]
    UnknownTarget { field: String, target: String },

    #[error(
        "Attributes \"joinField\" and \"joinType\" must be set for field \"{field}\" of target \"relation\""
    )]
    MissingJoin { field: String },

    #[error("Unknown join type \"{join_type}\" for field \"{field}\"")]
    UnknownJoinType { field: String, join_type: String },

    #[error("Filterable field \"{field}\" has no operators")]
    MissingOperators { field: String },

    #[error("Unknown filter operator \"{operator}\" declared for field \"{field}\"")]
    UnknownOperator { field: String, operator: String },

    #[error("Unknown field type \"{field_type}\" for field \"{field}\"")]
    UnknownFieldType { field: String, field_type: String },

    #[error("Direction \"{direction}\" of default order field \"{field}\" is not acceptable")]
    InvalidDirection { field: String, direction: String },

    #[error("Date format \"{format}\" of field \"{field}\" is not valid")]
    InvalidDateFormat { field: String, format: String },

    #[error("Missing entity list mapping information for \"{entity}\"")]
    MissingMetadata { entity: String },

    #[error("Failed to read list mapping file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse list mapping: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure while loading [`crate::config::ListHandlerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_bad_requests() {
        let cases = vec![
            ListError::MalformedFilter,
            ListError::NotFilterable {
                field: "title".to_string(),
            },
            ListError::NonNumericPageNumber {
                value: "two".to_string(),
            },
            ListError::InvalidDirection {
                direction: "UP".to_string(),
            },
            ListError::OperatorNotImplemented {
                operator: "lt".to_string(),
            },
        ];

        for err in cases {
            assert!(err.is_invalid_input(), "{err} should be an input error");
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_backend_errors_are_internal() {
        let err = ListError::from(DbErr::Custom("connection reset".to_string()));
        assert!(!err.is_invalid_input());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "A database error occurred");

        let err = ListError::SearchIndex("shard failure".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.user_message().contains("shard"));
    }

    #[test]
    fn test_messages_quote_offending_values() {
        let err = ListError::NonNumericPageLimit {
            value: "ten".to_string(),
        };
        assert_eq!(err.to_string(), "Page limit must be numeric, \"ten\" given");

        let err = ListError::UnknownAssociation {
            field: "author".to_string(),
            entity: "posts".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Association \"author\" does not exist in \"posts\""
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = ListError::NotSortable {
            field: "secret".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ListError::Database(DbErr::Custom("boom".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
