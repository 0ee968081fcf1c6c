//! Error handling.

use axum::{
    extract::rejection::QueryRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tokio::sync::AcquireError;
use tracing::{event, Level};

/// Decimation server error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum DecimatorError {
    /// Bounds parameter that is not a comma-separated pair of floats
    #[error("invalid bounds {bounds}")]
    InvalidBounds { bounds: String },

    /// Error deserialising request query parameters
    #[error("request data is not valid")]
    RequestDataQueryRejection(#[from] QueryRejection),

    /// Error validating request data (single error)
    #[error("request data is not valid")]
    RequestDataValidationSingle(#[from] validator::ValidationError),

    /// Error validating request data (multiple errors)
    #[error("request data is not valid")]
    RequestDataValidation(#[from] validator::ValidationErrors),

    /// Error encoding or decoding a stored row
    #[error("failed to encode row data")]
    RowEncoding(#[from] serde_json::Error),

    /// Error acquiring a semaphore
    #[error("error acquiring resources")]
    SemaphoreAcquireError(#[from] AcquireError),

    /// Error reading or writing the series store
    #[error("failed to produce data")]
    Storage(#[from] sled::Error),

    /// Cached entry present but unreadable; the entry is evicted so a subsequent
    /// request can re-fetch
    #[error("failed to produce data")]
    StorageCorrupt { key: String },

    /// Requested output format not in the supported set
    #[error("unsupported format {format}")]
    UnsupportedFormat { format: String },

    /// Upstream fetch transport failure
    #[error("failed to produce data")]
    Upstream(#[from] reqwest::Error),

    /// Upstream response that cannot be interpreted as a tabular series
    #[error("failed to produce data")]
    UpstreamMalformed { reason: String },

    /// Upstream responded with a non-success status
    #[error("failed to produce data")]
    UpstreamStatus { status: u16 },
}

impl IntoResponse for DecimatorError {
    /// Convert from a `DecimatorError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<DecimatorError> for ErrorResponse {
    /// Convert from a `DecimatorError` into an `ErrorResponse`.
    fn from(error: DecimatorError) -> Self {
        let response = match &error {
            // Bad request
            DecimatorError::InvalidBounds { bounds: _ }
            | DecimatorError::RequestDataQueryRejection(_)
            | DecimatorError::RequestDataValidationSingle(_)
            | DecimatorError::RequestDataValidation(_)
            | DecimatorError::UnsupportedFormat { format: _ } => Self::bad_request(&error),

            // Internal server error. Upstream and storage faults are deliberately reported
            // as a single generic failure; the underlying cause is logged below.
            DecimatorError::RowEncoding(_)
            | DecimatorError::SemaphoreAcquireError(_)
            | DecimatorError::Storage(_)
            | DecimatorError::StorageCorrupt { key: _ }
            | DecimatorError::Upstream(_)
            | DecimatorError::UpstreamMalformed { reason: _ }
            | DecimatorError::UpstreamStatus { status: _ } => {
                Self::internal_server_error(&error)
            }
        };

        // Log server errors.
        if response.status.is_server_error() {
            match &error {
                DecimatorError::StorageCorrupt { key } => {
                    event!(Level::ERROR, "{}: corrupt cache entry {}", error, key);
                }
                DecimatorError::UpstreamMalformed { reason } => {
                    event!(Level::ERROR, "{}: malformed upstream response: {}", error, reason);
                }
                DecimatorError::UpstreamStatus { status } => {
                    event!(Level::ERROR, "{}: upstream returned status {}", error, status);
                }
                _ => {
                    event!(Level::ERROR, "{}", error.to_string());
                }
            }
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
