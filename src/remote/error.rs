//! Error types shared by the remote scoring API client.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`ApiError`] failures.
pub type ApiResult<T> = Result<T, ApiError>;

/// How a remote failure should be treated by the retry machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network-level or server-side trouble; retrying may succeed.
    Transient,
    /// The request was rejected by business rules; retrying is pointless.
    Validation,
    /// The request clashes with remote state (e.g. an unresolved tenure).
    Conflict,
}

/// Failures that can occur while talking to the remote scoring API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build scoring API client")]
    ClientBuilder {
        /// Underlying reqwest failure.
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent or timed out.
    #[error("failed to send scoring API request to `{path}`")]
    RequestSend {
        /// Endpoint path the request targeted.
        path: String,
        /// Underlying reqwest failure.
        #[source]
        source: reqwest::Error,
    },
    /// The API returned a non-success status code.
    #[error("unexpected scoring API response status {status} for `{path}`")]
    RequestStatus {
        /// Endpoint path the request targeted.
        path: String,
        /// Status code returned by the API.
        status: StatusCode,
    },
    /// Response payload could not be parsed.
    #[error("failed to decode scoring API response for `{path}`")]
    DecodeResponse {
        /// Endpoint path the request targeted.
        path: String,
        /// Underlying reqwest failure.
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// Classify the failure for the retry policy.
    ///
    /// Send and decode failures are treated as transient; status codes split
    /// into conflict (409), validation (remaining 4xx), and transient
    /// (timeouts, throttling, 5xx).
    pub fn class(&self) -> ErrorClass {
        match self {
            ApiError::RequestStatus { status, .. } => classify_status(*status),
            _ => ErrorClass::Transient,
        }
    }

    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

fn classify_status(status: StatusCode) -> ErrorClass {
    match status {
        StatusCode::CONFLICT => ErrorClass::Conflict,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => ErrorClass::Transient,
        status if status.is_client_error() => ErrorClass::Validation,
        _ => ErrorClass::Transient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: StatusCode) -> ApiError {
        ApiError::RequestStatus {
            path: "games".into(),
            status,
        }
    }

    #[test]
    fn status_codes_classify_by_retry_policy() {
        assert_eq!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY).class(),
            ErrorClass::Validation
        );
        assert_eq!(
            status_error(StatusCode::BAD_REQUEST).class(),
            ErrorClass::Validation
        );
        assert_eq!(
            status_error(StatusCode::CONFLICT).class(),
            ErrorClass::Conflict
        );
        assert_eq!(
            status_error(StatusCode::TOO_MANY_REQUESTS).class(),
            ErrorClass::Transient
        );
        assert_eq!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR).class(),
            ErrorClass::Transient
        );
        assert_eq!(
            status_error(StatusCode::REQUEST_TIMEOUT).class(),
            ErrorClass::Transient
        );
    }
}
