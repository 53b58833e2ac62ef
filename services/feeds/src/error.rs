use http::{Method, StatusCode};
use thiserror::Error;

/// Errors that abort a feed run.
///
/// Expected absences (no result document yet, poll budget exhausted, payload
/// that is not text) are not errors; they are variants of the outcome types.
#[derive(Error, Debug)]
pub enum Error {
    /// The token endpoint refused the refresh token exchange.
    #[error("access token exchange failed with status {status}: {body}")]
    Auth {
        /// Status returned by the token endpoint.
        status: StatusCode,
        /// Response body, kept for debugging.
        body: String,
    },

    /// The request could not be built or signed, e.g. a malformed URL.
    #[error("invalid request")]
    Signing(#[source] spfeed_core::Error),

    /// A remote call answered with status >= 400.
    #[error("{method} {url} failed with status {status}")]
    Http {
        /// Method of the failed call.
        method: Method,
        /// URL of the failed call, pre-signed queries redacted.
        url: String,
        /// Status returned by the remote service.
        status: StatusCode,
        /// Vendor request id, when the response carried one.
        request_id: Option<String>,
        /// Response body, kept for debugging.
        body: String,
    },

    /// The request never produced a response (connect failure, timeout).
    #[error("failed to send request")]
    Transport(#[source] spfeed_core::Error),

    /// A 2xx response did not have the expected shape.
    #[error("invalid {what} response: {message}")]
    InvalidResponse {
        /// Which call returned the response.
        what: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The feed document could not be read.
    #[error("failed to read feed document {path}")]
    Document {
        /// Path of the document.
        path: String,
        /// Why reading failed.
        #[source]
        source: spfeed_core::Error,
    },

    /// Configuration is missing or malformed.
    #[error("invalid configuration")]
    Config(#[source] spfeed_core::Error),

    /// The run was cancelled by the embedding application.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Status of the failed call, for [`Error::Auth`] and [`Error::Http`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Auth { status, .. } | Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether re-issuing the same call may succeed (429 and 5xx).
    ///
    /// Nothing in this crate retries on its own except the token exchange
    /// when configured to; callers use this to decide for themselves.
    pub fn is_retryable(&self) -> bool {
        self.status().is_some_and(is_retryable_status)
    }
}

pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;
