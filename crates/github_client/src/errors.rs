//! Error types for GitHub client operations.
//!
//! This module defines the error types that can occur when interacting with
//! the GitHub API through the github_client crate.

use http::StatusCode;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during GitHub client operations.
///
/// Remote calls are attempted exactly once; none of these errors is
/// retried by the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A GitHub API request failed.
    ///
    /// Carries the message reported by GitHub, or a transport error
    /// description when the request never reached the API.
    #[error("{0}")]
    Api(String),

    /// Authentication or GitHub client initialization failure.
    #[error("Failed to authenticate or initialize GitHub client: {0}")]
    AuthError(String),

    /// Error deserializing the response from GitHub.
    ///
    /// This may indicate API version changes or an unexpected response
    /// format.
    #[error("Failed to deserialize GitHub response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The requested resource was not found.
    ///
    /// Returned for 404 responses: the repository or branch does not
    /// exist, or is not accessible with the current token.
    #[error("Resource not found")]
    NotFound,

    /// GitHub API rate limit has been exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The API answered with a status code the caller did not expect.
    #[error("Received HTTP response [{0}] from GitHub")]
    UnexpectedStatus(StatusCode),
}
