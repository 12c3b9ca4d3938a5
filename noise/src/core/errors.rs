//! Typed errors that callers match on.
//!
//! Everything else in the crate propagates `anyhow::Error`; these two enums
//! exist because the resolver and the review step branch on the variant.

use thiserror::Error;

/// Fatal configuration problems detected before any external call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing GITHUB_TOKEN (set the environment variable or pass --token)")]
    MissingToken,
    #[error("missing GITHUB_REPOSITORY (set the environment variable or pass --repository)")]
    MissingRepository,
    #[error("invalid repository '{0}': expected the form owner/name")]
    InvalidRepository(String),
}

/// Failure of a single hosted-platform call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The platform answered with a non-success status.
    #[error("{method} {path} -> {status} {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },
    /// The request never produced a response (connect, TLS, timeout).
    #[error("{method} {path} request failed: {message}")]
    Transport {
        method: String,
        path: String,
        message: String,
    },
    /// A success response whose body did not match the expected shape.
    #[error("{method} {path} returned an unexpected body: {message}")]
    Decode {
        method: String,
        path: String,
        message: String,
    },
}
