//! Error taxonomy shared by every probe stage.
//!
//! Each stage catches these at its own boundary, logs one line, and turns them
//! into an outcome or verdict. Nothing here is meant to reach `main` except
//! through [`crate::orchestrator::Report`].

use crate::token::TokenError;

/// Errors produced while probing a session or a backend endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// No identity provider was configured.
    #[error("identity provider unavailable")]
    ProviderUnavailable,

    /// The provider answered, but nobody is signed in.
    #[error("no active session")]
    NoActiveSession,

    /// The provider call itself failed.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// DNS failure, refused connection, timeout, or similar.
    #[error("network error: {0}")]
    Network(String),

    /// The backend rejected the bearer token.
    #[error("unauthorized (401)")]
    Unauthorized,

    /// Any other non-2xx response.
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    /// The bearer token could not be decoded for diagnostics.
    #[error("malformed token: {0}")]
    MalformedToken(#[from] TokenError),
}
