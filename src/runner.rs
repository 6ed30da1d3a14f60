//! Authenticated request runner.
//!
//! DESIGN
//! ======
//! One request in, one [`Outcome`] out. Classification depends only on the
//! status code. A 401 on a request that carried a bearer token triggers token
//! diagnostics, whose result rides along in [`Outcome::Unauthorized`].
//! Nothing is retried.

use reqwest::Method;
use serde_json::Value;

use crate::error::ProbeError;
use crate::session::Session;
use crate::token::{self, TokenDiagnosis};
use crate::transport::{ApiRequest, HttpTransport, RequestBody};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx. The body parsed as JSON, or the raw text as a JSON string.
    Success(Value),
    /// 401.
    Unauthorized { body: String, diagnosis: Option<TokenDiagnosis> },
    /// Any other HTTP status.
    ClientOrServerError { status: u16, body: String },
    /// No HTTP response at all.
    NetworkError(String),
}

impl Outcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Maps a failed outcome onto the shared error taxonomy.
    ///
    /// # Errors
    ///
    /// Returns the [`ProbeError`] for any outcome other than success.
    pub fn into_result(self) -> Result<Value, ProbeError> {
        match self {
            Self::Success(payload) => Ok(payload),
            Self::Unauthorized { .. } => Err(ProbeError::Unauthorized),
            Self::ClientOrServerError { status, body } => Err(ProbeError::Server { status, body }),
            Self::NetworkError(message) => Err(ProbeError::Network(message)),
        }
    }

    /// One-line description for the summary table.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Success(_) => "ok".to_owned(),
            Self::Unauthorized { diagnosis: Some(d), .. } => {
                format!("401 unauthorized (token {})", token_status_label(d))
            }
            Self::Unauthorized { diagnosis: None, .. } => "401 unauthorized".to_owned(),
            Self::ClientOrServerError { status, body } => format!("{status}: {}", truncate(body, 120)),
            Self::NetworkError(message) => format!("network error: {message}"),
        }
    }
}

fn token_status_label(diagnosis: &TokenDiagnosis) -> &'static str {
    match diagnosis.status {
        token::TokenStatus::Expired => "expired",
        token::TokenStatus::Valid => "not expired",
        token::TokenStatus::NoExpiry => "has no exp",
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}

/// Status-code classification. Pure, for testability.
#[must_use]
pub fn classify(status: u16, body: String) -> Outcome {
    match status {
        200..=299 => {
            let payload = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
            Outcome::Success(payload)
        }
        401 => Outcome::Unauthorized { body, diagnosis: None },
        _ => Outcome::ClientOrServerError { status, body },
    }
}

/// Sends one request, attaching `session`'s bearer token when it has one.
pub async fn run_request(
    transport: &dyn HttpTransport,
    session: Option<&Session>,
    method: Method,
    url: &str,
    body: RequestBody,
) -> Outcome {
    let bearer = session.and_then(Session::bearer).map(ToOwned::to_owned);
    let authenticated = bearer.is_some();
    let request = ApiRequest { method: method.clone(), url: url.to_owned(), bearer, body };

    let response = match transport.send(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(%method, %url, error = %e, "request failed before a response");
            return Outcome::NetworkError(e.to_string());
        }
    };

    tracing::info!(%method, %url, status = response.status, authenticated, "response received");

    let mut outcome = classify(response.status, response.body);
    match &mut outcome {
        Outcome::Success(_) => {}
        Outcome::Unauthorized { diagnosis, .. } => {
            tracing::error!(%url, "401 unauthorized - token may be invalid or expired");
            if let Some(token) = session.and_then(Session::bearer) {
                let now = time::OffsetDateTime::now_utc().unix_timestamp();
                *diagnosis = token::diagnose(token, now);
            }
        }
        Outcome::ClientOrServerError { status, body } => {
            tracing::error!(%url, status = *status, body = %truncate(body, 500), "request failed");
        }
        Outcome::NetworkError(_) => {}
    }
    outcome
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
