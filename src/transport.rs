//! HTTP transport seam.
//!
//! The runner only sees [`HttpTransport`]; production uses
//! [`ReqwestTransport`], tests substitute a scripted mock.

use std::time::Duration;

use reqwest::{Method, Url};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The URL could not be parsed or resolved against the origin.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// DNS, connect, TLS, timeout, or body read failure.
    #[error("request failed: {0}")]
    Request(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    /// Text fields of a `multipart/form-data` body. The transport picks the
    /// content type and boundary.
    Multipart(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one request and returns the status with the raw body text.
///
/// Non-2xx statuses are not errors at this layer.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns [`TransportError`] only when no HTTP response was received.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

// =============================================================================
// REQWEST
// =============================================================================

pub struct ReqwestTransport {
    http: reqwest::Client,
    origin: Url,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// `origin` resolves relative (same-origin) URLs. `timeout` bounds each
    /// request; `None` leaves reqwest's default of no timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if `origin` is not an absolute URL or the client
    /// fails to build.
    pub fn new(origin: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let origin = Url::parse(origin).map_err(|e| TransportError::InvalidUrl {
            url: origin.to_owned(),
            reason: e.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;
        Ok(Self { http, origin, timeout })
    }

    fn resolve(&self, url: &str) -> Result<Url, TransportError> {
        let resolved = if url.starts_with("http://") || url.starts_with("https://") {
            Url::parse(url)
        } else {
            self.origin.join(url)
        };
        resolved.map_err(|e| TransportError::InvalidUrl { url: url.to_owned(), reason: e.to_string() })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.resolve(&request.url)?;
        let mut builder = self.http.request(request.method, url);

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(json) => builder.json(&json),
            RequestBody::Multipart(fields) => {
                let form = fields
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (name, value)| form.text(name, value));
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(ApiResponse { status, body })
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
