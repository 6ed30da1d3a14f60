//! Individual backend probes built on the runner.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::config::{ApiBase, InitiateForm};
use crate::error::ProbeError;
use crate::runner::{Outcome, run_request};
use crate::session::Session;
use crate::transport::{HttpTransport, RequestBody};

pub const HEALTH_PATH: &str = "/health";
pub const PROFILE_PATH: &str = "/user/profile";
pub const AGENT_INITIATE_PATH: &str = "/agent/initiate";
pub const AGENTS_PATH: &str = "/agents";
pub const FEATURE_FLAGS_PATH: &str = "/feature-flags";

const SANDBOX_FAILURE_MARKER: &str = "Failed to create sandbox";

// =============================================================================
// FEATURE FLAG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlagStatus {
    pub enabled: bool,
}

/// Reads `GET /api/feature-flags/{name}`. A missing or non-boolean `enabled`
/// field counts as disabled.
///
/// # Errors
///
/// Returns the mapped [`ProbeError`] when the endpoint does not answer 2xx.
pub async fn check_flag(
    transport: &dyn HttpTransport,
    api: &ApiBase,
    name: &str,
) -> Result<FlagStatus, ProbeError> {
    let url = api.url(&format!("{FEATURE_FLAGS_PATH}/{name}"));
    let outcome = run_request(transport, None, Method::GET, &url, RequestBody::Empty).await;
    let payload = outcome.into_result().map_err(|err| {
        tracing::error!(flag = name, error = %err, "could not check feature flag");
        err
    })?;

    let enabled = payload.get("enabled").and_then(Value::as_bool).unwrap_or(false);
    if enabled {
        tracing::info!(flag = name, "feature flag ENABLED");
    } else {
        tracing::warn!(flag = name, response = %payload, "feature flag DISABLED");
    }
    Ok(FlagStatus { enabled })
}

// =============================================================================
// AUTH GUARD
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    /// 401 or 403 without credentials.
    RequiresAuth { status: u16 },
    /// 2xx without credentials.
    Accessible(Value),
    Unexpected { status: u16, body: String },
    Unreachable(String),
}

impl GuardOutcome {
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, Self::RequiresAuth { .. } | Self::Accessible(_))
    }

    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::RequiresAuth { status } => format!("requires auth ({status})"),
            Self::Accessible(payload) => match payload.as_object() {
                Some(map) => {
                    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                    format!("accessible (keys: {})", keys.join(", "))
                }
                None => "accessible".to_owned(),
            },
            Self::Unexpected { status, body } => format!("unexpected {status}: {body}"),
            Self::Unreachable(message) => format!("unreachable: {message}"),
        }
    }
}

/// Calls `url` without credentials to see whether it is guarded.
pub async fn check_endpoint_auth_guard(transport: &dyn HttpTransport, url: &str) -> GuardOutcome {
    let guard = match run_request(transport, None, Method::GET, url, RequestBody::Empty).await {
        Outcome::Success(payload) => GuardOutcome::Accessible(payload),
        Outcome::Unauthorized { .. } => GuardOutcome::RequiresAuth { status: 401 },
        Outcome::ClientOrServerError { status: 403, .. } => GuardOutcome::RequiresAuth { status: 403 },
        Outcome::ClientOrServerError { status, body } => GuardOutcome::Unexpected { status, body },
        Outcome::NetworkError(message) => GuardOutcome::Unreachable(message),
    };

    if guard.passed() {
        tracing::info!(%url, result = %guard.summary(), "auth guard check passed");
    } else {
        tracing::error!(%url, result = %guard.summary(), "auth guard check failed");
    }
    guard
}

// =============================================================================
// ENDPOINT PROBES
// =============================================================================

/// Unauthenticated reachability probe; only the status matters.
pub async fn check_health(transport: &dyn HttpTransport, api: &ApiBase) -> Outcome {
    let outcome = run_request(transport, None, Method::GET, &api.url(HEALTH_PATH), RequestBody::Empty).await;
    match &outcome {
        Outcome::Success(payload) => tracing::info!(response = %payload, "backend health check passed"),
        other => tracing::error!(result = %other.summary(), "backend is not responding"),
    }
    outcome
}

pub async fn fetch_profile(transport: &dyn HttpTransport, session: &Session, api: &ApiBase) -> Outcome {
    let outcome =
        run_request(transport, Some(session), Method::GET, &api.url(PROFILE_PATH), RequestBody::Empty).await;
    if outcome.is_success() {
        tracing::info!("authentication successful");
    }
    outcome
}

/// Posts the multipart initiation form. The content type is left to the
/// transport.
pub async fn initiate_agent(
    transport: &dyn HttpTransport,
    session: &Session,
    api: &ApiBase,
    form: &InitiateForm,
) -> Outcome {
    let url = api.url(AGENT_INITIATE_PATH);
    let outcome = run_request(
        transport,
        Some(session),
        Method::POST,
        &url,
        RequestBody::Multipart(form.fields()),
    )
    .await;

    match &outcome {
        Outcome::Success(payload) => tracing::info!(response = %payload, "agent initiate successful"),
        Outcome::ClientOrServerError { status: 500, body } if body.contains(SANDBOX_FAILURE_MARKER) => {
            tracing::error!("sandbox creation failed and no fallback was used");
        }
        _ => {}
    }
    outcome
}

/// Authenticated agents listing.
pub async fn list_agents(transport: &dyn HttpTransport, session: &Session, api: &ApiBase) -> Outcome {
    let outcome =
        run_request(transport, Some(session), Method::GET, &api.url(AGENTS_PATH), RequestBody::Empty).await;
    if let Outcome::Success(payload) = &outcome {
        tracing::info!(count = agent_count(payload), "agents listed");
    }
    outcome
}

/// Length of the `agents` array, zero when absent.
#[must_use]
pub fn agent_count(payload: &Value) -> usize {
    payload.get("agents").and_then(Value::as_array).map_or(0, Vec::len)
}

#[cfg(test)]
#[path = "checks_test.rs"]
mod tests;
