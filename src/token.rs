//! Informational bearer-token decoding.
//!
//! DESIGN
//! ======
//! Only the payload segment is inspected and the signature is never checked.
//! Nothing in this module may feed an authorization decision; its output is
//! printed next to a 401 so a human can see why the backend said no.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has no payload segment")]
    MissingPayload,
    #[error("payload is not valid base64: {0}")]
    Base64(String),
    #[error("payload is not valid JSON: {0}")]
    Json(String),
}

/// Claims read from the middle segment of a bearer token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenPayload {
    pub subject: Option<String>,
    /// Epoch seconds.
    pub expires_at: Option<i64>,
    pub issuer: Option<String>,
    pub audience: Option<Vec<String>>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Expired,
    Valid,
    NoExpiry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenDiagnosis {
    pub payload: TokenPayload,
    pub status: TokenStatus,
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes the payload segment of `token` without verifying anything.
///
/// # Errors
///
/// Returns [`TokenError`] if the token has fewer than two segments, or the
/// payload segment is not base64-encoded JSON.
pub fn decode_token_payload(token: &str) -> Result<TokenPayload, TokenError> {
    let mut segments = token.split('.');
    let _header = segments.next();
    let payload_b64 = segments.next().ok_or(TokenError::MissingPayload)?;

    let bytes = decode_segment(payload_b64)?;
    let claims: Value =
        serde_json::from_slice(&bytes).map_err(|e| TokenError::Json(e.to_string()))?;

    // A claim of an unexpected type is treated as absent.
    Ok(TokenPayload {
        subject: string_claim(&claims, "sub"),
        expires_at: claims.get("exp").and_then(numeric_date),
        issuer: string_claim(&claims, "iss"),
        audience: claims.get("aud").and_then(audience),
        email: string_claim(&claims, "email"),
    })
}

fn string_claim(claims: &Value, name: &str) -> Option<String> {
    claims.get(name).and_then(Value::as_str).map(str::to_owned)
}

/// NumericDate may carry a fraction; it is floored to whole seconds.
#[allow(clippy::cast_possible_truncation)]
fn numeric_date(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
}

// `aud` is either a single string or an array of strings.
fn audience(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(one) => Some(vec![one.clone()]),
        Value::Array(many) => Some(many.iter().filter_map(Value::as_str).map(str::to_owned).collect()),
        _ => None,
    }
}

/// Accepts both the URL-safe and the standard alphabet, padded or not.
fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    let normalized: String = segment
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_NO_PAD
        .decode(normalized)
        .map_err(|e| TokenError::Base64(e.to_string()))
}

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// Compares the `exp` claim with `now` (epoch seconds).
#[must_use]
pub fn assess_expiry(payload: &TokenPayload, now: i64) -> TokenStatus {
    match payload.expires_at {
        Some(exp) if exp < now => TokenStatus::Expired,
        Some(_) => TokenStatus::Valid,
        None => TokenStatus::NoExpiry,
    }
}

/// Logs what the token says about itself. Decode failures are logged and
/// swallowed.
pub fn diagnose(token: &str, now: i64) -> Option<TokenDiagnosis> {
    let payload = match decode_token_payload(token) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "could not decode token payload");
            return None;
        }
    };

    tracing::info!(
        sub = payload.subject.as_deref().unwrap_or("-"),
        exp = %payload.expires_at.map_or_else(|| "-".to_owned(), format_epoch),
        iss = payload.issuer.as_deref().unwrap_or("-"),
        aud = %payload.audience.as_ref().map_or_else(|| "-".to_owned(), |aud| aud.join(",")),
        "token payload"
    );

    let status = assess_expiry(&payload, now);
    match status {
        TokenStatus::Expired => tracing::error!("token expired"),
        TokenStatus::Valid => tracing::info!("token valid (not expired)"),
        TokenStatus::NoExpiry => tracing::warn!("token carries no exp claim"),
    }

    Some(TokenDiagnosis { payload, status })
}

/// Renders epoch seconds as RFC 3339, or the raw number if out of range.
#[must_use]
pub fn format_epoch(secs: i64) -> String {
    OffsetDateTime::from_unix_timestamp(secs)
        .ok()
        .and_then(|ts| ts.format(&Rfc3339).ok())
        .unwrap_or_else(|| secs.to_string())
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
