//! Session probing against an injected identity provider.

use std::fmt;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::ProbeError;
use crate::token::decode_token_payload;

const TOKEN_PREVIEW_CHARS: usize = 20;

// =============================================================================
// SESSION
// =============================================================================

/// An authenticated session as reported by the identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
    pub expires_at: OffsetDateTime,
}

impl Session {
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// First 20 characters of the token followed by `...`.
    #[must_use]
    pub fn token_preview(&self) -> String {
        let head: String = self.access_token.chars().take(TOKEN_PREVIEW_CHARS).collect();
        format!("{head}...")
    }

    /// Token to attach as `Authorization: Bearer`, if there is one.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.has_token().then_some(self.access_token.as_str())
    }

    #[must_use]
    pub fn expires_at_display(&self) -> String {
        self.expires_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.expires_at.unix_timestamp().to_string())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &self.token_preview())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// Source of the current session.
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// `Ok(None)` means the provider answered and nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Provider`] if the provider could not be asked.
    async fn current_session(&self) -> Result<Option<Session>, ProbeError>;
}

/// Asks `provider` for the current session and logs what came back.
///
/// # Errors
///
/// Returns [`ProbeError::ProviderUnavailable`] when no provider is configured,
/// [`ProbeError::NoActiveSession`] when nobody is signed in, and the
/// provider's own error otherwise.
pub async fn probe_session(provider: Option<&dyn SessionProvider>) -> Result<Session, ProbeError> {
    let Some(provider) = provider else {
        tracing::error!("identity provider client not available");
        return Err(ProbeError::ProviderUnavailable);
    };
    tracing::info!("identity provider client available");

    let session = match provider.current_session().await {
        Ok(Some(session)) => session,
        Ok(None) => {
            tracing::warn!("no active session found");
            return Err(ProbeError::NoActiveSession);
        }
        Err(e) => {
            tracing::error!(error = %e, "session lookup failed");
            return Err(e);
        }
    };

    tracing::info!(
        user_id = %session.user_id,
        email = session.email.as_deref().unwrap_or("-"),
        access_token = if session.has_token() { "present" } else { "missing" },
        expires_at = %session.expires_at_display(),
        token_preview = %session.token_preview(),
        "user is logged in"
    );
    Ok(session)
}

// =============================================================================
// STATIC TOKEN PROVIDER
// =============================================================================

/// Wraps an already-issued bearer token (user access token or project anon
/// key). Session metadata is read from the token's own claims.
pub struct StaticSessionProvider {
    token: String,
}

impl StaticSessionProvider {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into().trim().to_owned() }
    }
}

#[async_trait::async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn current_session(&self) -> Result<Option<Session>, ProbeError> {
        if self.token.is_empty() {
            return Ok(None);
        }
        session_from_token(&self.token, None, None, None).map(Some)
    }
}

/// Fills in whatever `user_id`/`email`/`expires_at` the caller did not know
/// from the token's claims.
fn session_from_token(
    token: &str,
    user_id: Option<String>,
    email: Option<String>,
    expires_at: Option<i64>,
) -> Result<Session, ProbeError> {
    let claims = decode_token_payload(token)?;

    let exp = expires_at
        .or(claims.expires_at)
        .ok_or_else(|| ProbeError::Provider("token has no exp claim".into()))?;
    let expires_at = OffsetDateTime::from_unix_timestamp(exp)
        .map_err(|e| ProbeError::Provider(format!("exp out of range: {e}")))?;

    Ok(Session {
        user_id: user_id
            .or(claims.subject)
            .unwrap_or_else(|| "anonymous".to_owned()),
        email: email.or(claims.email),
        access_token: token.to_owned(),
        expires_at,
    })
}

// =============================================================================
// PASSWORD GRANT PROVIDER
// =============================================================================

/// Signs in against a GoTrue-compatible auth server with email and password.
pub struct PasswordGrantProvider {
    http: reqwest::Client,
    auth_url: String,
    api_key: String,
    email: String,
    password: String,
}

#[derive(serde::Deserialize)]
struct GrantResponse {
    access_token: String,
    expires_at: Option<i64>,
    user: Option<GrantUser>,
}

#[derive(serde::Deserialize)]
struct GrantUser {
    id: String,
    email: Option<String>,
}

impl PasswordGrantProvider {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        auth_url: &str,
        api_key: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            http,
            auth_url: auth_url.trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

#[async_trait::async_trait]
impl SessionProvider for PasswordGrantProvider {
    async fn current_session(&self) -> Result<Option<Session>, ProbeError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.auth_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": self.email, "password": self.password }))
            .send()
            .await
            .map_err(|e| ProbeError::Provider(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProbeError::Provider(e.to_string()))?;

        match status {
            200..=299 => {}
            400 | 401 => {
                tracing::warn!(status, body = %body, "sign-in rejected");
                return Ok(None);
            }
            _ => return Err(ProbeError::Provider(format!("{status}: {body}"))),
        }

        let grant: GrantResponse = serde_json::from_str(&body)
            .map_err(|e| ProbeError::Provider(format!("unexpected sign-in response: {e}")))?;
        let (user_id, email) = match grant.user {
            Some(user) => (Some(user.id), user.email),
            None => (None, None),
        };
        session_from_token(&grant.access_token, user_id, email, grant.expires_at).map(Some)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
