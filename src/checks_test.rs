use super::*;
use crate::session::test_helpers::session_with_token;
use crate::transport::test_helpers::MockTransport;

const BASE: &str = "http://backend.test";

fn api() -> ApiBase {
    ApiBase::new(Some(BASE.into()))
}

fn flag_url() -> String {
    format!("{BASE}/api/feature-flags/custom_agents")
}

fn agents_url() -> String {
    format!("{BASE}/api/agents")
}

// =============================================================================
// check_flag
// =============================================================================

#[tokio::test]
async fn flag_enabled_true() {
    let transport = MockTransport::new().route(Method::GET, &flag_url(), 200, r#"{"enabled":true}"#);
    let status = check_flag(&transport, &api(), "custom_agents").await.unwrap();
    assert_eq!(status, FlagStatus { enabled: true });
}

#[tokio::test]
async fn flag_enabled_false() {
    let transport = MockTransport::new().route(Method::GET, &flag_url(), 200, r#"{"enabled":false}"#);
    let status = check_flag(&transport, &api(), "custom_agents").await.unwrap();
    assert!(!status.enabled);
}

#[tokio::test]
async fn flag_missing_field_is_disabled() {
    let transport = MockTransport::new().route(Method::GET, &flag_url(), 200, r#"{"flag":"custom_agents"}"#);
    let status = check_flag(&transport, &api(), "custom_agents").await.unwrap();
    assert!(!status.enabled);
}

#[tokio::test]
async fn flag_non_boolean_is_disabled() {
    let transport = MockTransport::new().route(Method::GET, &flag_url(), 200, r#"{"enabled":"yes"}"#);
    let status = check_flag(&transport, &api(), "custom_agents").await.unwrap();
    assert!(!status.enabled);
}

#[tokio::test]
async fn flag_server_error_is_err() {
    let transport = MockTransport::new().route(Method::GET, &flag_url(), 500, "redis down");
    let err = check_flag(&transport, &api(), "custom_agents").await.unwrap_err();
    assert!(matches!(err, ProbeError::Server { status: 500, ref body } if body == "redis down"));
}

#[tokio::test]
async fn flag_is_checked_without_credentials() {
    let transport = MockTransport::new().route(Method::GET, &flag_url(), 200, r#"{"enabled":true}"#);
    check_flag(&transport, &api(), "custom_agents").await.unwrap();
    assert_eq!(transport.requests()[0].bearer, None);
}

// =============================================================================
// check_endpoint_auth_guard
// =============================================================================

#[tokio::test]
async fn guard_401_requires_auth() {
    let transport = MockTransport::new().route(Method::GET, &agents_url(), 401, "");
    let guard = check_endpoint_auth_guard(&transport, &agents_url()).await;
    assert_eq!(guard, GuardOutcome::RequiresAuth { status: 401 });
    assert!(guard.passed());
}

#[tokio::test]
async fn guard_403_requires_auth() {
    let transport = MockTransport::new().route(Method::GET, &agents_url(), 403, "forbidden");
    let guard = check_endpoint_auth_guard(&transport, &agents_url()).await;
    assert_eq!(guard, GuardOutcome::RequiresAuth { status: 403 });
    assert!(guard.passed());
}

#[tokio::test]
async fn guard_200_is_accessible() {
    let transport = MockTransport::new().route(Method::GET, &agents_url(), 200, r#"{"agents":[]}"#);
    let guard = check_endpoint_auth_guard(&transport, &agents_url()).await;
    assert_eq!(guard, GuardOutcome::Accessible(serde_json::json!({ "agents": [] })));
    assert!(guard.passed());
    assert_eq!(guard.summary(), "accessible (keys: agents)");
}

#[tokio::test]
async fn guard_500_is_unexpected() {
    let transport = MockTransport::new().route(Method::GET, &agents_url(), 500, "internal error");
    let guard = check_endpoint_auth_guard(&transport, &agents_url()).await;
    assert_eq!(guard, GuardOutcome::Unexpected { status: 500, body: "internal error".into() });
    assert!(!guard.passed());
}

#[tokio::test]
async fn guard_network_failure_is_unreachable() {
    let transport = MockTransport::new();
    let guard = check_endpoint_auth_guard(&transport, &agents_url()).await;
    assert!(matches!(guard, GuardOutcome::Unreachable(_)));
    assert!(!guard.passed());
}

// =============================================================================
// endpoint probes
// =============================================================================

#[tokio::test]
async fn health_is_unauthenticated_get() {
    let transport = MockTransport::new().route(Method::GET, &format!("{BASE}/api/health"), 200, r#"{"status":"ok"}"#);
    let outcome = check_health(&transport, &api()).await;
    assert!(outcome.is_success());
    assert_eq!(transport.requests()[0].bearer, None);
}

#[tokio::test]
async fn initiate_sends_multipart_prompt_with_bearer() {
    let url = format!("{BASE}/api/agent/initiate");
    let transport = MockTransport::new().route(Method::POST, &url, 200, r#"{"thread_id":"t1"}"#);
    let session = session_with_token("tok");
    let outcome = initiate_agent(&transport, &session, &api(), &InitiateForm::default()).await;
    assert!(outcome.is_success());

    let request = &transport.requests()[0];
    assert_eq!(request.bearer.as_deref(), Some("tok"));
    let RequestBody::Multipart(fields) = &request.body else {
        panic!("expected multipart body, got {:?}", request.body);
    };
    assert_eq!(fields[0], ("prompt".to_owned(), "Hello, test message".to_owned()));
}

#[tokio::test]
async fn initiate_sandbox_failure_is_server_error() {
    let url = format!("{BASE}/api/agent/initiate");
    let transport =
        MockTransport::new().route(Method::POST, &url, 500, r#"{"detail":"Failed to create sandbox"}"#);
    let session = session_with_token("tok");
    let outcome = initiate_agent(&transport, &session, &api(), &InitiateForm::default()).await;
    assert!(matches!(outcome, Outcome::ClientOrServerError { status: 500, .. }), "got {outcome:?}");
}

#[tokio::test]
async fn profile_uses_bearer() {
    let url = format!("{BASE}/api/user/profile");
    let transport = MockTransport::new().route(Method::GET, &url, 200, r#"{"id":"user-1"}"#);
    let session = session_with_token("tok");
    assert!(fetch_profile(&transport, &session, &api()).await.is_success());
    assert_eq!(transport.requests()[0].bearer.as_deref(), Some("tok"));
}

#[tokio::test]
async fn list_agents_success() {
    let transport =
        MockTransport::new().route(Method::GET, &agents_url(), 200, r#"{"agents":[{"id":1},{"id":2}]}"#);
    let session = session_with_token("tok");
    let outcome = list_agents(&transport, &session, &api()).await;
    let Outcome::Success(payload) = &outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(agent_count(payload), 2);
}

#[test]
fn agent_count_defaults_to_zero() {
    assert_eq!(agent_count(&serde_json::json!({})), 0);
    assert_eq!(agent_count(&serde_json::json!({ "agents": "nope" })), 0);
}
