use super::*;
use crate::session::test_helpers::session_with_token;
use crate::token::TokenStatus;
use crate::transport::test_helpers::MockTransport;

const URL: &str = "http://backend.test/api/user/profile";

// =============================================================================
// classify
// =============================================================================

#[test]
fn every_2xx_is_success() {
    for status in 200..=299 {
        let outcome = classify(status, "{}".into());
        assert!(outcome.is_success(), "expected success for {status}");
    }
}

#[test]
fn success_parses_json_payload() {
    let outcome = classify(200, r#"{"status":"ok"}"#.into());
    assert_eq!(outcome, Outcome::Success(serde_json::json!({ "status": "ok" })));
}

#[test]
fn success_with_text_body_keeps_text() {
    let outcome = classify(204, "done".into());
    assert_eq!(outcome, Outcome::Success(Value::String("done".into())));
}

#[test]
fn exactly_401_is_unauthorized() {
    let outcome = classify(401, "nope".into());
    assert!(matches!(outcome, Outcome::Unauthorized { ref body, diagnosis: None } if body == "nope"));
}

#[test]
fn other_statuses_carry_status_and_body() {
    for status in [301, 400, 403, 404, 500, 503] {
        let outcome = classify(status, "internal error".into());
        assert_eq!(
            outcome,
            Outcome::ClientOrServerError { status, body: "internal error".into() }
        );
    }
}

#[test]
fn into_result_maps_taxonomy() {
    assert!(classify(200, String::new()).into_result().is_ok());
    assert!(matches!(classify(401, String::new()).into_result(), Err(ProbeError::Unauthorized)));
    assert!(matches!(
        classify(500, "x".into()).into_result(),
        Err(ProbeError::Server { status: 500, .. })
    ));
    assert!(matches!(
        Outcome::NetworkError("dns".into()).into_result(),
        Err(ProbeError::Network(_))
    ));
}

#[test]
fn summary_truncates_long_bodies() {
    let outcome = classify(500, "x".repeat(300));
    let summary = outcome.summary();
    assert!(summary.starts_with("500: "));
    assert!(summary.ends_with("..."));
    assert!(summary.len() < 140);
}

// =============================================================================
// run_request
// =============================================================================

#[tokio::test]
async fn attaches_bearer_when_session_has_token() {
    let transport = MockTransport::new().route(Method::GET, URL, 200, "{}");
    let session = session_with_token("tok-123");
    let outcome = run_request(&transport, Some(&session), Method::GET, URL, RequestBody::Empty).await;
    assert!(outcome.is_success());
    assert_eq!(transport.requests()[0].bearer.as_deref(), Some("tok-123"));
}

#[tokio::test]
async fn omits_bearer_without_session() {
    let transport = MockTransport::new().route(Method::GET, URL, 200, "{}");
    run_request(&transport, None, Method::GET, URL, RequestBody::Empty).await;
    assert_eq!(transport.requests()[0].bearer, None);
}

#[tokio::test]
async fn omits_bearer_for_empty_token() {
    let transport = MockTransport::new().route(Method::GET, URL, 200, "{}");
    let session = session_with_token("");
    run_request(&transport, Some(&session), Method::GET, URL, RequestBody::Empty).await;
    assert_eq!(transport.requests()[0].bearer, None);
}

#[tokio::test]
async fn multipart_body_is_passed_through() {
    let transport = MockTransport::new().route(Method::POST, URL, 200, "{}");
    let fields = vec![("prompt".to_owned(), "hi".to_owned())];
    run_request(&transport, None, Method::POST, URL, RequestBody::Multipart(fields.clone())).await;
    assert_eq!(transport.requests()[0].body, RequestBody::Multipart(fields));
}

#[tokio::test]
async fn unauthorized_with_token_runs_diagnostics() {
    let transport = MockTransport::new().route(Method::GET, URL, 401, "bad jwt");
    let session = session_with_token("abc.eyJleHAiOjF9.sig");
    let outcome = run_request(&transport, Some(&session), Method::GET, URL, RequestBody::Empty).await;
    let Outcome::Unauthorized { diagnosis: Some(diagnosis), .. } = &outcome else {
        panic!("expected diagnosed 401, got {outcome:?}");
    };
    assert_eq!(diagnosis.payload.expires_at, Some(1));
    assert_eq!(diagnosis.status, TokenStatus::Expired);
}

#[tokio::test]
async fn unauthorized_with_malformed_token_still_unauthorized() {
    let transport = MockTransport::new().route(Method::GET, URL, 401, "");
    let session = session_with_token("not-a-jwt");
    let outcome = run_request(&transport, Some(&session), Method::GET, URL, RequestBody::Empty).await;
    assert!(matches!(outcome, Outcome::Unauthorized { diagnosis: None, .. }));
}

#[tokio::test]
async fn unauthorized_without_token_skips_diagnostics() {
    let transport = MockTransport::new().route(Method::GET, URL, 401, "");
    let outcome = run_request(&transport, None, Method::GET, URL, RequestBody::Empty).await;
    assert!(matches!(outcome, Outcome::Unauthorized { diagnosis: None, .. }));
}

#[tokio::test]
async fn transport_failure_is_network_error() {
    let transport = MockTransport::new();
    let outcome = run_request(&transport, None, Method::GET, URL, RequestBody::Empty).await;
    assert!(matches!(outcome, Outcome::NetworkError(ref msg) if msg.contains("connection refused")));
    assert_eq!(transport.requests().len(), 1, "no retry");
}
