//! End-to-end login flow against a mock OTP endpoint

use std::sync::Arc;

use otp_login::{
    AttemptState, ClientSettings, FlowPhase, FlowSettings, HttpOtpApi, LoginFlow, LoginFlowError,
    LoginIdentifier, ManualScheduler, MemorySessionSink,
};
use otp_test::{code_sent, code_verified, otp_error, send_request, start_otp_mock, verify_request};
use wiremock::MockServer;

struct Harness {
    flow: LoginFlow,
    sink: Arc<MemorySessionSink>,
    clock: ManualScheduler,
    _server: MockServer,
}

async fn harness(mocks: Vec<wiremock::Mock>) -> Harness {
    let (server, base_url) = start_otp_mock(mocks).await;
    let api = HttpOtpApi::new(&ClientSettings {
        api_url: base_url,
        ..Default::default()
    })
    .unwrap();

    let sink = Arc::new(MemorySessionSink::new());
    let clock = ManualScheduler::new();
    let flow = LoginFlow::new(
        Arc::new(api),
        sink.clone(),
        Arc::new(clock.clone()),
        FlowSettings::default(),
    );

    Harness {
        flow,
        sink,
        clock,
        _server: server,
    }
}

fn phone_body() -> serde_json::Value {
    serde_json::json!({ "phone": "+15551234567" })
}

#[tokio::test]
async fn phone_login_happy_path() {
    let h = harness(vec![
        send_request(phone_body())
            .respond_with(code_sent(300))
            .expect(1),
        verify_request(phone_body(), "123456")
            .respond_with(code_verified("t1", serde_json::json!({ "id": "u1" })))
            .expect(1),
    ])
    .await;

    h.flow.submit_identifier("+15551234567").await.unwrap();
    let snap = h.flow.snapshot();
    assert_eq!(snap.phase, FlowPhase::AwaitingCode);
    assert_eq!(snap.resend_cooldown_seconds, 60);
    assert_eq!(snap.expires_in_seconds, 300);

    h.clock.advance_secs(12);
    let session = h.flow.submit_code("123456").await.unwrap();

    assert_eq!(session.token, "t1");
    assert_eq!(session.user, serde_json::json!({ "id": "u1" }));
    assert_eq!(
        h.sink.latest().map(|s| s.identifier),
        Some(LoginIdentifier::Phone("+15551234567".into()))
    );
    assert_eq!(h.flow.snapshot().phase, FlowPhase::Verified);
    assert_eq!(h.clock.active_sources(), 0);
}

#[tokio::test]
async fn wrong_code_then_right_code() {
    let h = harness(vec![
        send_request(phone_body()).respond_with(code_sent(300)),
        verify_request(phone_body(), "000000").respond_with(otp_error(400, "Invalid OTP", None)),
        verify_request(phone_body(), "123456")
            .respond_with(code_verified("t2", serde_json::json!({ "id": "u2" }))),
    ])
    .await;

    h.flow.submit_identifier("+15551234567").await.unwrap();
    h.clock.advance_secs(20);

    let err = h.flow.submit_code("000000").await.unwrap_err();
    assert_eq!(
        err,
        LoginFlowError::VerifyFailed {
            message: "Invalid OTP".into(),
            retry_after: None,
        }
    );
    let snap = h.flow.snapshot();
    assert_eq!(snap.attempt_state, Some(AttemptState::Failed));
    assert_eq!(snap.resend_cooldown_seconds, 40);
    assert_eq!(snap.expires_in_seconds, 280);

    let session = h.flow.submit_code("123456").await.unwrap();
    assert_eq!(session.token, "t2");
    assert_eq!(h.sink.count(), 1);
}

#[tokio::test]
async fn rate_limited_send_surfaces_retry_after() {
    let h = harness(vec![send_request(phone_body())
        .respond_with(otp_error(429, "Too many requests", Some(30)))])
    .await;

    let err = h.flow.submit_identifier("+15551234567").await.unwrap_err();

    assert!(matches!(err, LoginFlowError::RateLimited { .. }));
    assert_eq!(err.retry_after(), Some(30));
    assert_eq!(h.flow.snapshot().phase, FlowPhase::Idle);
    assert_eq!(h.clock.active_sources(), 0);
}

#[tokio::test]
async fn resend_after_cooldown_hits_the_endpoint_again() {
    let h = harness(vec![send_request(phone_body())
        .respond_with(code_sent(300))
        .expect(2)])
    .await;

    h.flow.submit_identifier("+15551234567").await.unwrap();
    assert!(h.flow.resend().await.is_err());

    h.clock.advance_secs(60);
    h.flow.resend().await.unwrap();

    let snap = h.flow.snapshot();
    assert_eq!(snap.resend_cooldown_seconds, 60);
    assert_eq!(snap.expires_in_seconds, 300);
    assert_eq!(h.clock.active_sources(), 1);
}
