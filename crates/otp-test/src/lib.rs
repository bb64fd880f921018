//! Wiremock helpers for exercising the OTP endpoint contract.

use wiremock::{
    matchers::{self, body_partial_json},
    Mock, MockServer, ResponseTemplate,
};

/// Route the mock serves both actions on.
pub const OTP_PATH: &str = "/api/auth/otp";

/// Starts a mock server with the given mocks registered and returns it with its base URL.
///
/// Warning: when using `Mock::expect` ensure `server` is not dropped before the test completes.
pub async fn start_otp_mock(mocks: Vec<Mock>) -> (MockServer, String) {
    let server = MockServer::start().await;

    for mock in mocks {
        server.register(mock).await;
    }

    let base_url = server.uri();
    (server, base_url)
}

/// Matches a send-code request for the given identifier body, e.g. `{"phone": "+15551234567"}`.
pub fn send_request(identifier: serde_json::Value) -> wiremock::MockBuilder {
    Mock::given(matchers::method("POST"))
        .and(matchers::path(OTP_PATH))
        .and(body_partial_json(merge(identifier, serde_json::json!({ "action": "send" }))))
}

/// Matches a verify-code request for the given identifier body and code.
pub fn verify_request(identifier: serde_json::Value, otp: &str) -> wiremock::MockBuilder {
    Mock::given(matchers::method("POST"))
        .and(matchers::path(OTP_PATH))
        .and(body_partial_json(merge(
            identifier,
            serde_json::json!({ "otp": otp, "action": "verify" }),
        )))
}

/// A successful send response.
pub fn code_sent(expires_in: u32) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "expiresIn": expires_in }))
}

/// A successful verify response.
pub fn code_verified(token: &str, user: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": token, "user": user }))
}

/// An error response in the endpoint's `{error, code?, retryAfter?}` shape.
pub fn otp_error(status: u16, error: &str, retry_after: Option<u32>) -> ResponseTemplate {
    let mut body = serde_json::json!({ "error": error });
    if let Some(retry_after) = retry_after {
        body["retryAfter"] = retry_after.into();
    }
    ResponseTemplate::new(status).set_body_json(body)
}

fn merge(mut base: serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
    if let (Some(base), serde_json::Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    base
}
