use serde::{Deserialize, Serialize};

/// Success body of a send-code request.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeApiResponse {
    /// Seconds the issued code stays valid. Absent on some backends.
    #[serde(default)]
    pub expires_in: Option<u32>,
    /// The issued code, only returned by development backends.
    #[serde(default)]
    pub debug_otp: Option<String>,
}

/// Success body of a verify-code request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VerifyCodeApiResponse {
    #[allow(missing_docs)]
    pub token: String,
    /// Opaque user object.
    #[serde(default)]
    pub user: serde_json::Value,
}

/// Error body shared by both actions.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OtpErrorApiResponse {
    /// Human readable message, shown verbatim.
    pub error: String,
    /// Machine readable error code, e.g. `rate_limited` or `otp_expired`.
    #[serde(default)]
    pub code: Option<String>,
    /// Seconds to wait before trying again.
    #[serde(default)]
    pub retry_after: Option<u32>,
}

impl OtpErrorApiResponse {
    pub(crate) fn signals_rate_limit(&self) -> bool {
        self.code.as_deref() == Some("rate_limited")
    }
}
