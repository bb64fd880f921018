use serde::{Deserialize, Serialize};

use crate::identifier::{LoginIdentifier, OtpCode};

/// Selects the endpoint behavior.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OtpAction {
    #[allow(missing_docs)]
    Send,
    #[allow(missing_docs)]
    Verify,
}

/// Body of a send-code request, e.g. `{"phone":"+15551234567","action":"send"}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SendCodeRequest {
    #[serde(flatten)]
    #[allow(missing_docs)]
    pub identifier: LoginIdentifier,
    #[allow(missing_docs)]
    pub action: OtpAction,
}

impl SendCodeRequest {
    #[allow(missing_docs)]
    pub fn new(identifier: LoginIdentifier) -> Self {
        Self {
            identifier,
            action: OtpAction::Send,
        }
    }
}

/// Body of a verify-code request, e.g. `{"email":"a@b.co","otp":"123456","action":"verify"}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VerifyCodeRequest {
    #[serde(flatten)]
    #[allow(missing_docs)]
    pub identifier: LoginIdentifier,
    #[allow(missing_docs)]
    pub otp: String,
    #[allow(missing_docs)]
    pub action: OtpAction,
}

impl VerifyCodeRequest {
    #[allow(missing_docs)]
    pub fn new(identifier: LoginIdentifier, code: &OtpCode) -> Self {
        Self {
            identifier,
            otp: code.as_str().to_owned(),
            action: OtpAction::Verify,
        }
    }
}
