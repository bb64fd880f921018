//! Client for the external OTP endpoint.
//!
//! The endpoint accepts both actions on a single route; the `action` field selects between
//! issuing a new code and verifying one.

mod api_error;
mod http_client;
mod request;
mod response;

use async_trait::async_trait;

pub use api_error::OtpApiError;
pub use http_client::HttpOtpApi;
pub use request::{OtpAction, SendCodeRequest, VerifyCodeRequest};
pub use response::{OtpErrorApiResponse, SendCodeApiResponse, VerifyCodeApiResponse};

/// The two operations the login flow consumes.
#[async_trait]
pub trait OtpApi: Send + Sync {
    /// Issues a new one-time code to the identifier.
    async fn send_code(
        &self,
        request: SendCodeRequest,
    ) -> Result<SendCodeApiResponse, OtpApiError>;

    /// Exchanges a code for a token.
    async fn verify_code(
        &self,
        request: VerifyCodeRequest,
    ) -> Result<VerifyCodeApiResponse, OtpApiError>;
}
