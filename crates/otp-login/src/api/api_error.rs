use thiserror::Error;

use crate::{
    api::OtpErrorApiResponse,
    error::{FlowOperation, LoginFlowError},
};

const TOO_MANY_REQUESTS: u16 = 429;

/// Failures talking to the OTP endpoint.
#[derive(Debug, Error)]
pub enum OtpApiError {
    /// The request never produced a response, or the success body could not be read.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a well-formed error body.
    #[error("OTP endpoint returned [{status}] {}", .body.error)]
    Endpoint {
        #[allow(missing_docs)]
        status: u16,
        #[allow(missing_docs)]
        body: OtpErrorApiResponse,
    },

    /// The endpoint answered with an error status and an unreadable body.
    #[error("Unexpected response from OTP endpoint: [{status}] {message}")]
    UnexpectedResponse {
        #[allow(missing_docs)]
        status: u16,
        #[allow(missing_docs)]
        message: String,
        /// Taken from the `Retry-After` header when present.
        retry_after: Option<u32>,
    },
}

impl OtpApiError {
    /// Maps the failure onto the error taxonomy surfaced by the flow.
    pub(crate) fn into_flow_error(self, operation: FlowOperation) -> LoginFlowError {
        let (message, retry_after, rate_limited) = match self {
            OtpApiError::Transport(e) => (format!("Network error: {e}"), None, false),
            OtpApiError::Endpoint { status, body } => {
                let rate_limited = status == TOO_MANY_REQUESTS || body.signals_rate_limit();
                (body.error, body.retry_after, rate_limited)
            }
            OtpApiError::UnexpectedResponse {
                status,
                message,
                retry_after,
            } => (message, retry_after, status == TOO_MANY_REQUESTS),
        };

        if rate_limited {
            return LoginFlowError::RateLimited {
                operation,
                message,
                retry_after,
            };
        }

        match operation {
            FlowOperation::Send => LoginFlowError::SendFailed {
                message,
                retry_after,
            },
            FlowOperation::Verify => LoginFlowError::VerifyFailed {
                message,
                retry_after,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(status: u16, error: &str, code: Option<&str>, retry_after: Option<u32>) -> OtpApiError {
        OtpApiError::Endpoint {
            status,
            body: OtpErrorApiResponse {
                error: error.into(),
                code: code.map(Into::into),
                retry_after,
            },
        }
    }

    #[test]
    fn too_many_requests_is_rate_limited() {
        let err = endpoint(429, "Too many requests", None, Some(30))
            .into_flow_error(FlowOperation::Send);
        assert_eq!(
            err,
            LoginFlowError::RateLimited {
                operation: FlowOperation::Send,
                message: "Too many requests".into(),
                retry_after: Some(30),
            }
        );
    }

    #[test]
    fn rate_limited_code_is_rate_limited_regardless_of_status() {
        let err = endpoint(400, "Slow down", Some("rate_limited"), None)
            .into_flow_error(FlowOperation::Verify);
        assert!(matches!(
            err,
            LoginFlowError::RateLimited {
                operation: FlowOperation::Verify,
                ..
            }
        ));
    }

    #[test]
    fn other_endpoint_errors_keep_message_and_retry_after() {
        let err =
            endpoint(400, "Invalid OTP", None, None).into_flow_error(FlowOperation::Verify);
        assert_eq!(
            err,
            LoginFlowError::VerifyFailed {
                message: "Invalid OTP".into(),
                retry_after: None,
            }
        );

        let err = endpoint(503, "Try later", None, Some(10)).into_flow_error(FlowOperation::Send);
        assert_eq!(
            err,
            LoginFlowError::SendFailed {
                message: "Try later".into(),
                retry_after: Some(10),
            }
        );
    }

    #[test]
    fn unexpected_response_with_429_is_rate_limited() {
        let err = OtpApiError::UnexpectedResponse {
            status: 429,
            message: "Request failed with status 429".into(),
            retry_after: Some(12),
        }
        .into_flow_error(FlowOperation::Send);
        assert_eq!(err.retry_after(), Some(12));
        assert!(matches!(err, LoginFlowError::RateLimited { .. }));
    }
}
