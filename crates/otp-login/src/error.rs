//! Errors surfaced by the login flow

use serde::Serialize;
use thiserror::Error;

use crate::session::FlowPhase;

/// Local, pre-flight validation failures. These never reach the network.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationError {
    /// Nothing was entered.
    #[error("Enter a phone number or email address")]
    EmptyIdentifier,

    /// Too few digits remain after stripping formatting characters.
    #[error("Phone number must contain at least {min_digits} digits")]
    InvalidPhone {
        /// Minimum number of digits accepted.
        min_digits: usize,
    },

    /// Missing `@`, or the domain after it is empty or has no `.`.
    #[error("Enter a valid email address")]
    InvalidEmail,

    /// The code is not exactly the expected number of ASCII digits.
    #[error("Code must be exactly {length} digits")]
    InvalidCode {
        /// Number of digits a code must have.
        length: usize,
    },
}

/// The network operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowOperation {
    #[allow(missing_docs)]
    Send,
    #[allow(missing_docs)]
    Verify,
}

impl std::fmt::Display for FlowOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowOperation::Send => write!(f, "send"),
            FlowOperation::Verify => write!(f, "verify"),
        }
    }
}

/// Every error a [`LoginFlow`](crate::LoginFlow) operation can return.
///
/// The first four variants are user-visible failures and are also attached to the resulting
/// [`FlowSnapshot`](crate::FlowSnapshot). The remaining variants are guard rejections for
/// actions the presentation layer should have disabled; they are returned but leave the state
/// untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoginFlowError {
    /// Input was rejected locally; no request was made.
    #[error(transparent)]
    Validation(ValidationError),

    /// Sending the code failed.
    #[error("Failed to send code: {message}")]
    SendFailed {
        #[allow(missing_docs)]
        message: String,
        /// Seconds the server asked the client to wait, if any.
        retry_after: Option<u32>,
    },

    /// Verifying the code failed.
    #[error("Failed to verify code: {message}")]
    VerifyFailed {
        #[allow(missing_docs)]
        message: String,
        /// Seconds the server asked the client to wait, if any.
        retry_after: Option<u32>,
    },

    /// The endpoint rate-limited a send or verify request.
    #[error("Too many {operation} attempts: {message}")]
    RateLimited {
        #[allow(missing_docs)]
        operation: FlowOperation,
        #[allow(missing_docs)]
        message: String,
        /// Seconds the server asked the client to wait, if any.
        retry_after: Option<u32>,
    },

    /// `resend` was called before the cooldown elapsed.
    #[error("A new code can be requested in {remaining_seconds} seconds")]
    ResendUnavailable {
        #[allow(missing_docs)]
        remaining_seconds: u32,
    },

    /// A send or verify request is already outstanding.
    #[error("A request is already in progress")]
    RequestInFlight,

    /// The operation is not available in the current phase.
    #[error("Cannot {operation} while {phase:?}")]
    InvalidOperation {
        #[allow(missing_docs)]
        operation: &'static str,
        #[allow(missing_docs)]
        phase: FlowPhase,
    },

    /// The flow was reset while the request was outstanding, so its response was discarded.
    #[error("The login flow was reset before the request completed")]
    Superseded,
}

impl LoginFlowError {
    /// Seconds to wait before retrying, for the variants that carry one.
    pub fn retry_after(&self) -> Option<u32> {
        match self {
            LoginFlowError::SendFailed { retry_after, .. }
            | LoginFlowError::VerifyFailed { retry_after, .. }
            | LoginFlowError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Whether this error is attached to the state rather than only returned.
    pub(crate) fn is_user_visible(&self) -> bool {
        matches!(
            self,
            LoginFlowError::Validation(_)
                | LoginFlowError::SendFailed { .. }
                | LoginFlowError::VerifyFailed { .. }
                | LoginFlowError::RateLimited { .. }
        )
    }
}

impl From<ValidationError> for LoginFlowError {
    fn from(value: ValidationError) -> Self {
        LoginFlowError::Validation(value)
    }
}
