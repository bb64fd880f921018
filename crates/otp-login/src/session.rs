use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifier::LoginIdentifier;

/// Where the controller is in the two-phase login.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowPhase {
    /// Identifier entry. No session exists.
    Idle,
    /// A send request is in flight.
    Sending,
    /// Code entry.
    AwaitingCode,
    /// A verify request is in flight.
    Verifying,
    /// Terminal. The session was handed to the sink.
    Verified,
}

/// State of the current verification attempt.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    #[allow(missing_docs)]
    AwaitingCode,
    #[allow(missing_docs)]
    Verifying,
    #[allow(missing_docs)]
    Verified,
    /// The last verify attempt was rejected. The code can be re-entered.
    Failed,
}

/// One outstanding verification attempt, created when a send succeeds.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OtpSession {
    /// Fixed for the lifetime of the session.
    pub identifier: LoginIdentifier,
    /// When the most recent successful send completed.
    pub requested_at: DateTime<Utc>,
    /// Seconds until the issued code expires.
    pub expires_in_seconds: u32,
    /// Seconds until `resend` is permitted.
    pub resend_cooldown_seconds: u32,
    #[allow(missing_docs)]
    pub attempt_state: AttemptState,
}

impl OtpSession {
    pub(crate) fn new(identifier: LoginIdentifier, expires_in: u32, cooldown: u32) -> Self {
        OtpSession {
            identifier,
            requested_at: Utc::now(),
            expires_in_seconds: expires_in,
            resend_cooldown_seconds: cooldown,
            attempt_state: AttemptState::AwaitingCode,
        }
    }

    /// Applies a successful re-send.
    pub(crate) fn restart(&mut self, expires_in: u32, cooldown: u32) {
        self.requested_at = Utc::now();
        self.expires_in_seconds = expires_in;
        self.resend_cooldown_seconds = cooldown;
        self.attempt_state = AttemptState::AwaitingCode;
    }

    /// Advances both countdowns by one tick. Returns which ones reached zero on this tick.
    pub(crate) fn tick(&mut self) -> TickOutcome {
        let cooldown_before = self.resend_cooldown_seconds;
        let expiry_before = self.expires_in_seconds;

        self.resend_cooldown_seconds = cooldown_before.saturating_sub(1);
        self.expires_in_seconds = expiry_before.saturating_sub(1);

        TickOutcome {
            resend_enabled: cooldown_before == 1,
            code_expired: expiry_before == 1,
        }
    }

    #[allow(missing_docs)]
    pub fn can_resend(&self) -> bool {
        self.resend_cooldown_seconds == 0
    }

    /// Advisory only; the endpoint decides whether a code is still acceptable.
    pub fn is_expired(&self) -> bool {
        self.expires_in_seconds == 0
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct TickOutcome {
    pub resend_enabled: bool,
    pub code_expired: bool,
}

/// Handed to the [`SessionSink`](crate::SessionSink) once verification succeeds.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AuthenticatedSession {
    #[allow(missing_docs)]
    pub identifier: LoginIdentifier,
    /// Token returned by the verify endpoint.
    pub token: String,
    /// User object returned by the verify endpoint, passed through untouched.
    pub user: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_in: u32, cooldown: u32) -> OtpSession {
        OtpSession::new(LoginIdentifier::Phone("+15551234567".into()), expires_in, cooldown)
    }

    #[test]
    fn tick_reports_transitions_to_zero_once() {
        let mut s = session(2, 1);

        assert_eq!(
            s.tick(),
            TickOutcome {
                resend_enabled: true,
                code_expired: false
            }
        );
        assert!(s.can_resend());

        assert_eq!(
            s.tick(),
            TickOutcome {
                resend_enabled: false,
                code_expired: true
            }
        );
        assert!(s.is_expired());

        // Both countdowns saturate at zero.
        assert_eq!(s.tick(), TickOutcome::default());
        assert_eq!(s.resend_cooldown_seconds, 0);
        assert_eq!(s.expires_in_seconds, 0);
    }

    #[test]
    fn restart_resets_countdowns_and_attempt() {
        let mut s = session(10, 0);
        s.attempt_state = AttemptState::Failed;

        s.restart(300, 60);

        assert_eq!(s.expires_in_seconds, 300);
        assert_eq!(s.resend_cooldown_seconds, 60);
        assert_eq!(s.attempt_state, AttemptState::AwaitingCode);
    }
}
