use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing rules for a [`LoginFlow`](crate::LoginFlow).
///
/// Defaults to
///
/// ```
/// # use otp_login::FlowSettings;
/// let settings = FlowSettings {
///     resend_cooldown_seconds: 60,
///     default_expiry_seconds: 300,
///     tick_interval_ms: 1000,
/// };
/// assert_eq!(settings, FlowSettings::default());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FlowSettings {
    /// Seconds after each successful send before `resend` is allowed again.
    pub resend_cooldown_seconds: u32,
    /// Code validity assumed when the send response omits `expiresIn`.
    pub default_expiry_seconds: u32,
    /// Period of the countdown tick. Each tick removes one second from both countdowns.
    pub tick_interval_ms: u64,
}

impl FlowSettings {
    pub(crate) fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            resend_cooldown_seconds: 60,
            default_expiry_seconds: 300,
            tick_interval_ms: 1000,
        }
    }
}

/// Where [`HttpOtpApi`](crate::HttpOtpApi) sends its requests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientSettings {
    /// Base URL of the backend, without a trailing slash. Defaults to `http://localhost:3000`
    pub api_url: String,
    /// Route that accepts both send and verify actions. Defaults to `/api/auth/otp`
    pub otp_path: String,
    /// The user agent sent with every request.
    pub user_agent: String,
}

impl ClientSettings {
    pub(crate) fn otp_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            self.otp_path.trim_start_matches('/')
        )
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".into(),
            otp_path: "/api/auth/otp".into(),
            user_agent: "otp-login Rust client".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_in_defaults() {
        let settings: FlowSettings =
            serde_json::from_str(r#"{ "resendCooldownSeconds": 30 }"#).unwrap();
        assert_eq!(settings.resend_cooldown_seconds, 30);
        assert_eq!(settings.default_expiry_seconds, 300);
        assert_eq!(settings.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<FlowSettings>(r#"{ "cooldown": 30 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn otp_url_joins_without_double_slash() {
        let settings = ClientSettings {
            api_url: "https://example.com/".into(),
            ..Default::default()
        };
        assert_eq!(settings.otp_url(), "https://example.com/api/auth/otp");
    }
}
