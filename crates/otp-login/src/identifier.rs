use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Minimum number of digits a phone number must have after normalization.
pub const MIN_PHONE_DIGITS: usize = 7;

/// Number of digits in a one-time code.
pub const OTP_CODE_LENGTH: usize = 6;

/// The phone number or email address a login attempt is keyed on.
///
/// Serializes as `{"phone": "..."}` or `{"email": "..."}` so it can be flattened into request
/// bodies.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LoginIdentifier {
    /// A normalized phone number: digits only, with the leading `+` kept when present.
    Phone(String),
    /// A trimmed email address.
    Email(String),
}

impl LoginIdentifier {
    /// Parses free-form input, treating anything containing `@` as an email address.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyIdentifier);
        }
        if trimmed.contains('@') {
            Self::email(trimmed)
        } else {
            Self::phone(trimmed)
        }
    }

    /// Normalizes and validates a phone number.
    pub fn phone(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyIdentifier);
        }

        let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < MIN_PHONE_DIGITS {
            return Err(ValidationError::InvalidPhone {
                min_digits: MIN_PHONE_DIGITS,
            });
        }

        let normalized = if trimmed.starts_with('+') {
            format!("+{digits}")
        } else {
            digits
        };
        Ok(LoginIdentifier::Phone(normalized))
    }

    /// Validates an email address. Only the shape is checked; the endpoint is the source of truth.
    pub fn email(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyIdentifier);
        }

        match trimmed.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
                Ok(LoginIdentifier::Email(trimmed.to_owned()))
            }
            _ => Err(ValidationError::InvalidEmail),
        }
    }

    /// The normalized value sent to the endpoint.
    pub fn value(&self) -> &str {
        match self {
            LoginIdentifier::Phone(value) | LoginIdentifier::Email(value) => value,
        }
    }

    /// A form of the identifier safe to write to logs.
    pub(crate) fn masked(&self) -> String {
        match self {
            LoginIdentifier::Phone(value) => {
                let keep = value.len().saturating_sub(4);
                let tail: String = value.chars().skip(keep).collect();
                format!("***{tail}")
            }
            LoginIdentifier::Email(value) => match value.split_once('@') {
                Some((_, domain)) => format!("***@{domain}"),
                None => "***".to_owned(),
            },
        }
    }
}

impl fmt::Display for LoginIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// A one-time code that passed local format validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Accepts exactly [`OTP_CODE_LENGTH`] ASCII digits and nothing else.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        if input.len() == OTP_CODE_LENGTH && input.bytes().all(|b| b.is_ascii_digit()) {
            Ok(OtpCode(input.to_owned()))
        } else {
            Err(ValidationError::InvalidCode {
                length: OTP_CODE_LENGTH,
            })
        }
    }

    #[allow(missing_docs)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Filters raw keystrokes for the code field: non-digits are dropped and the result is capped at
/// [`OTP_CODE_LENGTH`] digits.
pub fn sanitize_code_input(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(OTP_CODE_LENGTH)
        .collect()
}
