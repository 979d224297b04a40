//! One-time password record model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FixMyAreaError;

/// What an OTP proves ownership for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    #[default]
    Registration,
    Login,
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Registration => "registration",
            OtpPurpose::Login => "login",
            OtpPurpose::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtpPurpose {
    type Err = FixMyAreaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registration" => Ok(OtpPurpose::Registration),
            "login" => Ok(OtpPurpose::Login),
            "password_reset" => Ok(OtpPurpose::PasswordReset),
            other => Err(FixMyAreaError::validation(format!(
                "Invalid OTP type: {other}"
            ))),
        }
    }
}

/// Why a submitted code was not accepted. Each reason has its own
/// user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpRejection {
    Invalid,
    Expired,
    TooManyAttempts,
    AlreadyUsed,
}

impl OtpRejection {
    pub fn message(&self) -> &'static str {
        match self {
            OtpRejection::Invalid => "Invalid OTP",
            OtpRejection::Expired => "OTP has expired",
            OtpRejection::TooManyAttempts => "Too many attempts. Please request a new OTP",
            OtpRejection::AlreadyUsed => "OTP already used",
        }
    }
}

impl fmt::Display for OtpRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRecord {
    pub id: Uuid,
    pub phone: String,
    pub email: Option<String>,
    /// Peppered SHA-256 of the code, hex encoded.
    pub code_hash: String,
    pub purpose: OtpPurpose,
    pub is_used: bool,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Usable iff not used, not expired and attempts remain.
    pub fn can_use(&self, now: DateTime<Utc>) -> bool {
        self.rejection(now).is_none()
    }

    /// The reason this record cannot be used, checked in the order
    /// expiry, attempts, usage.
    pub fn rejection(&self, now: DateTime<Utc>) -> Option<OtpRejection> {
        if self.is_expired(now) {
            Some(OtpRejection::Expired)
        } else if self.attempts >= self.max_attempts {
            Some(OtpRejection::TooManyAttempts)
        } else if self.is_used {
            Some(OtpRejection::AlreadyUsed)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateOtp {
    pub phone: String,
    pub email: Option<String>,
    pub code_hash: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
}
