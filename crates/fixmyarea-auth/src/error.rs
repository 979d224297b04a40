//! Authentication error types.

use fixmyarea_core::error::FixMyAreaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please provide phone number and either password or OTP")]
    MissingCredentials,

    #[error("Account is disabled. Please contact administrator.")]
    AccountDisabled,

    #[error("User not found")]
    UserNotFound,

    #[error("Not authorized, no token")]
    NoToken,

    #[error("Token expired. Please login again.")]
    TokenExpired,

    /// Detail is kept for logs; the message shown is fixed.
    #[error("Invalid token. Please login again.")]
    TokenInvalid(String),

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("Phone verification required. Please verify the registration OTP first.")]
    TicketRequired,

    #[error("Phone verification is invalid or has expired. Please verify again.")]
    TicketInvalid,

    #[error("Too many OTP requests. Please wait {window_minutes} minutes before trying again.")]
    RateLimited { window_minutes: i64 },

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for FixMyAreaError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::UserNotFound
            | AuthError::NoToken
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_)
            | AuthError::TicketRequired
            | AuthError::TicketInvalid => FixMyAreaError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::AccountDisabled | AuthError::Forbidden => {
                FixMyAreaError::AuthorizationDenied {
                    reason: err.to_string(),
                }
            }
            AuthError::MissingCredentials => FixMyAreaError::Validation {
                message: err.to_string(),
            },
            AuthError::RateLimited { .. } => FixMyAreaError::RateLimited {
                message: err.to_string(),
            },
            AuthError::Crypto(msg) => FixMyAreaError::Crypto(msg),
        }
    }
}
