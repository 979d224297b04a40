//! Error types for the FixMyArea system.

use thiserror::Error;

use crate::models::otp::OtpRejection;

#[derive(Debug, Error)]
pub enum FixMyAreaError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A phone-based flow hit an unknown phone.
    #[error("User not found. Please register first.")]
    NotRegistered { phone: String },

    #[error("{message}")]
    AlreadyExists { entity: String, message: String },

    #[error("{reason}")]
    AuthenticationFailed { reason: String },

    #[error("{reason}")]
    AuthorizationDenied { reason: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("{0}")]
    OtpRejected(OtpRejection),

    #[error("{message}")]
    RateLimited { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FixMyAreaError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            reason: reason.into(),
        }
    }

    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            reason: reason.into(),
        }
    }
}

impl From<validator::ValidationErrors> for FixMyAreaError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation {
            message: crate::validation::describe(&errors),
        }
    }
}

pub type FixMyAreaResult<T> = Result<T, FixMyAreaError>;
