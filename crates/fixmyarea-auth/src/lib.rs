//! FixMyArea Auth — OTP ledger and dispatch, password hashing,
//! session tokens, registration/login orchestration and access
//! control.

pub mod access;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod otp;
pub mod password;
pub mod service;
pub mod token;

pub use access::AccessControl;
pub use config::{AuthConfig, RegistrationTrust};
pub use dispatch::{DispatchOutcome, LogProvider, MessageProvider, OtpNotifier};
pub use error::AuthError;
pub use otp::{IssuedOtp, OtpLedger};
pub use service::{AuthService, AuthSession};
