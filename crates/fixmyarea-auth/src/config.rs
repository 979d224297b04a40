//! Authentication configuration.

/// How `register` treats proof of phone ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationTrust {
    /// `register` requires the signed ticket returned by a successful
    /// registration OTP verification.
    #[default]
    VerifiedTicket,
    /// `register` trusts the client to have verified the OTP first.
    /// A ticket, when supplied, is still checked.
    ClientAttested,
}

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for session tokens and registration tickets.
    pub jwt_secret: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Session token lifetime in seconds (default: 604_800 = 7 days).
    pub session_lifetime_secs: u64,
    /// Optional pepper prepended to passwords and OTP codes before
    /// hashing.
    pub pepper: Option<String>,
    pub min_password_length: usize,
    /// OTP validity in minutes (default: 10).
    pub otp_expiry_minutes: i64,
    /// Verification attempts allowed per OTP (default: 3).
    pub otp_max_attempts: u32,
    /// OTP sends allowed per identity and purpose within the window
    /// (default: 3).
    pub otp_rate_limit_max: u64,
    /// Rate-limit window in minutes (default: 15).
    pub otp_rate_limit_window_minutes: i64,
    pub registration_trust: RegistrationTrust,
    /// Registration ticket lifetime in seconds (default: 900).
    pub registration_ticket_lifetime_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: "fixmyarea".into(),
            session_lifetime_secs: 604_800,
            pepper: None,
            min_password_length: 6,
            otp_expiry_minutes: 10,
            otp_max_attempts: 3,
            otp_rate_limit_max: 3,
            otp_rate_limit_window_minutes: 15,
            registration_trust: RegistrationTrust::default(),
            registration_ticket_lifetime_secs: 900,
        }
    }
}
