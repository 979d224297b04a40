//! Session tokens and registration tickets (HS256 JWTs).
//!
//! Expiry is checked against the caller-supplied time rather than the
//! system clock so that the service clock governs both.

use chrono::{DateTime, Utc};
use fixmyarea_core::models::user::{Role, User, UserStatus};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

const REGISTRATION_PURPOSE: &str = "registration";

/// JWT claims embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: user ID (UUID string).
    pub sub: String,
    pub role: Role,
    pub status: UserStatus,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token ID.
    pub jti: String,
}

impl SessionClaims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|e| AuthError::TokenInvalid(format!("bad subject: {e}")))
    }
}

/// Proof that a phone number passed registration OTP verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationTicketClaims {
    /// Subject: the verified phone number.
    pub sub: String,
    pub purpose: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

fn encode<T: Serialize>(claims: &T, config: &AuthConfig) -> Result<String, AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::Crypto("JWT secret is not configured".into()));
    }
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

fn decode<T: DeserializeOwned>(token: &str, config: &AuthConfig) -> Result<T, AuthError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
    validation.validate_exp = false;

    jsonwebtoken::decode::<T>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::TokenInvalid(e.to_string()))
}

/// Issue a session token carrying the user's id, role and status.
pub fn issue_session_token(
    user: &User,
    now: DateTime<Utc>,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let iat = now.timestamp();
    let claims = SessionClaims {
        sub: user.id.to_string(),
        role: user.role,
        status: user.status,
        iss: config.jwt_issuer.clone(),
        iat,
        exp: iat + config.session_lifetime_secs as i64,
        jti: Uuid::new_v4().to_string(),
    };
    encode(&claims, config)
}

/// Verify signature, issuer and expiry of a session token.
pub fn decode_session_token(
    token: &str,
    now: DateTime<Utc>,
    config: &AuthConfig,
) -> Result<SessionClaims, AuthError> {
    let claims: SessionClaims = decode(token, config)?;
    if claims.exp <= now.timestamp() {
        return Err(AuthError::TokenExpired);
    }
    Ok(claims)
}

pub fn issue_registration_ticket(
    phone: &str,
    now: DateTime<Utc>,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let iat = now.timestamp();
    let claims = RegistrationTicketClaims {
        sub: phone.to_string(),
        purpose: REGISTRATION_PURPOSE.into(),
        iss: config.jwt_issuer.clone(),
        iat,
        exp: iat + config.registration_ticket_lifetime_secs as i64,
    };
    encode(&claims, config)
}

/// Accept a ticket only if it is well-formed, unexpired, issued for
/// registration, and bound to `phone`.
pub fn verify_registration_ticket(
    ticket: &str,
    phone: &str,
    now: DateTime<Utc>,
    config: &AuthConfig,
) -> Result<(), AuthError> {
    let claims: RegistrationTicketClaims =
        decode(ticket, config).map_err(|_| AuthError::TicketInvalid)?;
    if claims.purpose != REGISTRATION_PURPOSE
        || claims.sub != phone
        || claims.exp <= now.timestamp()
    {
        return Err(AuthError::TicketInvalid);
    }
    Ok(())
}
