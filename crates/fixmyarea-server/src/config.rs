//! Environment-driven server configuration.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use fixmyarea_auth::{AuthConfig, RegistrationTrust};
use fixmyarea_db::DbConfig;

/// Where OTP messages go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpDelivery {
    /// Write codes to the log. For development only.
    Log,
    /// No provider; sends are reported as failed.
    Disabled,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database: DbConfig,
    pub auth: AuthConfig,
    /// Allowed browser origin. `None` allows any origin.
    pub cors_origin: Option<String>,
    pub otp_delivery: OtpDelivery,
    pub location_cache_ttl_secs: i64,
}

fn var_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("Failed to parse {name}")),
        Err(_) => Ok(default),
    }
}

fn string_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = var_or("SERVER_HOST", IpAddr::from([0, 0, 0, 0]))?;
        let port = var_or("SERVER_PORT", 5000u16)?;

        let db_defaults = DbConfig::default();
        let database = DbConfig {
            url: string_or("DATABASE_URL", &db_defaults.url),
            namespace: string_or("DATABASE_NAMESPACE", &db_defaults.namespace),
            database: string_or("DATABASE_NAME", &db_defaults.database),
            username: string_or("DATABASE_USER", &db_defaults.username),
            password: string_or("DATABASE_PASSWORD", &db_defaults.password),
        };

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        let registration_trust = match string_or("REGISTRATION_TRUST", "ticket").as_str() {
            "ticket" => RegistrationTrust::VerifiedTicket,
            "client" => RegistrationTrust::ClientAttested,
            other => bail!("Invalid REGISTRATION_TRUST: {other} (expected ticket or client)"),
        };
        let auth_defaults = AuthConfig::default();
        let auth = AuthConfig {
            jwt_secret,
            jwt_issuer: string_or("JWT_ISSUER", &auth_defaults.jwt_issuer),
            pepper: env::var("PASSWORD_PEPPER").ok().filter(|p| !p.is_empty()),
            otp_expiry_minutes: var_or("OTP_EXPIRY_MINUTES", auth_defaults.otp_expiry_minutes)?,
            registration_trust,
            ..auth_defaults
        };

        let otp_delivery = match string_or("OTP_PROVIDER", "none").as_str() {
            "log" => OtpDelivery::Log,
            "none" | "" => OtpDelivery::Disabled,
            other => bail!("Invalid OTP_PROVIDER: {other} (expected log or none)"),
        };

        Ok(Config {
            host,
            port,
            database,
            auth,
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|o| !o.is_empty()),
            otp_delivery,
            location_cache_ttl_secs: var_or("LOCATION_CACHE_TTL_SECS", 300i64)?,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
