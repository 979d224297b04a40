//! OTP ledger: issue, rate-limit and verify short-lived numeric codes.
//!
//! Codes are never stored. Records carry `hex(sha256(pepper || code))`
//! and lookups hash the submitted code the same way.

use std::sync::Arc;

use chrono::Duration;
use fixmyarea_core::clock::Clock;
use fixmyarea_core::error::{FixMyAreaError, FixMyAreaResult};
use fixmyarea_core::models::otp::{CreateOtp, OtpPurpose, OtpRecord, OtpRejection};
use fixmyarea_core::repository::OtpRepository;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::AuthConfig;

/// A freshly stored record together with the plaintext code to send.
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub record: OtpRecord,
    pub code: String,
}

/// Uniform six-digit code in `100000..=999999`.
pub fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999u32).to_string()
}

pub fn hash_code(code: &str, pepper: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    if let Some(p) = pepper {
        hasher.update(p.as_bytes());
    }
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct OtpLedger<O: OtpRepository> {
    repo: O,
    clock: Arc<dyn Clock>,
    pepper: Option<String>,
    expiry: Duration,
    max_attempts: u32,
    rate_limit_max: u64,
    rate_limit_window: Duration,
}

impl<O: OtpRepository> OtpLedger<O> {
    pub fn new(repo: O, clock: Arc<dyn Clock>, config: &AuthConfig) -> Self {
        Self {
            repo,
            clock,
            pepper: config.pepper.clone(),
            expiry: Duration::minutes(config.otp_expiry_minutes),
            max_attempts: config.otp_max_attempts,
            rate_limit_max: config.otp_rate_limit_max,
            rate_limit_window: Duration::minutes(config.otp_rate_limit_window_minutes),
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Replace any unused code for the identity and purpose with a new
    /// one. Expired records are purged on the way.
    pub async fn create_otp(
        &self,
        phone: &str,
        email: Option<&str>,
        purpose: OtpPurpose,
    ) -> FixMyAreaResult<IssuedOtp> {
        let now = self.clock.now();

        if let Err(e) = self.repo.purge_expired(now).await {
            warn!(error = %e, "Failed to purge expired OTPs");
        }

        self.repo.delete_unused(phone, email, purpose).await?;

        let code = generate_code();
        let record = self
            .repo
            .create(CreateOtp {
                phone: phone.to_string(),
                email: email.map(str::to_string),
                code_hash: hash_code(&code, self.pepper.as_deref()),
                purpose,
                expires_at: now + self.expiry,
                max_attempts: self.max_attempts,
                created_at: now,
            })
            .await?;

        info!(phone, %purpose, otp_id = %record.id, "OTP created");
        debug!(phone, %purpose, code = %code, "OTP code");

        Ok(IssuedOtp { record, code })
    }

    /// `true` while fewer than the allowed number of codes were issued
    /// in the trailing window. A failed count allows the send.
    pub async fn check_rate_limit(
        &self,
        phone: &str,
        email: Option<&str>,
        purpose: OtpPurpose,
    ) -> bool {
        let since = self.clock.now() - self.rate_limit_window;
        match self
            .repo
            .count_created_since(phone, email, purpose, since)
            .await
        {
            Ok(count) => count < self.rate_limit_max,
            Err(e) => {
                warn!(phone, %purpose, error = %e, "OTP rate-limit check failed, allowing");
                true
            }
        }
    }

    /// Accept `code` for the identity and purpose, consuming it.
    ///
    /// A successful verification also counts as an attempt, so the
    /// consumed record ends with `attempts = 1`. A record found through
    /// the email alone is still rejected unless it was sent to `phone`.
    pub async fn verify_otp(
        &self,
        phone: &str,
        email: Option<&str>,
        code: &str,
        purpose: OtpPurpose,
    ) -> FixMyAreaResult<OtpRecord> {
        let code_hash = hash_code(code, self.pepper.as_deref());

        let Some(record) = self
            .repo
            .find_latest_unused(phone, email, purpose, &code_hash)
            .await?
        else {
            info!(phone, %purpose, "OTP rejected: no matching code");
            return Err(FixMyAreaError::OtpRejected(OtpRejection::Invalid));
        };

        if record.phone != phone {
            info!(phone, %purpose, otp_id = %record.id, "OTP rejected: issued to another phone");
            return Err(FixMyAreaError::OtpRejected(OtpRejection::Invalid));
        }

        if let Some(rejection) = record.rejection(self.clock.now()) {
            info!(phone, %purpose, otp_id = %record.id, %rejection, "OTP rejected");
            return Err(FixMyAreaError::OtpRejected(rejection));
        }

        self.repo.increment_attempts(record.id).await?;
        let record = self.repo.mark_used(record.id).await?;

        info!(phone, %purpose, otp_id = %record.id, "OTP verified");
        Ok(record)
    }

    pub async fn purge_expired(&self) -> FixMyAreaResult<u64> {
        self.repo.purge_expired(self.clock.now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn hash_depends_on_pepper() {
        let plain = hash_code("123456", None);
        assert_eq!(plain.len(), 64);
        assert_eq!(plain, hash_code("123456", None));
        assert_ne!(plain, hash_code("123456", Some("pepper")));
        assert_ne!(plain, hash_code("123457", None));
    }
}
