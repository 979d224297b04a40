//! SurrealDB implementation of [`OtpRepository`].
//!
//! Every issued code is also written to `otp_issue`, which is what
//! [`OtpRepository::count_created_since`] counts. Deleting superseded
//! codes therefore never resets the send-rate window.

use chrono::{DateTime, Duration, Utc};
use fixmyarea_core::error::FixMyAreaResult;
use fixmyarea_core::models::otp::{CreateOtp, OtpPurpose, OtpRecord};
use fixmyarea_core::repository::OtpRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_enum, parse_uuid};

const SELECT_ONE: &str = "SELECT meta::id(id) AS record_id, * FROM type::record('otp', $id)";

/// Phone match, or email match when an email was supplied.
const IDENTITY: &str = "(phone = $phone OR ($email != NONE AND email = $email))";

/// How long issue-log entries are kept by `purge_expired`.
const ISSUE_LOG_RETENTION_HOURS: i64 = 24;

#[derive(Debug, SurrealValue)]
struct OtpRow {
    record_id: String,
    phone: String,
    email: Option<String>,
    code_hash: String,
    purpose: String,
    is_used: bool,
    expires_at: DateTime<Utc>,
    attempts: u32,
    max_attempts: u32,
    created_at: DateTime<Utc>,
}

impl OtpRow {
    fn try_into_otp(self) -> Result<OtpRecord, DbError> {
        Ok(OtpRecord {
            id: parse_uuid(&self.record_id, "otp")?,
            phone: self.phone,
            email: self.email,
            code_hash: self.code_hash,
            purpose: parse_enum(&self.purpose)?,
            is_used: self.is_used,
            expires_at: self.expires_at,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn first_otp(rows: Vec<OtpRow>, id: &str) -> Result<OtpRecord, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "otp".into(),
            id: id.to_string(),
        })?
        .try_into_otp()
}

/// SurrealDB implementation of the OTP repository.
#[derive(Clone)]
pub struct SurrealOtpRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOtpRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OtpRepository for SurrealOtpRepository<C> {
    async fn create(&self, input: CreateOtp) -> FixMyAreaResult<OtpRecord> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(format!(
                "CREATE type::record('otp', $id) SET \
                 phone = $phone, email = $email, code_hash = $code_hash, \
                 purpose = $purpose, is_used = false, \
                 expires_at = $expires_at, attempts = 0, \
                 max_attempts = $max_attempts, created_at = $created_at; \
                 CREATE otp_issue SET phone = $phone, email = $email, \
                 purpose = $purpose, created_at = $created_at; \
                 {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("phone", input.phone))
            .bind(("email", input.email))
            .bind(("code_hash", input.code_hash))
            .bind(("purpose", input.purpose.as_str().to_string()))
            .bind(("expires_at", input.expires_at))
            .bind(("max_attempts", input.max_attempts))
            .bind(("created_at", input.created_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<OtpRow> = result.take(2).map_err(DbError::from)?;
        Ok(first_otp(rows, &id_str)?)
    }

    async fn delete_unused(
        &self,
        phone: &str,
        email: Option<&str>,
        purpose: OtpPurpose,
    ) -> FixMyAreaResult<()> {
        self.db
            .query(format!(
                "DELETE otp WHERE {IDENTITY} AND purpose = $purpose \
                 AND is_used = false"
            ))
            .bind(("phone", phone.to_string()))
            .bind(("email", email.map(str::to_string)))
            .bind(("purpose", purpose.as_str().to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn find_latest_unused(
        &self,
        phone: &str,
        email: Option<&str>,
        purpose: OtpPurpose,
        code_hash: &str,
    ) -> FixMyAreaResult<Option<OtpRecord>> {
        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM otp \
                 WHERE {IDENTITY} AND purpose = $purpose \
                 AND code_hash = $code_hash AND is_used = false \
                 ORDER BY created_at DESC LIMIT 1"
            ))
            .bind(("phone", phone.to_string()))
            .bind(("email", email.map(str::to_string)))
            .bind(("purpose", purpose.as_str().to_string()))
            .bind(("code_hash", code_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OtpRow> = result.take(0).map_err(DbError::from)?;
        let record = rows
            .into_iter()
            .next()
            .map(OtpRow::try_into_otp)
            .transpose()?;
        Ok(record)
    }

    async fn count_created_since(
        &self,
        phone: &str,
        email: Option<&str>,
        purpose: OtpPurpose,
        since: DateTime<Utc>,
    ) -> FixMyAreaResult<u64> {
        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM otp_issue \
                 WHERE {IDENTITY} AND purpose = $purpose \
                 AND created_at >= $since GROUP ALL"
            ))
            .bind(("phone", phone.to_string()))
            .bind(("email", email.map(str::to_string)))
            .bind(("purpose", purpose.as_str().to_string()))
            .bind(("since", since))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn increment_attempts(&self, id: Uuid) -> FixMyAreaResult<OtpRecord> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!(
                "UPDATE type::record('otp', $id) SET attempts += 1; {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OtpRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_otp(rows, &id_str)?)
    }

    async fn mark_used(&self, id: Uuid) -> FixMyAreaResult<OtpRecord> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!(
                "UPDATE type::record('otp', $id) SET is_used = true; {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OtpRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_otp(rows, &id_str)?)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> FixMyAreaResult<u64> {
        let horizon = now - Duration::hours(ISSUE_LOG_RETENTION_HOURS);

        let result = self
            .db
            .query(
                "SELECT count() AS total FROM otp WHERE expires_at <= $now GROUP ALL; \
                 DELETE otp WHERE expires_at <= $now; \
                 DELETE otp_issue WHERE created_at < $horizon",
            )
            .bind(("now", now))
            .bind(("horizon", horizon))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
