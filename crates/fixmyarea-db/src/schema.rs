//! Schema definitions and migration runner for SurrealDB.
//!
//! Flat tables are SCHEMAFULL. Document tables that embed nested
//! arrays (comments, photos, notes, assignment areas) are SCHEMALESS
//! with their top-level fields still typed. UUIDs are stored as
//! strings; enums as their wire strings with ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMALESS;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['resident', 'staff', 'admin'];
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD phone ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE option<string>;
DEFINE FIELD gender ON TABLE user TYPE option<string> \
    ASSERT $value = NONE OR $value IN ['Male', 'Female', 'Other'];
DEFINE FIELD dob ON TABLE user TYPE option<datetime>;
DEFINE FIELD location ON TABLE user TYPE object;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD areas_assigned ON TABLE user TYPE array DEFAULT [];
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['active', 'disabled'];
DEFINE FIELD last_login ON TABLE user TYPE option<datetime>;
DEFINE FIELD login_count ON TABLE user TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_phone ON TABLE user COLUMNS phone UNIQUE;
DEFINE INDEX idx_user_role ON TABLE user COLUMNS role;

-- =======================================================================
-- OTP ledger
-- =======================================================================
DEFINE TABLE otp SCHEMAFULL;
DEFINE FIELD phone ON TABLE otp TYPE string;
DEFINE FIELD email ON TABLE otp TYPE option<string>;
DEFINE FIELD code_hash ON TABLE otp TYPE string;
DEFINE FIELD purpose ON TABLE otp TYPE string \
    ASSERT $value IN ['registration', 'login', 'password_reset'];
DEFINE FIELD is_used ON TABLE otp TYPE bool DEFAULT false;
DEFINE FIELD expires_at ON TABLE otp TYPE datetime;
DEFINE FIELD attempts ON TABLE otp TYPE int DEFAULT 0;
DEFINE FIELD max_attempts ON TABLE otp TYPE int DEFAULT 3;
DEFINE FIELD created_at ON TABLE otp TYPE datetime;
DEFINE INDEX idx_otp_phone_purpose ON TABLE otp COLUMNS phone, purpose;
DEFINE INDEX idx_otp_expires ON TABLE otp COLUMNS expires_at;

-- One row per issued code. Superseded codes are deleted from `otp`,
-- so send-rate limiting counts these instead.
DEFINE TABLE otp_issue SCHEMAFULL;
DEFINE FIELD phone ON TABLE otp_issue TYPE string;
DEFINE FIELD email ON TABLE otp_issue TYPE option<string>;
DEFINE FIELD purpose ON TABLE otp_issue TYPE string;
DEFINE FIELD created_at ON TABLE otp_issue TYPE datetime;
DEFINE INDEX idx_otp_issue_phone_purpose ON TABLE otp_issue \
    COLUMNS phone, purpose;

-- =======================================================================
-- Complaints
-- =======================================================================
DEFINE TABLE complaint SCHEMALESS;
DEFINE FIELD resident_id ON TABLE complaint TYPE string;
DEFINE FIELD category ON TABLE complaint TYPE string;
DEFINE FIELD description ON TABLE complaint TYPE string;
DEFINE FIELD images ON TABLE complaint TYPE array<string> DEFAULT [];
DEFINE FIELD location ON TABLE complaint TYPE object;
DEFINE FIELD status ON TABLE complaint TYPE string \
    ASSERT $value IN ['Pending', 'In Progress', 'Resolved'];
DEFINE FIELD priority ON TABLE complaint TYPE string \
    ASSERT $value IN ['Low', 'Medium', 'High'];
DEFINE FIELD assigned_to ON TABLE complaint TYPE option<string>;
DEFINE FIELD upvotes ON TABLE complaint TYPE int DEFAULT 0;
DEFINE FIELD upvoters ON TABLE complaint TYPE array<string> DEFAULT [];
DEFINE FIELD comments ON TABLE complaint TYPE array DEFAULT [];
DEFINE FIELD created_at ON TABLE complaint TYPE datetime;
DEFINE FIELD updated_at ON TABLE complaint TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_complaint_resident ON TABLE complaint COLUMNS resident_id;
DEFINE INDEX idx_complaint_assignee ON TABLE complaint COLUMNS assigned_to;
DEFINE INDEX idx_complaint_status ON TABLE complaint COLUMNS status;

-- =======================================================================
-- Dog records
-- =======================================================================
DEFINE TABLE dog_record SCHEMALESS;
DEFINE FIELD dog_id ON TABLE dog_record TYPE string;
DEFINE FIELD breed ON TABLE dog_record TYPE string;
DEFINE FIELD color ON TABLE dog_record TYPE string;
DEFINE FIELD size ON TABLE dog_record TYPE string \
    ASSERT $value IN ['Small', 'Medium', 'Large'];
DEFINE FIELD age ON TABLE dog_record TYPE int \
    ASSERT $value >= 0 AND $value <= 25;
DEFINE FIELD gender ON TABLE dog_record TYPE string \
    ASSERT $value IN ['Male', 'Female'];
DEFINE FIELD vaccination_status ON TABLE dog_record TYPE string \
    ASSERT $value IN ['Not Vaccinated', 'Partially Vaccinated', \
    'Fully Vaccinated'];
DEFINE FIELD last_vaccination_date ON TABLE dog_record \
    TYPE option<datetime>;
DEFINE FIELD next_vaccination_due ON TABLE dog_record \
    TYPE option<datetime>;
DEFINE FIELD sterilization_status ON TABLE dog_record TYPE string \
    ASSERT $value IN ['Not Sterilized', 'Sterilized'];
DEFINE FIELD sterilization_date ON TABLE dog_record TYPE option<datetime>;
DEFINE FIELD is_aggressive ON TABLE dog_record TYPE bool DEFAULT false;
DEFINE FIELD is_rabid ON TABLE dog_record TYPE bool DEFAULT false;
DEFINE FIELD health_notes ON TABLE dog_record TYPE option<string>;
DEFINE FIELD location ON TABLE dog_record TYPE object;
DEFINE FIELD status ON TABLE dog_record TYPE string \
    ASSERT $value IN ['Active', 'Transferred to Shelter', 'Adopted', \
    'Deceased', 'Lost'];
DEFINE FIELD shelter_info ON TABLE dog_record TYPE option<object>;
DEFINE FIELD photos ON TABLE dog_record TYPE array DEFAULT [];
DEFINE FIELD first_seen_date ON TABLE dog_record TYPE datetime;
DEFINE FIELD last_seen_date ON TABLE dog_record TYPE datetime;
DEFINE FIELD assigned_to ON TABLE dog_record TYPE string;
DEFINE FIELD related_complaints ON TABLE dog_record TYPE array<string> \
    DEFAULT [];
DEFINE FIELD notes ON TABLE dog_record TYPE array DEFAULT [];
DEFINE FIELD created_at ON TABLE dog_record TYPE datetime;
DEFINE FIELD updated_at ON TABLE dog_record TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_dog_record_tag ON TABLE dog_record COLUMNS dog_id UNIQUE;
DEFINE INDEX idx_dog_record_status ON TABLE dog_record COLUMNS status;

-- =======================================================================
-- Counters (dog tag sequence)
-- =======================================================================
DEFINE TABLE sequence SCHEMAFULL;
DEFINE FIELD value ON TABLE sequence TYPE int;

-- =======================================================================
-- Location catalog
-- =======================================================================
DEFINE TABLE location_catalog SCHEMAFULL;
DEFINE FIELD state ON TABLE location_catalog TYPE string;
DEFINE FIELD district ON TABLE location_catalog TYPE string;
DEFINE FIELD village ON TABLE location_catalog TYPE string;
DEFINE INDEX idx_location_catalog_triple ON TABLE location_catalog \
    COLUMNS state, district, village UNIQUE;
";

/// Apply every migration newer than the recorded schema version.
///
/// Safe to call on every start-up.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    Ok(())
}

/// Raw DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
