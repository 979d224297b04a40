//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Lookups by id fail with
//! [`FixMyAreaError::NotFound`](crate::error::FixMyAreaError::NotFound);
//! lookups by natural key return `Option`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::FixMyAreaResult;
use crate::models::{
    complaint::{Comment, Complaint, ComplaintFilter, CreateComplaint, UpdateComplaint},
    dog::{
        CreateDogRecord, DogFilter, DogNote, DogOutcome, DogPhoto, DogRecord, ShelterInfo,
        SterilizationStatus, UpdateDogDetails, VaccinationChange,
    },
    location::LocationEntry,
    otp::{CreateOtp, OtpPurpose, OtpRecord},
    user::{CreateUser, UpdateUser, User, UserFilter},
};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the phone is taken.
    fn create(&self, input: CreateUser) -> impl Future<Output = FixMyAreaResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = FixMyAreaResult<User>> + Send;
    fn find_by_phone(
        &self,
        phone: &str,
    ) -> impl Future<Output = FixMyAreaResult<Option<User>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = FixMyAreaResult<User>> + Send;
    fn list(&self, filter: UserFilter) -> impl Future<Output = FixMyAreaResult<Vec<User>>> + Send;
    /// Set `last_login` and bump `login_count` in one statement.
    fn record_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = FixMyAreaResult<User>> + Send;
}

// ---------------------------------------------------------------------------
// OTP ledger
// ---------------------------------------------------------------------------

/// Identity matching throughout is "phone, or email when one is given".
pub trait OtpRepository: Send + Sync {
    fn create(&self, input: CreateOtp) -> impl Future<Output = FixMyAreaResult<OtpRecord>> + Send;
    /// Delete every unused record for the identity and purpose.
    fn delete_unused(
        &self,
        phone: &str,
        email: Option<&str>,
        purpose: OtpPurpose,
    ) -> impl Future<Output = FixMyAreaResult<()>> + Send;
    /// Most recently created unused record carrying `code_hash`.
    fn find_latest_unused(
        &self,
        phone: &str,
        email: Option<&str>,
        purpose: OtpPurpose,
        code_hash: &str,
    ) -> impl Future<Output = FixMyAreaResult<Option<OtpRecord>>> + Send;
    fn count_created_since(
        &self,
        phone: &str,
        email: Option<&str>,
        purpose: OtpPurpose,
        since: DateTime<Utc>,
    ) -> impl Future<Output = FixMyAreaResult<u64>> + Send;
    fn increment_attempts(
        &self,
        id: Uuid,
    ) -> impl Future<Output = FixMyAreaResult<OtpRecord>> + Send;
    fn mark_used(&self, id: Uuid) -> impl Future<Output = FixMyAreaResult<OtpRecord>> + Send;
    /// Delete records that expired at or before `now`. Returns how many.
    fn purge_expired(&self, now: DateTime<Utc>)
    -> impl Future<Output = FixMyAreaResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Complaints
// ---------------------------------------------------------------------------

pub trait ComplaintRepository: Send + Sync {
    fn create(
        &self,
        input: CreateComplaint,
    ) -> impl Future<Output = FixMyAreaResult<Complaint>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = FixMyAreaResult<Complaint>> + Send;
    /// Newest first.
    fn list_by_resident(
        &self,
        resident_id: Uuid,
    ) -> impl Future<Output = FixMyAreaResult<Vec<Complaint>>> + Send;
    /// Newest first.
    fn list_by_assignee(
        &self,
        assignee_id: Uuid,
    ) -> impl Future<Output = FixMyAreaResult<Vec<Complaint>>> + Send;
    fn list(
        &self,
        filter: ComplaintFilter,
    ) -> impl Future<Output = FixMyAreaResult<Vec<Complaint>>> + Send;
    /// Writes only the supplied fields.
    fn update(
        &self,
        id: Uuid,
        input: UpdateComplaint,
    ) -> impl Future<Output = FixMyAreaResult<Complaint>> + Send;
    /// No-op when `user_id` already upvoted.
    fn add_upvote(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = FixMyAreaResult<Complaint>> + Send;
    fn add_comment(
        &self,
        id: Uuid,
        comment: Comment,
    ) -> impl Future<Output = FixMyAreaResult<Complaint>> + Send;
}

// ---------------------------------------------------------------------------
// Dog records
// ---------------------------------------------------------------------------

pub trait DogRecordRepository: Send + Sync {
    /// Atomically advance and return the dog tag sequence (starts at 1).
    fn next_sequence(&self) -> impl Future<Output = FixMyAreaResult<u64>> + Send;
    /// Fails with `AlreadyExists` when the tag is taken.
    fn create(
        &self,
        input: CreateDogRecord,
    ) -> impl Future<Output = FixMyAreaResult<DogRecord>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = FixMyAreaResult<DogRecord>> + Send;
    /// Newest first.
    fn list(
        &self,
        filter: DogFilter,
    ) -> impl Future<Output = FixMyAreaResult<Vec<DogRecord>>> + Send;
    fn apply_vaccination(
        &self,
        id: Uuid,
        change: VaccinationChange,
    ) -> impl Future<Output = FixMyAreaResult<DogRecord>> + Send;
    /// `date` is written only when supplied.
    fn apply_sterilization(
        &self,
        id: Uuid,
        status: SterilizationStatus,
        date: Option<DateTime<Utc>>,
    ) -> impl Future<Output = FixMyAreaResult<DogRecord>> + Send;
    /// Status and shelter block in one conditional write. `Conflict`
    /// when the record is no longer `Active`.
    fn transfer_to_shelter(
        &self,
        id: Uuid,
        shelter: ShelterInfo,
    ) -> impl Future<Output = FixMyAreaResult<DogRecord>> + Send;
    /// `Conflict` when the record is no longer `Active`.
    fn close(
        &self,
        id: Uuid,
        outcome: DogOutcome,
    ) -> impl Future<Output = FixMyAreaResult<DogRecord>> + Send;
    fn add_note(
        &self,
        id: Uuid,
        note: DogNote,
    ) -> impl Future<Output = FixMyAreaResult<DogRecord>> + Send;
    /// Descriptive fields only. `seen_at` refreshes `last_seen_date`
    /// when the patch moves the dog.
    fn update_details(
        &self,
        id: Uuid,
        input: UpdateDogDetails,
        seen_at: DateTime<Utc>,
    ) -> impl Future<Output = FixMyAreaResult<DogRecord>> + Send;
    fn add_photos(
        &self,
        id: Uuid,
        photos: Vec<DogPhoto>,
    ) -> impl Future<Output = FixMyAreaResult<DogRecord>> + Send;
    /// No-op when the complaint is already linked.
    fn link_complaint(
        &self,
        id: Uuid,
        complaint_id: Uuid,
    ) -> impl Future<Output = FixMyAreaResult<DogRecord>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = FixMyAreaResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Location catalog
// ---------------------------------------------------------------------------

pub trait LocationRepository: Send + Sync {
    /// Insert a triple; inserting an existing triple is a no-op.
    fn add(&self, entry: LocationEntry) -> impl Future<Output = FixMyAreaResult<()>> + Send;
    fn list(&self) -> impl Future<Output = FixMyAreaResult<Vec<LocationEntry>>> + Send;
}
