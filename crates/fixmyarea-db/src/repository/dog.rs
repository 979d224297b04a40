//! SurrealDB implementation of [`DogRecordRepository`].
//!
//! Lifecycle transitions out of `Active` are single conditional
//! `UPDATE ... WHERE status = 'Active'` statements, so the status and
//! the shelter block are written together or not at all.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fixmyarea_core::clock::{Clock, SystemClock};
use fixmyarea_core::error::FixMyAreaResult;
use fixmyarea_core::models::dog::{
    CreateDogRecord, DogFilter, DogNote, DogOutcome, DogPhoto, DogRecord, DogStatus,
    ShelterInfo, SterilizationStatus, UpdateDogDetails, VaccinationChange,
};
use fixmyarea_core::repository::DogRecordRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_enum, parse_json, parse_uuid, to_json};

const SELECT_ONE: &str =
    "SELECT meta::id(id) AS record_id, * FROM type::record('dog_record', $id)";

const DOG_SEQUENCE: &str = "dog_record";

#[derive(Debug, SurrealValue)]
struct DogRow {
    record_id: String,
    dog_id: String,
    breed: String,
    color: String,
    size: String,
    age: i64,
    gender: String,
    vaccination_status: String,
    last_vaccination_date: Option<DateTime<Utc>>,
    next_vaccination_due: Option<DateTime<Utc>>,
    sterilization_status: String,
    sterilization_date: Option<DateTime<Utc>>,
    is_aggressive: bool,
    is_rabid: bool,
    health_notes: Option<String>,
    location: serde_json::Value,
    status: String,
    shelter_info: Option<serde_json::Value>,
    photos: serde_json::Value,
    first_seen_date: DateTime<Utc>,
    last_seen_date: DateTime<Utc>,
    assigned_to: String,
    related_complaints: Vec<String>,
    notes: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DogRow {
    fn try_into_dog(self) -> Result<DogRecord, DbError> {
        Ok(DogRecord {
            id: parse_uuid(&self.record_id, "dog record")?,
            dog_id: self.dog_id,
            breed: self.breed,
            color: self.color,
            size: parse_enum(&self.size)?,
            age: u8::try_from(self.age)
                .map_err(|_| DbError::InvalidData(format!("invalid dog age: {}", self.age)))?,
            gender: parse_enum(&self.gender)?,
            vaccination_status: parse_enum(&self.vaccination_status)?,
            last_vaccination_date: self.last_vaccination_date,
            next_vaccination_due: self.next_vaccination_due,
            sterilization_status: parse_enum(&self.sterilization_status)?,
            sterilization_date: self.sterilization_date,
            is_aggressive: self.is_aggressive,
            is_rabid: self.is_rabid,
            health_notes: self.health_notes,
            location: parse_json(self.location, "dog location")?,
            status: parse_enum(&self.status)?,
            shelter_info: self
                .shelter_info
                .map(|v| parse_json(v, "shelter info"))
                .transpose()?,
            photos: parse_json(self.photos, "photos")?,
            first_seen_date: self.first_seen_date,
            last_seen_date: self.last_seen_date,
            assigned_to: parse_uuid(&self.assigned_to, "assignee")?,
            related_complaints: self
                .related_complaints
                .iter()
                .map(|s| parse_uuid(s, "complaint"))
                .collect::<Result<_, _>>()?,
            notes: parse_json(self.notes, "notes")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// What a conditional transition touched.
#[derive(Debug, SurrealValue)]
struct StatusRow {
    status: String,
}

#[derive(Debug, SurrealValue)]
struct SequenceRow {
    value: u64,
}

fn first_dog(rows: Vec<DogRow>, id: &str) -> Result<DogRecord, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| not_found(id))?
        .try_into_dog()
}

fn not_found(id: &str) -> DbError {
    DbError::NotFound {
        entity: "dog record".into(),
        id: id.to_string(),
    }
}

/// SurrealDB implementation of the DogRecord repository.
#[derive(Clone)]
pub struct SurrealDogRecordRepository<C: Connection> {
    db: Surreal<C>,
    clock: Arc<dyn Clock>,
}

impl<C: Connection> SurrealDogRecordRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            clock: Arc::new(SystemClock),
        }
    }

    /// Take write timestamps from `clock` instead of wall-clock time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run `UPDATE ... SET {set} WHERE status = 'Active'` followed by a
    /// read-back. Distinguishes a missing record from one that already
    /// left `Active`.
    async fn transition_from_active(
        &self,
        id: Uuid,
        set: &str,
        bind: (&'static str, serde_json::Value),
    ) -> FixMyAreaResult<DogRecord> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(format!(
                "UPDATE type::record('dog_record', $id) SET {set}, \
                 updated_at = $now WHERE status = 'Active'; \
                 {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("now", self.clock.now()))
            .bind(bind)
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let touched: Vec<StatusRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<DogRow> = result.take(1).map_err(DbError::from)?;
        let dog = first_dog(rows, &id_str)?;

        if touched.is_empty() {
            return Err(DbError::Conflict(format!(
                "Dog {} is {} and can no longer change status",
                dog.dog_id, dog.status
            ))
            .into());
        }
        Ok(dog)
    }
}

impl<C: Connection> DogRecordRepository for SurrealDogRecordRepository<C> {
    async fn next_sequence(&self) -> FixMyAreaResult<u64> {
        let result = self
            .db
            .query("UPSERT type::record('sequence', $name) SET value = (value ?? 0) + 1")
            .bind(("name", DOG_SEQUENCE))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<SequenceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "sequence".into(),
            id: DOG_SEQUENCE.into(),
        })?;
        Ok(row.value)
    }

    async fn create(&self, input: CreateDogRecord) -> FixMyAreaResult<DogRecord> {
        let id_str = Uuid::new_v4().to_string();
        let duplicate = format!("Dog ID {} already exists", input.dog_id);

        let result = self
            .db
            .query(format!(
                "CREATE type::record('dog_record', $id) SET \
                 dog_id = $dog_id, breed = $breed, color = $color, \
                 size = $size, age = $age, gender = $gender, \
                 vaccination_status = $vaccination_status, \
                 last_vaccination_date = NONE, next_vaccination_due = NONE, \
                 sterilization_status = $sterilization_status, \
                 sterilization_date = NONE, \
                 is_aggressive = $is_aggressive, is_rabid = $is_rabid, \
                 health_notes = $health_notes, location = $location, \
                 status = 'Active', shelter_info = NONE, photos = [], \
                 first_seen_date = $created_at, last_seen_date = $created_at, \
                 assigned_to = $assigned_to, related_complaints = [], \
                 notes = [], created_at = $created_at, \
                 updated_at = $created_at; \
                 {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("dog_id", input.dog_id))
            .bind(("breed", input.breed))
            .bind(("color", input.color))
            .bind(("size", input.size.as_str().to_string()))
            .bind(("age", i64::from(input.age)))
            .bind(("gender", input.gender.as_str().to_string()))
            .bind((
                "vaccination_status",
                input.vaccination_status.as_str().to_string(),
            ))
            .bind((
                "sterilization_status",
                input.sterilization_status.as_str().to_string(),
            ))
            .bind(("is_aggressive", input.is_aggressive))
            .bind(("is_rabid", input.is_rabid))
            .bind(("health_notes", input.health_notes))
            .bind(("location", to_json(&input.location)?))
            .bind(("assigned_to", input.assigned_to.to_string()))
            .bind(("created_at", input.created_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check(e, "dog record", &duplicate))?;

        let rows: Vec<DogRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_dog(rows, &id_str)?)
    }

    async fn get_by_id(&self, id: Uuid) -> FixMyAreaResult<DogRecord> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DogRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_dog(rows, &id_str)?)
    }

    async fn list(&self, filter: DogFilter) -> FixMyAreaResult<Vec<DogRecord>> {
        let mut conditions = Vec::new();
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        if filter.vaccination_status.is_some() {
            conditions.push("vaccination_status = $vaccination_status");
        }
        if filter.sterilization_status.is_some() {
            conditions.push("sterilization_status = $sterilization_status");
        }
        if filter.is_aggressive.is_some() {
            conditions.push("is_aggressive = $is_aggressive");
        }
        if filter.is_rabid.is_some() {
            conditions.push("is_rabid = $is_rabid");
        }
        if filter.state.is_some() {
            conditions.push("location.state = $state");
        }
        if filter.district.is_some() {
            conditions.push("location.district = $district");
        }
        if filter.village.is_some() {
            conditions.push("location.village = $village");
        }
        if filter.vaccination_due_between.is_some() {
            conditions.push("next_vaccination_due >= $due_from");
            conditions.push("next_vaccination_due <= $due_to");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let mut q = self.db.query(format!(
            "SELECT meta::id(id) AS record_id, * FROM dog_record{where_clause} \
             ORDER BY created_at DESC"
        ));
        if let Some(status) = filter.status {
            q = q.bind(("status", status.as_str().to_string()));
        }
        if let Some(v) = filter.vaccination_status {
            q = q.bind(("vaccination_status", v.as_str().to_string()));
        }
        if let Some(s) = filter.sterilization_status {
            q = q.bind(("sterilization_status", s.as_str().to_string()));
        }
        if let Some(aggressive) = filter.is_aggressive {
            q = q.bind(("is_aggressive", aggressive));
        }
        if let Some(rabid) = filter.is_rabid {
            q = q.bind(("is_rabid", rabid));
        }
        if let Some(state) = filter.state {
            q = q.bind(("state", state));
        }
        if let Some(district) = filter.district {
            q = q.bind(("district", district));
        }
        if let Some(village) = filter.village {
            q = q.bind(("village", village));
        }
        if let Some((from, to)) = filter.vaccination_due_between {
            q = q.bind(("due_from", from)).bind(("due_to", to));
        }

        let mut result = q.await.map_err(DbError::from)?;
        let rows: Vec<DogRow> = result.take(0).map_err(DbError::from)?;
        let dogs = rows
            .into_iter()
            .map(DogRow::try_into_dog)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dogs)
    }

    async fn apply_vaccination(
        &self,
        id: Uuid,
        change: VaccinationChange,
    ) -> FixMyAreaResult<DogRecord> {
        let id_str = id.to_string();

        let mut sets = vec![
            "vaccination_status = $status",
            "last_vaccination_date = $last",
        ];
        if change.next_vaccination_due.is_some() {
            sets.push("next_vaccination_due = $next");
        }
        sets.push("updated_at = $now");

        let mut q = self
            .db
            .query(format!(
                "UPDATE type::record('dog_record', $id) SET {}; {SELECT_ONE}",
                sets.join(", ")
            ))
            .bind(("id", id_str.clone()))
            .bind(("now", self.clock.now()))
            .bind(("status", change.status.as_str().to_string()))
            .bind(("last", change.last_vaccination_date));
        if let Some(next) = change.next_vaccination_due {
            q = q.bind(("next", next));
        }

        let result = q.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<DogRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_dog(rows, &id_str)?)
    }

    async fn apply_sterilization(
        &self,
        id: Uuid,
        status: SterilizationStatus,
        date: Option<DateTime<Utc>>,
    ) -> FixMyAreaResult<DogRecord> {
        let id_str = id.to_string();

        let set = if date.is_some() {
            "sterilization_status = $status, sterilization_date = $date"
        } else {
            "sterilization_status = $status"
        };

        let mut q = self
            .db
            .query(format!(
                "UPDATE type::record('dog_record', $id) SET {set}, \
                 updated_at = $now; {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("now", self.clock.now()))
            .bind(("status", status.as_str().to_string()));
        if let Some(date) = date {
            q = q.bind(("date", date));
        }

        let result = q.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<DogRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_dog(rows, &id_str)?)
    }

    async fn transfer_to_shelter(
        &self,
        id: Uuid,
        shelter: ShelterInfo,
    ) -> FixMyAreaResult<DogRecord> {
        let status = DogStatus::TransferredToShelter.as_str();
        self.transition_from_active(
            id,
            &format!("status = '{status}', shelter_info = $shelter"),
            ("shelter", to_json(&shelter)?),
        )
        .await
    }

    async fn close(&self, id: Uuid, outcome: DogOutcome) -> FixMyAreaResult<DogRecord> {
        self.transition_from_active(
            id,
            "status = $outcome",
            ("outcome", serde_json::Value::from(outcome.as_str())),
        )
        .await
    }

    async fn add_note(&self, id: Uuid, note: DogNote) -> FixMyAreaResult<DogRecord> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!(
                "UPDATE type::record('dog_record', $id) SET \
                 notes += $note, updated_at = $now; {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("now", self.clock.now()))
            .bind(("note", to_json(&note)?))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DogRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_dog(rows, &id_str)?)
    }

    async fn update_details(
        &self,
        id: Uuid,
        input: UpdateDogDetails,
        seen_at: DateTime<Utc>,
    ) -> FixMyAreaResult<DogRecord> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.breed.is_some() {
            sets.push("breed = $breed");
        }
        if input.color.is_some() {
            sets.push("color = $color");
        }
        if input.size.is_some() {
            sets.push("size = $size");
        }
        if input.age.is_some() {
            sets.push("age = $age");
        }
        if input.gender.is_some() {
            sets.push("gender = $gender");
        }
        if input.health_notes.is_some() {
            sets.push("health_notes = $health_notes");
        }
        if input.is_aggressive.is_some() {
            sets.push("is_aggressive = $is_aggressive");
        }
        if input.is_rabid.is_some() {
            sets.push("is_rabid = $is_rabid");
        }
        if input.location.is_some() {
            sets.push("location = $location");
            sets.push("last_seen_date = $seen_at");
        }

        if sets.is_empty() {
            return self.get_by_id(id).await;
        }
        sets.push("updated_at = $now");

        let mut q = self
            .db
            .query(format!(
                "UPDATE type::record('dog_record', $id) SET {}; {SELECT_ONE}",
                sets.join(", ")
            ))
            .bind(("id", id_str.clone()))
            .bind(("now", self.clock.now()));

        if let Some(breed) = input.breed {
            q = q.bind(("breed", breed));
        }
        if let Some(color) = input.color {
            q = q.bind(("color", color));
        }
        if let Some(size) = input.size {
            q = q.bind(("size", size.as_str().to_string()));
        }
        if let Some(age) = input.age {
            q = q.bind(("age", i64::from(age)));
        }
        if let Some(gender) = input.gender {
            q = q.bind(("gender", gender.as_str().to_string()));
        }
        if let Some(notes) = input.health_notes {
            q = q.bind(("health_notes", notes));
        }
        if let Some(aggressive) = input.is_aggressive {
            q = q.bind(("is_aggressive", aggressive));
        }
        if let Some(rabid) = input.is_rabid {
            q = q.bind(("is_rabid", rabid));
        }
        if let Some(location) = input.location {
            q = q
                .bind(("location", to_json(&location)?))
                .bind(("seen_at", seen_at));
        }

        let result = q.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<DogRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_dog(rows, &id_str)?)
    }

    async fn add_photos(&self, id: Uuid, photos: Vec<DogPhoto>) -> FixMyAreaResult<DogRecord> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!(
                "UPDATE type::record('dog_record', $id) SET \
                 photos = array::concat(photos, $photos), \
                 updated_at = $now; {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("now", self.clock.now()))
            .bind(("photos", to_json(&photos)?))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DogRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_dog(rows, &id_str)?)
    }

    async fn link_complaint(&self, id: Uuid, complaint_id: Uuid) -> FixMyAreaResult<DogRecord> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!(
                "UPDATE type::record('dog_record', $id) SET \
                 related_complaints = array::union(related_complaints, [$complaint]), \
                 updated_at = $now; {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("now", self.clock.now()))
            .bind(("complaint", complaint_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DogRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_dog(rows, &id_str)?)
    }

    async fn delete(&self, id: Uuid) -> FixMyAreaResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("DELETE type::record('dog_record', $id) RETURN BEFORE")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StatusRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(not_found(&id_str).into());
        }
        Ok(())
    }
}
