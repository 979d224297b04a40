//! Stray-dog record lifecycle.
//!
//! `Active` leads to one of the terminal states through
//! `transfer_to_shelter` or `close`. Vaccination and sterilization are
//! tracked separately and may change in any status.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use fixmyarea_core::clock::Clock;
use fixmyarea_core::error::{FixMyAreaError, FixMyAreaResult};
use fixmyarea_core::models::dog::{
    CreateDogRecord, DogFilter, DogGender, DogLocation, DogNote, DogOutcome, DogPhoto, DogRecord,
    DogSize, ShelterInfo, SterilizationStatus, UpdateDogDetails, VaccinationChange,
    VaccinationStatus, dog_tag,
};
use fixmyarea_core::models::user::Identity;
use fixmyarea_core::repository::{ComplaintRepository, DogRecordRepository};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Window used by [`DogService::vaccination_due`].
const VACCINATION_DUE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDogInput {
    #[validate(length(min = 2, max = 50, message = "Breed must be between 2 and 50 characters"))]
    pub breed: String,
    #[validate(length(min = 2, max = 30, message = "Color must be between 2 and 30 characters"))]
    pub color: String,
    pub size: DogSize,
    #[validate(range(max = 25, message = "Age must be between 0 and 25 years"))]
    pub age: u8,
    pub gender: DogGender,
    #[validate(nested)]
    pub location: DogLocation,
    #[serde(default)]
    pub is_aggressive: bool,
    #[serde(default)]
    pub is_rabid: bool,
    #[validate(length(max = 500, message = "Health notes must be less than 500 characters"))]
    pub health_notes: Option<String>,
    pub vaccination_status: Option<VaccinationStatus>,
    pub sterilization_status: Option<SterilizationStatus>,
    /// URLs of already-uploaded photos.
    #[serde(default)]
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VaccinationInput {
    pub status: VaccinationStatus,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SterilizationInput {
    pub status: SterilizationStatus,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInput {
    #[serde(default)]
    pub shelter_name: String,
    #[serde(default)]
    pub shelter_address: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseInput {
    pub outcome: DogOutcome,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NoteInput {
    #[validate(length(min = 1, max = 1000, message = "Note content is required"))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PhotoInput {
    #[validate(length(min = 1, message = "Photo URL is required"))]
    pub url: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddPhotosInput {
    #[validate(length(min = 1, message = "At least one photo is required"), nested)]
    pub photos: Vec<PhotoInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkComplaintInput {
    pub complaint_id: Uuid,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub struct DogService<D: DogRecordRepository, C: ComplaintRepository> {
    dogs: D,
    complaints: C,
    clock: Arc<dyn Clock>,
}

impl<D: DogRecordRepository, C: ComplaintRepository> DogService<D, C> {
    pub fn new(dogs: D, complaints: C, clock: Arc<dyn Clock>) -> Self {
        Self {
            dogs,
            complaints,
            clock,
        }
    }

    /// Register a sighting. The record is assigned to its creator and
    /// tagged from the store's counter.
    pub async fn create(
        &self,
        creator: &Identity,
        input: CreateDogInput,
    ) -> FixMyAreaResult<DogRecord> {
        // 1. Normalize and validate.
        let input = CreateDogInput {
            breed: input.breed.trim().to_string(),
            color: input.color.trim().to_string(),
            health_notes: trimmed(input.health_notes),
            ..input
        };
        input.validate()?;

        // 2. Allocate the tag.
        let sequence = self.dogs.next_sequence().await?;
        let now = self.clock.now();

        // 3. Persist.
        let mut dog = self
            .dogs
            .create(CreateDogRecord {
                dog_id: dog_tag(sequence),
                breed: input.breed,
                color: input.color,
                size: input.size,
                age: input.age,
                gender: input.gender,
                vaccination_status: input.vaccination_status.unwrap_or_default(),
                sterilization_status: input.sterilization_status.unwrap_or_default(),
                is_aggressive: input.is_aggressive,
                is_rabid: input.is_rabid,
                health_notes: input.health_notes,
                location: input.location,
                assigned_to: creator.id,
                created_at: now,
            })
            .await?;

        // 4. Attach photos uploaded with the sighting.
        if !input.photos.is_empty() {
            let photos = input
                .photos
                .into_iter()
                .map(|url| DogPhoto {
                    url,
                    caption: None,
                    uploaded_at: now,
                })
                .collect();
            dog = self.dogs.add_photos(dog.id, photos).await?;
        }

        info!(dog_id = %dog.dog_id, id = %dog.id, user_id = %creator.id, "Dog record created");
        Ok(dog)
    }

    pub async fn get(&self, id: Uuid) -> FixMyAreaResult<DogRecord> {
        self.dogs.get_by_id(id).await
    }

    /// Newest first.
    pub async fn list(&self, filter: DogFilter) -> FixMyAreaResult<Vec<DogRecord>> {
        self.dogs.list(filter).await
    }

    /// Status, last vaccination date and (when fully vaccinated on a
    /// known date) the next due date, written together.
    pub async fn update_vaccination(
        &self,
        id: Uuid,
        input: VaccinationInput,
    ) -> FixMyAreaResult<DogRecord> {
        let change = VaccinationChange::new(input.status, input.date);
        let dog = self.dogs.apply_vaccination(id, change).await?;
        info!(
            dog_id = %dog.dog_id,
            status = %dog.vaccination_status,
            next_due = ?dog.next_vaccination_due,
            "Vaccination updated"
        );
        Ok(dog)
    }

    pub async fn update_sterilization(
        &self,
        id: Uuid,
        input: SterilizationInput,
    ) -> FixMyAreaResult<DogRecord> {
        let dog = self
            .dogs
            .apply_sterilization(id, input.status, input.date)
            .await?;
        info!(dog_id = %dog.dog_id, status = %dog.sterilization_status, "Sterilization updated");
        Ok(dog)
    }

    /// Sets the status and the whole shelter block in one write. Only an
    /// `Active` record can be transferred.
    pub async fn transfer_to_shelter(
        &self,
        id: Uuid,
        input: TransferInput,
    ) -> FixMyAreaResult<DogRecord> {
        let shelter_name = input.shelter_name.trim();
        let shelter_address = input.shelter_address.trim();
        let reason = input.reason.trim();
        if shelter_name.is_empty() || shelter_address.is_empty() || reason.is_empty() {
            return Err(FixMyAreaError::validation(
                "Shelter name, address, and reason are required",
            ));
        }

        let dog = self
            .dogs
            .transfer_to_shelter(
                id,
                ShelterInfo {
                    shelter_name: shelter_name.to_string(),
                    shelter_address: shelter_address.to_string(),
                    transfer_date: self.clock.now(),
                    transfer_reason: reason.to_string(),
                },
            )
            .await?;

        info!(dog_id = %dog.dog_id, shelter = shelter_name, "Dog transferred to shelter");
        Ok(dog)
    }

    /// Move an `Active` record to adopted, deceased or lost.
    pub async fn close(&self, id: Uuid, input: CloseInput) -> FixMyAreaResult<DogRecord> {
        let dog = self.dogs.close(id, input.outcome).await?;
        info!(dog_id = %dog.dog_id, status = %dog.status, "Dog record closed");
        Ok(dog)
    }

    pub async fn add_note(
        &self,
        author: &Identity,
        id: Uuid,
        input: NoteInput,
    ) -> FixMyAreaResult<DogRecord> {
        let input = NoteInput {
            content: input.content.trim().to_string(),
        };
        input.validate()?;

        self.dogs
            .add_note(
                id,
                DogNote {
                    content: input.content,
                    author: author.id,
                    created_at: self.clock.now(),
                },
            )
            .await
    }

    pub async fn update_details(
        &self,
        id: Uuid,
        input: UpdateDogDetails,
    ) -> FixMyAreaResult<DogRecord> {
        let input = UpdateDogDetails {
            breed: input.breed.map(|b| b.trim().to_string()),
            color: input.color.map(|c| c.trim().to_string()),
            health_notes: input.health_notes.map(|n| n.trim().to_string()),
            ..input
        };
        if input.is_empty() {
            return Err(FixMyAreaError::validation("No fields to update"));
        }
        input.validate()?;

        self.dogs
            .update_details(id, input, self.clock.now())
            .await
    }

    pub async fn add_photos(&self, id: Uuid, input: AddPhotosInput) -> FixMyAreaResult<DogRecord> {
        input.validate()?;
        let now = self.clock.now();
        let photos = input
            .photos
            .into_iter()
            .map(|p| DogPhoto {
                url: p.url.trim().to_string(),
                caption: trimmed(p.caption),
                uploaded_at: now,
            })
            .collect();
        self.dogs.add_photos(id, photos).await
    }

    /// Record that a complaint concerns this dog. The complaint must
    /// exist.
    pub async fn link_complaint(
        &self,
        id: Uuid,
        input: LinkComplaintInput,
    ) -> FixMyAreaResult<DogRecord> {
        self.complaints.get_by_id(input.complaint_id).await?;
        self.dogs.link_complaint(id, input.complaint_id).await
    }

    pub async fn delete(&self, actor: &Identity, id: Uuid) -> FixMyAreaResult<()> {
        self.dogs.delete(id).await?;
        info!(id = %id, user_id = %actor.id, "Dog record deleted");
        Ok(())
    }

    // -- Query helpers (Active records only) --------------------------------

    pub async fn by_location(
        &self,
        state: Option<String>,
        district: Option<String>,
        village: Option<String>,
    ) -> FixMyAreaResult<Vec<DogRecord>> {
        self.dogs
            .list(DogFilter {
                state,
                district,
                village,
                ..DogFilter::active()
            })
            .await
    }

    pub async fn by_health_status(
        &self,
        vaccination_status: Option<VaccinationStatus>,
        sterilization_status: Option<SterilizationStatus>,
    ) -> FixMyAreaResult<Vec<DogRecord>> {
        self.dogs
            .list(DogFilter {
                vaccination_status,
                sterilization_status,
                ..DogFilter::active()
            })
            .await
    }

    pub async fn aggressive(&self) -> FixMyAreaResult<Vec<DogRecord>> {
        self.dogs
            .list(DogFilter {
                is_aggressive: Some(true),
                ..DogFilter::active()
            })
            .await
    }

    /// Next vaccination due within the coming week.
    pub async fn vaccination_due(&self) -> FixMyAreaResult<Vec<DogRecord>> {
        let now = self.clock.now();
        self.dogs
            .list(DogFilter {
                vaccination_due_between: Some((
                    now,
                    now + Duration::days(VACCINATION_DUE_WINDOW_DAYS),
                )),
                ..DogFilter::active()
            })
            .await
    }
}
