//! Stray-dog record model.
//!
//! A record carries one main lifecycle (`DogStatus`) plus two health
//! sub-states that evolve on their own: vaccination and sterilization.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::FixMyAreaError;

/// Render a sequence number as the public dog identifier, e.g. `DOG000042`.
pub fn dog_tag(sequence: u64) -> String {
    format!("DOG{sequence:06}")
}

/// Vaccination is good for twelve months.
pub fn next_vaccination_due(date: DateTime<Utc>) -> DateTime<Utc> {
    date.checked_add_months(Months::new(12)).unwrap_or(date)
}

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = FixMyAreaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(FixMyAreaError::validation(format!(
                        concat!("Invalid ", $label, ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

wire_enum!(DogSize, "size" {
    Small => "Small",
    Medium => "Medium",
    Large => "Large",
});

wire_enum!(DogGender, "gender" {
    Male => "Male",
    Female => "Female",
});

wire_enum!(VaccinationStatus, "vaccination status" {
    NotVaccinated => "Not Vaccinated",
    PartiallyVaccinated => "Partially Vaccinated",
    FullyVaccinated => "Fully Vaccinated",
});

wire_enum!(SterilizationStatus, "sterilization status" {
    NotSterilized => "Not Sterilized",
    Sterilized => "Sterilized",
});

wire_enum!(
    /// Main lifecycle. Everything except `Active` is terminal.
    DogStatus, "dog status" {
    Active => "Active",
    TransferredToShelter => "Transferred to Shelter",
    Adopted => "Adopted",
    Deceased => "Deceased",
    Lost => "Lost",
});

wire_enum!(
    /// Terminal states reachable through `close`.
    DogOutcome, "outcome" {
    Adopted => "Adopted",
    Deceased => "Deceased",
    Lost => "Lost",
});

impl From<DogOutcome> for DogStatus {
    fn from(outcome: DogOutcome) -> Self {
        match outcome {
            DogOutcome::Adopted => DogStatus::Adopted,
            DogOutcome::Deceased => DogStatus::Deceased,
            DogOutcome::Lost => DogStatus::Lost,
        }
    }
}

impl Default for VaccinationStatus {
    fn default() -> Self {
        VaccinationStatus::NotVaccinated
    }
}

impl Default for SterilizationStatus {
    fn default() -> Self {
        SterilizationStatus::NotSterilized
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Validate)]
pub struct Coordinates {
    #[validate(range(
        min = -90.0,
        max = 90.0,
        message = "Invalid latitude (must be between -90 and 90)"
    ))]
    pub lat: f64,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Invalid longitude (must be between -180 and 180)"
    ))]
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct DogLocation {
    #[validate(length(min = 2, max = 50, message = "State must be between 2 and 50 characters"))]
    pub state: String,
    #[validate(length(
        min = 2,
        max = 50,
        message = "District must be between 2 and 50 characters"
    ))]
    pub district: String,
    #[validate(length(
        min = 2,
        max = 50,
        message = "Village must be between 2 and 50 characters"
    ))]
    pub village: String,
    #[validate(length(max = 200, message = "Address must be less than 200 characters"))]
    pub address: Option<String>,
    #[validate(nested)]
    pub coordinates: Option<Coordinates>,
}

/// Set as one block together with the `Transferred to Shelter` status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShelterInfo {
    pub shelter_name: String,
    pub shelter_address: String,
    pub transfer_date: DateTime<Utc>,
    pub transfer_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DogPhoto {
    pub url: String,
    pub caption: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DogNote {
    pub content: String,
    pub author: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DogRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Human-readable `DOG######` tag.
    pub dog_id: String,
    pub breed: String,
    pub color: String,
    pub size: DogSize,
    pub age: u8,
    pub gender: DogGender,
    pub vaccination_status: VaccinationStatus,
    pub last_vaccination_date: Option<DateTime<Utc>>,
    pub next_vaccination_due: Option<DateTime<Utc>>,
    pub sterilization_status: SterilizationStatus,
    pub sterilization_date: Option<DateTime<Utc>>,
    pub is_aggressive: bool,
    pub is_rabid: bool,
    pub health_notes: Option<String>,
    pub location: DogLocation,
    pub status: DogStatus,
    pub shelter_info: Option<ShelterInfo>,
    pub photos: Vec<DogPhoto>,
    pub first_seen_date: DateTime<Utc>,
    pub last_seen_date: DateTime<Utc>,
    pub assigned_to: Uuid,
    pub related_complaints: Vec<Uuid>,
    pub notes: Vec<DogNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DogRecord {
    pub fn is_active(&self) -> bool {
        self.status == DogStatus::Active
    }
}

#[derive(Debug, Clone)]
pub struct CreateDogRecord {
    pub dog_id: String,
    pub breed: String,
    pub color: String,
    pub size: DogSize,
    pub age: u8,
    pub gender: DogGender,
    pub vaccination_status: VaccinationStatus,
    pub sterilization_status: SterilizationStatus,
    pub is_aggressive: bool,
    pub is_rabid: bool,
    pub health_notes: Option<String>,
    pub location: DogLocation,
    pub assigned_to: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Descriptive fields only. Status, health sub-states and shelter
/// data have dedicated transitions.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDogDetails {
    #[validate(length(min = 2, max = 50, message = "Breed must be between 2 and 50 characters"))]
    pub breed: Option<String>,
    #[validate(length(min = 2, max = 30, message = "Color must be between 2 and 30 characters"))]
    pub color: Option<String>,
    pub size: Option<DogSize>,
    #[validate(range(max = 25, message = "Age must be between 0 and 25 years"))]
    pub age: Option<u8>,
    pub gender: Option<DogGender>,
    #[validate(length(max = 500, message = "Health notes must be less than 500 characters"))]
    pub health_notes: Option<String>,
    pub is_aggressive: Option<bool>,
    pub is_rabid: Option<bool>,
    #[validate(nested)]
    pub location: Option<DogLocation>,
}

impl UpdateDogDetails {
    pub fn is_empty(&self) -> bool {
        self.breed.is_none()
            && self.color.is_none()
            && self.size.is_none()
            && self.age.is_none()
            && self.gender.is_none()
            && self.health_notes.is_none()
            && self.is_aggressive.is_none()
            && self.is_rabid.is_none()
            && self.location.is_none()
    }
}

/// The complete vaccination block written by one update.
#[derive(Debug, Clone, PartialEq)]
pub struct VaccinationChange {
    pub status: VaccinationStatus,
    pub last_vaccination_date: Option<DateTime<Utc>>,
    /// `None` leaves the stored due date untouched.
    pub next_vaccination_due: Option<DateTime<Utc>>,
}

impl VaccinationChange {
    pub fn new(status: VaccinationStatus, date: Option<DateTime<Utc>>) -> Self {
        let next_vaccination_due = match (status, date) {
            (VaccinationStatus::FullyVaccinated, Some(date)) => Some(next_vaccination_due(date)),
            _ => None,
        };
        Self {
            status,
            last_vaccination_date: date,
            next_vaccination_due,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DogFilter {
    pub status: Option<DogStatus>,
    pub vaccination_status: Option<VaccinationStatus>,
    pub sterilization_status: Option<SterilizationStatus>,
    pub is_aggressive: Option<bool>,
    pub is_rabid: Option<bool>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub village: Option<String>,
    /// Only records whose next vaccination falls in `[from, to]`.
    #[serde(skip)]
    pub vaccination_due_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl DogFilter {
    pub fn active() -> Self {
        Self {
            status: Some(DogStatus::Active),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tag_is_zero_padded() {
        assert_eq!(dog_tag(1), "DOG000001");
        assert_eq!(dog_tag(123456), "DOG123456");
    }

    #[test]
    fn vaccination_due_is_one_year_later() {
        let date = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let due = next_vaccination_due(date);
        assert_eq!(due, Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn leap_day_vaccination_clamps_to_month_end() {
        let date = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
        let due = next_vaccination_due(date);
        assert_eq!(due, Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn only_full_vaccination_with_date_sets_due() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let full = VaccinationChange::new(VaccinationStatus::FullyVaccinated, Some(date));
        assert!(full.next_vaccination_due.is_some());

        let partial = VaccinationChange::new(VaccinationStatus::PartiallyVaccinated, Some(date));
        assert!(partial.next_vaccination_due.is_none());
        assert_eq!(partial.last_vaccination_date, Some(date));

        let undated = VaccinationChange::new(VaccinationStatus::FullyVaccinated, None);
        assert!(undated.next_vaccination_due.is_none());
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_value(DogStatus::TransferredToShelter).unwrap(),
            "Transferred to Shelter"
        );
        assert_eq!(
            "Not Sterilized".parse::<SterilizationStatus>().unwrap(),
            SterilizationStatus::NotSterilized
        );
        assert!("Rehomed".parse::<DogOutcome>().is_err());
    }

    #[test]
    fn outcome_maps_to_terminal_status() {
        assert_eq!(DogStatus::from(DogOutcome::Lost), DogStatus::Lost);
        assert_ne!(DogStatus::from(DogOutcome::Adopted), DogStatus::Active);
    }
}
