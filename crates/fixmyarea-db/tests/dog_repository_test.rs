//! Integration tests for the DogRecord repository using in-memory SurrealDB.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use fixmyarea_core::clock::{Clock, ManualClock};
use fixmyarea_core::error::FixMyAreaError;
use fixmyarea_core::models::dog::{
    CreateDogRecord, DogFilter, DogGender, DogLocation, DogNote, DogOutcome, DogPhoto, DogSize,
    DogStatus, ShelterInfo, SterilizationStatus, UpdateDogDetails, VaccinationChange,
    VaccinationStatus, dog_tag,
};
use fixmyarea_core::repository::DogRecordRepository;
use fixmyarea_db::repository::SurrealDogRecordRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealDogRecordRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    fixmyarea_db::run_migrations(&db).await.unwrap();
    SurrealDogRecordRepository::new(db)
}

fn location(village: &str) -> DogLocation {
    DogLocation {
        state: "Kerala".into(),
        district: "Thrissur".into(),
        village: village.into(),
        address: None,
        coordinates: None,
    }
}

async fn create(repo: &SurrealDogRecordRepository<Db>, aggressive: bool) -> (u64, Uuid) {
    let seq = repo.next_sequence().await.unwrap();
    let dog = repo
        .create(CreateDogRecord {
            dog_id: dog_tag(seq),
            breed: "Indie".into(),
            color: "Brown".into(),
            size: DogSize::Medium,
            age: 3,
            gender: DogGender::Female,
            vaccination_status: VaccinationStatus::NotVaccinated,
            sterilization_status: SterilizationStatus::NotSterilized,
            is_aggressive: aggressive,
            is_rabid: false,
            health_notes: None,
            location: location("Ollur"),
            assigned_to: Uuid::new_v4(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    (seq, dog.id)
}

#[tokio::test]
async fn sequence_is_monotonic() {
    let repo = setup().await;
    assert_eq!(repo.next_sequence().await.unwrap(), 1);
    assert_eq!(repo.next_sequence().await.unwrap(), 2);
    assert_eq!(repo.next_sequence().await.unwrap(), 3);
}

#[tokio::test]
async fn create_sets_defaults() {
    let repo = setup().await;
    let (seq, id) = create(&repo, false).await;
    let dog = repo.get_by_id(id).await.unwrap();

    assert_eq!(dog.dog_id, dog_tag(seq));
    assert_eq!(dog.status, DogStatus::Active);
    assert!(dog.shelter_info.is_none());
    assert!(dog.notes.is_empty());
    assert_eq!(dog.first_seen_date, dog.last_seen_date);
}

#[tokio::test]
async fn duplicate_tag_is_rejected() {
    let repo = setup().await;
    let (seq, _) = create(&repo, false).await;
    let err = repo
        .create(CreateDogRecord {
            dog_id: dog_tag(seq),
            breed: "Indie".into(),
            color: "Black".into(),
            size: DogSize::Small,
            age: 1,
            gender: DogGender::Male,
            vaccination_status: VaccinationStatus::NotVaccinated,
            sterilization_status: SterilizationStatus::NotSterilized,
            is_aggressive: false,
            is_rabid: false,
            health_notes: None,
            location: location("Ollur"),
            assigned_to: Uuid::new_v4(),
            created_at: Utc::now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, FixMyAreaError::AlreadyExists { .. }));
}

#[tokio::test]
async fn vaccination_only_touches_due_when_given() {
    let repo = setup().await;
    let (_, id) = create(&repo, false).await;
    let date = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

    let full = repo
        .apply_vaccination(
            id,
            VaccinationChange::new(VaccinationStatus::FullyVaccinated, Some(date)),
        )
        .await
        .unwrap();
    let due = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
    assert_eq!(full.next_vaccination_due, Some(due));

    let partial = repo
        .apply_vaccination(
            id,
            VaccinationChange::new(VaccinationStatus::PartiallyVaccinated, Some(date)),
        )
        .await
        .unwrap();
    assert_eq!(partial.vaccination_status, VaccinationStatus::PartiallyVaccinated);
    assert_eq!(partial.next_vaccination_due, Some(due));
}

#[tokio::test]
async fn sterilization_leaves_vaccination_alone() {
    let repo = setup().await;
    let (_, id) = create(&repo, false).await;
    let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let dog = repo
        .apply_sterilization(id, SterilizationStatus::Sterilized, Some(date))
        .await
        .unwrap();
    assert_eq!(dog.sterilization_status, SterilizationStatus::Sterilized);
    assert_eq!(dog.sterilization_date, Some(date));
    assert_eq!(dog.vaccination_status, VaccinationStatus::NotVaccinated);
}

#[tokio::test]
async fn transfer_sets_status_and_shelter_together() {
    let repo = setup().await;
    let (_, id) = create(&repo, false).await;
    let shelter = ShelterInfo {
        shelter_name: "Paws Haven".into(),
        shelter_address: "12 Canal Road".into(),
        transfer_date: Utc::now(),
        transfer_reason: "Injured leg".into(),
    };

    let dog = repo.transfer_to_shelter(id, shelter.clone()).await.unwrap();
    assert_eq!(dog.status, DogStatus::TransferredToShelter);
    let stored = dog.shelter_info.unwrap();
    assert_eq!(stored.shelter_name, shelter.shelter_name);
    assert_eq!(stored.transfer_reason, shelter.transfer_reason);
}

#[tokio::test]
async fn transitions_out_of_terminal_state_conflict() {
    let repo = setup().await;
    let (_, id) = create(&repo, false).await;

    repo.close(id, DogOutcome::Adopted).await.unwrap();
    let err = repo
        .transfer_to_shelter(
            id,
            ShelterInfo {
                shelter_name: "Paws Haven".into(),
                shelter_address: "12 Canal Road".into(),
                transfer_date: Utc::now(),
                transfer_reason: "Late".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FixMyAreaError::Conflict { .. }));

    let dog = repo.get_by_id(id).await.unwrap();
    assert_eq!(dog.status, DogStatus::Adopted);
    assert!(dog.shelter_info.is_none());
}

#[tokio::test]
async fn transition_on_missing_record_is_not_found() {
    let repo = setup().await;
    let err = repo
        .close(Uuid::new_v4(), DogOutcome::Lost)
        .await
        .unwrap_err();
    assert!(matches!(err, FixMyAreaError::NotFound { .. }));
}

#[tokio::test]
async fn notes_photos_and_links_append() {
    let repo = setup().await;
    let (_, id) = create(&repo, false).await;
    let author = Uuid::new_v4();
    let complaint = Uuid::new_v4();

    repo.add_note(
        id,
        DogNote {
            content: "Fed near the bus stop".into(),
            author,
            created_at: Utc::now(),
        },
    )
    .await
    .unwrap();
    repo.add_photos(
        id,
        vec![DogPhoto {
            url: "https://img.example/dog.jpg".into(),
            caption: Some("Left profile".into()),
            uploaded_at: Utc::now(),
        }],
    )
    .await
    .unwrap();
    repo.link_complaint(id, complaint).await.unwrap();
    let dog = repo.link_complaint(id, complaint).await.unwrap();

    assert_eq!(dog.notes.len(), 1);
    assert_eq!(dog.notes[0].author, author);
    assert_eq!(dog.photos.len(), 1);
    assert_eq!(dog.related_complaints, vec![complaint]);
    assert_eq!(dog.status, DogStatus::Active);
}

#[tokio::test]
async fn moving_a_dog_refreshes_last_seen() {
    let repo = setup().await;
    let (_, id) = create(&repo, false).await;
    let later = Utc::now() + Duration::days(2);

    let dog = repo
        .update_details(
            id,
            UpdateDogDetails {
                color: Some("Black".into()),
                location: Some(location("Kodakara")),
                ..Default::default()
            },
            later,
        )
        .await
        .unwrap();

    assert_eq!(dog.color, "Black");
    assert_eq!(dog.location.village, "Kodakara");
    assert_eq!(dog.last_seen_date.timestamp_millis(), later.timestamp_millis());
    assert_eq!(dog.breed, "Indie");
}

#[tokio::test]
async fn list_filters_active_aggressive() {
    let repo = setup().await;
    let (_, calm) = create(&repo, false).await;
    let (_, fierce) = create(&repo, true).await;
    let (_, gone) = create(&repo, true).await;
    repo.close(gone, DogOutcome::Deceased).await.unwrap();

    let aggressive = repo
        .list(DogFilter {
            is_aggressive: Some(true),
            ..DogFilter::active()
        })
        .await
        .unwrap();
    let ids: Vec<_> = aggressive.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![fierce]);

    let all = repo.list(DogFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().any(|d| d.id == calm));
}

#[tokio::test]
async fn delete_removes_record() {
    let repo = setup().await;
    let (_, id) = create(&repo, false).await;

    repo.delete(id).await.unwrap();
    assert!(matches!(
        repo.get_by_id(id).await.unwrap_err(),
        FixMyAreaError::NotFound { .. }
    ));
    assert!(matches!(
        repo.delete(id).await.unwrap_err(),
        FixMyAreaError::NotFound { .. }
    ));
}

#[tokio::test]
async fn writes_are_stamped_from_the_injected_clock() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
    ));
    let repo = setup().await.with_clock(clock.clone());
    let (_, id) = create(&repo, false).await;

    clock.advance(Duration::days(2));
    let dog = repo
        .apply_sterilization(id, SterilizationStatus::Sterilized, None)
        .await
        .unwrap();
    assert_eq!(dog.updated_at, clock.now());

    clock.advance(Duration::days(2));
    let dog = repo.close(id, DogOutcome::Adopted).await.unwrap();
    assert_eq!(dog.updated_at, clock.now());
}
