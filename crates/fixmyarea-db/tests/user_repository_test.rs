//! Integration tests for the User repository using in-memory SurrealDB.

use chrono::Utc;
use fixmyarea_core::error::FixMyAreaError;
use fixmyarea_core::models::user::{
    CreateUser, Role, UpdateUser, UserFilter, UserLocation, UserStatus,
};
use fixmyarea_core::repository::UserRepository;
use fixmyarea_db::repository::SurrealUserRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    fixmyarea_db::run_migrations(&db).await.unwrap();
    db
}

fn location(village: &str) -> UserLocation {
    UserLocation {
        state: "Karnataka".into(),
        district: "Mysuru".into(),
        village: village.into(),
    }
}

fn new_user(phone: &str, role: Role, village: &str) -> CreateUser {
    CreateUser {
        role,
        name: "Ravi Kumar".into(),
        phone: phone.into(),
        email: None,
        gender: None,
        dob: None,
        location: location(village),
        password_hash: "$argon2id$placeholder".into(),
        areas_assigned: vec![],
    }
}

#[tokio::test]
async fn create_and_get_user() {
    let repo = SurrealUserRepository::new(setup().await);

    let user = repo
        .create(new_user("9876543210", Role::Resident, "Hunsur"))
        .await
        .unwrap();

    assert_eq!(user.role, Role::Resident);
    assert_eq!(user.status, UserStatus::Active);
    assert_eq!(user.login_count, 0);
    assert!(user.last_login.is_none());
    assert_eq!(user.location.village, "Hunsur");

    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(fetched.id, user.id);
    assert_eq!(fetched.password_hash, "$argon2id$placeholder");
}

#[tokio::test]
async fn duplicate_phone_is_rejected() {
    let repo = SurrealUserRepository::new(setup().await);

    repo.create(new_user("9876543210", Role::Resident, "Hunsur"))
        .await
        .unwrap();
    let err = repo
        .create(new_user("9876543210", Role::Staff, "Nanjangud"))
        .await
        .unwrap_err();

    assert!(matches!(err, FixMyAreaError::AlreadyExists { .. }));
    assert_eq!(repo.list(UserFilter::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn find_by_phone_returns_none_for_unknown() {
    let repo = SurrealUserRepository::new(setup().await);
    assert!(repo.find_by_phone("1111111111").await.unwrap().is_none());

    repo.create(new_user("9876543210", Role::Resident, "Hunsur"))
        .await
        .unwrap();
    let found = repo.find_by_phone("9876543210").await.unwrap().unwrap();
    assert_eq!(found.phone, "9876543210");
}

#[tokio::test]
async fn get_missing_user_is_not_found() {
    let repo = SurrealUserRepository::new(setup().await);
    let err = repo.get_by_id(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, FixMyAreaError::NotFound { .. }));
}

#[tokio::test]
async fn partial_update_leaves_other_fields() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo
        .create(new_user("9876543210", Role::Resident, "Hunsur"))
        .await
        .unwrap();

    let updated = repo
        .update(
            user.id,
            UpdateUser {
                status: Some(UserStatus::Disabled),
                areas_assigned: Some(vec![location("Hunsur"), location("Saligrama")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, UserStatus::Disabled);
    assert_eq!(updated.areas_assigned.len(), 2);
    assert_eq!(updated.name, "Ravi Kumar");
    assert_eq!(updated.role, Role::Resident);
}

#[tokio::test]
async fn list_filters_by_role_and_village() {
    let repo = SurrealUserRepository::new(setup().await);
    repo.create(new_user("9000000001", Role::Resident, "Hunsur"))
        .await
        .unwrap();
    repo.create(new_user("9000000002", Role::Staff, "Hunsur"))
        .await
        .unwrap();
    repo.create(new_user("9000000003", Role::Staff, "Saligrama"))
        .await
        .unwrap();

    let staff = repo
        .list(UserFilter {
            role: Some(Role::Staff),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(staff.len(), 2);

    let hunsur_staff = repo
        .list(UserFilter {
            role: Some(Role::Staff),
            village: Some("Hunsur".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hunsur_staff.len(), 1);
    assert_eq!(hunsur_staff[0].phone, "9000000002");
}

#[tokio::test]
async fn record_login_bumps_count() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo
        .create(new_user("9876543210", Role::Resident, "Hunsur"))
        .await
        .unwrap();

    let at = Utc::now();
    repo.record_login(user.id, at).await.unwrap();
    let after = repo.record_login(user.id, at).await.unwrap();

    assert_eq!(after.login_count, 2);
    assert_eq!(
        after.last_login.map(|t| t.timestamp_millis()),
        Some(at.timestamp_millis())
    );
}
