//! Integration tests for the complaint lifecycle.

use std::sync::Arc;

use fixmyarea_core::clock::ManualClock;
use fixmyarea_core::error::FixMyAreaError;
use fixmyarea_core::models::complaint::{ComplaintStatus, Priority, UpdateComplaint};
use fixmyarea_core::models::user::{CreateUser, Identity, Role, User, UserLocation};
use fixmyarea_core::repository::UserRepository;
use fixmyarea_db::repository::{SurrealComplaintRepository, SurrealUserRepository};
use fixmyarea_records::ComplaintService;
use fixmyarea_records::complaint::{CommentInput, CreateComplaintInput};
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

type Service = ComplaintService<SurrealComplaintRepository<Db>, SurrealUserRepository<Db>>;

struct Harness {
    service: Service,
    users: SurrealUserRepository<Db>,
}

async fn setup() -> Harness {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    fixmyarea_db::run_migrations(&db).await.unwrap();

    let clock = Arc::new(ManualClock::starting_now());
    Harness {
        service: ComplaintService::new(
            SurrealComplaintRepository::new(db.clone()),
            SurrealUserRepository::new(db.clone()),
            clock,
        ),
        users: SurrealUserRepository::new(db),
    }
}

async fn user(h: &Harness, name: &str, phone: &str, role: Role) -> (User, Identity) {
    let user = h
        .users
        .create(CreateUser {
            role,
            name: name.into(),
            phone: phone.into(),
            email: None,
            gender: None,
            dob: None,
            location: UserLocation {
                state: "Kerala".into(),
                district: "Ernakulam".into(),
                village: "Kakkanad".into(),
            },
            password_hash: "$argon2id$test".into(),
            areas_assigned: vec![],
        })
        .await
        .unwrap();
    let identity = Identity::from_user(&user);
    (user, identity)
}

fn input(location: serde_json::Value) -> CreateComplaintInput {
    CreateComplaintInput {
        category: " Drainage ".into(),
        description: "  Drain overflowing onto the main road  ".into(),
        location,
        images: vec!["https://img.example/1.jpg".into()],
        priority: None,
    }
}

#[tokio::test]
async fn create_starts_pending_with_medium_priority() {
    let h = setup().await;
    let (_, resident) = user(&h, "Asha", "9000000001", Role::Resident).await;

    let complaint = h
        .service
        .create(&resident, input(json!(r#"{"lat":"9.98","lng":"76.28","address":"MG Road"}"#)))
        .await
        .unwrap();

    assert_eq!(complaint.status, ComplaintStatus::Pending);
    assert_eq!(complaint.priority, Priority::Medium);
    assert_eq!(complaint.category, "Drainage");
    assert_eq!(complaint.description, "Drain overflowing onto the main road");
    assert_eq!(complaint.location.lat, 9.98);
    assert_eq!(complaint.resident_id, resident.id);
    assert!(complaint.assigned_to.is_none());
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let h = setup().await;
    let (_, resident) = user(&h, "Asha", "9000000001", Role::Resident).await;

    let mut short = input(json!({"lat": 9.9, "lng": 76.2}));
    short.description = "too short".into();
    let err = h.service.create(&resident, short).await.unwrap_err();
    assert!(matches!(err, FixMyAreaError::Validation { .. }));

    let err = h
        .service
        .create(&resident, input(json!("{broken")))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid location format. Please provide valid coordinates."
    );

    let mine = h.service.list_mine(&resident).await.unwrap();
    assert!(mine.is_empty());
}

#[tokio::test]
async fn staff_must_be_assignee_but_admin_bypasses() {
    let h = setup().await;
    let (_, resident) = user(&h, "Asha", "9000000001", Role::Resident).await;
    let (_, assigned) = user(&h, "Ravi", "9000000002", Role::Staff).await;
    let (_, other) = user(&h, "Meera", "9000000003", Role::Staff).await;
    let (_, admin) = user(&h, "Admin", "9000000004", Role::Admin).await;

    let complaint = h
        .service
        .create(&resident, input(json!({"lat": 9.9, "lng": 76.2})))
        .await
        .unwrap();

    let assigned_complaint = h
        .service
        .update_status(
            &admin,
            complaint.id,
            UpdateComplaint {
                status: None,
                assigned_to: Some(assigned.id),
            },
        )
        .await
        .unwrap();
    assert_eq!(assigned_complaint.assigned_to, Some(assigned.id));
    assert_eq!(assigned_complaint.status, ComplaintStatus::Pending);

    let err = h
        .service
        .update_status(
            &other,
            complaint.id,
            UpdateComplaint {
                status: Some(ComplaintStatus::Resolved),
                assigned_to: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FixMyAreaError::AuthorizationDenied { .. }));

    let unchanged = h.service.get(&admin, complaint.id).await.unwrap();
    assert_eq!(unchanged.complaint.status, ComplaintStatus::Pending);

    let progressed = h
        .service
        .update_status(
            &assigned,
            complaint.id,
            UpdateComplaint {
                status: Some(ComplaintStatus::InProgress),
                assigned_to: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(progressed.status, ComplaintStatus::InProgress);
    assert_eq!(progressed.assigned_to, Some(assigned.id));

    let resolved = h
        .service
        .update_status(
            &admin,
            complaint.id,
            UpdateComplaint {
                status: Some(ComplaintStatus::Resolved),
                assigned_to: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(resolved.status, ComplaintStatus::Resolved);
}

#[tokio::test]
async fn cannot_assign_to_resident_or_unknown_user() {
    let h = setup().await;
    let (_, resident) = user(&h, "Asha", "9000000001", Role::Resident).await;
    let (_, admin) = user(&h, "Admin", "9000000004", Role::Admin).await;

    let complaint = h
        .service
        .create(&resident, input(json!({"lat": 9.9, "lng": 76.2})))
        .await
        .unwrap();

    for target in [resident.id, uuid::Uuid::new_v4()] {
        let err = h
            .service
            .update_status(
                &admin,
                complaint.id,
                UpdateComplaint {
                    status: None,
                    assigned_to: Some(target),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FixMyAreaError::Validation { .. }));
    }
}

#[tokio::test]
async fn listings_populate_the_other_party() {
    let h = setup().await;
    let (resident_user, resident) = user(&h, "Asha", "9000000001", Role::Resident).await;
    let (staff_user, staff) = user(&h, "Ravi", "9000000002", Role::Staff).await;
    let (_, admin) = user(&h, "Admin", "9000000004", Role::Admin).await;

    let complaint = h
        .service
        .create(&resident, input(json!({"lat": 9.9, "lng": 76.2})))
        .await
        .unwrap();
    h.service
        .update_status(
            &admin,
            complaint.id,
            UpdateComplaint {
                status: None,
                assigned_to: Some(staff.id),
            },
        )
        .await
        .unwrap();

    let mine = h.service.list_mine(&resident).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].assignee.as_ref().unwrap().name, staff_user.name);
    assert!(mine[0].resident.is_none());

    let assigned = h.service.list_assigned(&staff).await.unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].resident.as_ref().unwrap().phone, resident_user.phone);

    let json = serde_json::to_value(&assigned[0]).unwrap();
    assert_eq!(json["status"], "Pending");
    assert_eq!(json["resident"]["name"], "Asha");
}

#[tokio::test]
async fn residents_only_see_their_own_complaints() {
    let h = setup().await;
    let (_, owner) = user(&h, "Asha", "9000000001", Role::Resident).await;
    let (_, neighbour) = user(&h, "Joseph", "9000000005", Role::Resident).await;

    let complaint = h
        .service
        .create(&owner, input(json!({"lat": 9.9, "lng": 76.2})))
        .await
        .unwrap();

    assert!(h.service.get(&owner, complaint.id).await.is_ok());
    let err = h.service.get(&neighbour, complaint.id).await.unwrap_err();
    assert!(matches!(err, FixMyAreaError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn upvotes_are_counted_once_per_user() {
    let h = setup().await;
    let (_, owner) = user(&h, "Asha", "9000000001", Role::Resident).await;
    let (_, neighbour) = user(&h, "Joseph", "9000000005", Role::Resident).await;

    let complaint = h
        .service
        .create(&owner, input(json!({"lat": 9.9, "lng": 76.2})))
        .await
        .unwrap();

    h.service.upvote(&neighbour, complaint.id).await.unwrap();
    let after = h.service.upvote(&neighbour, complaint.id).await.unwrap();
    assert_eq!(after.upvotes, 1);
    assert_eq!(after.upvoters, vec![neighbour.id]);
}

#[tokio::test]
async fn comments_are_appended() {
    let h = setup().await;
    let (_, owner) = user(&h, "Asha", "9000000001", Role::Resident).await;
    let (_, staff) = user(&h, "Ravi", "9000000002", Role::Staff).await;

    let complaint = h
        .service
        .create(&owner, input(json!({"lat": 9.9, "lng": 76.2})))
        .await
        .unwrap();

    h.service
        .add_comment(&staff, complaint.id, CommentInput { text: " Crew scheduled ".into() })
        .await
        .unwrap();
    let after = h
        .service
        .add_comment(&owner, complaint.id, CommentInput { text: "Thanks".into() })
        .await
        .unwrap();

    assert_eq!(after.comments.len(), 2);
    assert_eq!(after.comments[0].text, "Crew scheduled");
    assert_eq!(after.comments[0].author_id, staff.id);
    assert_eq!(after.status, ComplaintStatus::Pending);

    let err = h
        .service
        .add_comment(&owner, complaint.id, CommentInput { text: "   ".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, FixMyAreaError::Validation { .. }));
}

#[tokio::test]
async fn residents_comment_only_on_their_own_complaints() {
    let h = setup().await;
    let (_, owner) = user(&h, "Asha", "9000000001", Role::Resident).await;
    let (_, neighbour) = user(&h, "Meera", "9000000003", Role::Resident).await;

    let complaint = h
        .service
        .create(&owner, input(json!({"lat": 9.9, "lng": 76.2})))
        .await
        .unwrap();

    let err = h
        .service
        .add_comment(&neighbour, complaint.id, CommentInput { text: "Same here".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, FixMyAreaError::AuthorizationDenied { .. }));

    let view = h.service.get(&owner, complaint.id).await.unwrap();
    assert!(view.complaint.comments.is_empty());
}
