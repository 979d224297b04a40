//! Integration tests for complaint reports.

use chrono::{Duration, TimeZone, Utc};
use fixmyarea_core::models::complaint::{
    ComplaintLocation, ComplaintStatus, CreateComplaint, Priority, UpdateComplaint,
};
use fixmyarea_core::models::user::{CreateUser, Role, UserLocation};
use fixmyarea_core::repository::{ComplaintRepository, UserRepository};
use fixmyarea_db::repository::{SurrealComplaintRepository, SurrealUserRepository};
use fixmyarea_records::{GroupCount, ReportDimension, ReportService};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> (
    ReportService<SurrealComplaintRepository<Db>, SurrealUserRepository<Db>>,
    SurrealComplaintRepository<Db>,
    SurrealUserRepository<Db>,
) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    fixmyarea_db::run_migrations(&db).await.unwrap();

    (
        ReportService::new(
            SurrealComplaintRepository::new(db.clone()),
            SurrealUserRepository::new(db.clone()),
        ),
        SurrealComplaintRepository::new(db.clone()),
        SurrealUserRepository::new(db),
    )
}

fn complaint(category: &str, created_at: chrono::DateTime<Utc>) -> CreateComplaint {
    CreateComplaint {
        resident_id: Uuid::new_v4(),
        category: category.into(),
        description: "Street light not working".into(),
        images: vec![],
        location: ComplaintLocation {
            lat: 9.9,
            lng: 76.2,
            address: None,
            state: Some("Kerala".into()),
            district: Some("Ernakulam".into()),
            village: None,
        },
        priority: Priority::Low,
        created_at,
    }
}

async fn staff(users: &SurrealUserRepository<Db>, name: &str, phone: &str) -> Uuid {
    users
        .create(CreateUser {
            role: Role::Staff,
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
        .unwrap()
        .id
}

#[tokio::test]
async fn group_by_category_within_range() {
    let (reports, complaints, _) = setup().await;
    let jan = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
    let mar = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();

    complaints.create(complaint("Lighting", jan)).await.unwrap();
    complaints.create(complaint("Lighting", mar)).await.unwrap();
    complaints.create(complaint("Roads", mar)).await.unwrap();

    let all = reports
        .group_by(ReportDimension::Category, None, None)
        .await
        .unwrap();
    assert_eq!(
        all,
        vec![
            GroupCount { key: Some("Lighting".into()), count: 2 },
            GroupCount { key: Some("Roads".into()), count: 1 },
        ]
    );

    let march = reports
        .group_by(ReportDimension::Category, Some(mar - Duration::days(1)), None)
        .await
        .unwrap();
    assert_eq!(march.iter().map(|g| g.count).sum::<u64>(), 2);

    let by_month = reports
        .group_by(ReportDimension::Month, None, Some(jan + Duration::days(1)))
        .await
        .unwrap();
    assert_eq!(by_month, vec![GroupCount { key: Some("2024-01".into()), count: 1 }]);

    let by_village = reports
        .group_by(ReportDimension::Village, None, None)
        .await
        .unwrap();
    assert_eq!(by_village, vec![GroupCount { key: None, count: 3 }]);
}

#[tokio::test]
async fn staff_performance_counts_resolved_and_total() {
    let (reports, complaints, users) = setup().await;
    let now = Utc::now();
    let ravi = staff(&users, "Ravi", "9000000002").await;
    let meera = staff(&users, "Meera", "9000000003").await;

    let assign = |assignee: Uuid, status: Option<ComplaintStatus>| UpdateComplaint {
        status,
        assigned_to: Some(assignee),
    };

    let a = complaints.create(complaint("Lighting", now)).await.unwrap();
    let b = complaints.create(complaint("Roads", now)).await.unwrap();
    let c = complaints.create(complaint("Roads", now)).await.unwrap();
    complaints.create(complaint("Drainage", now)).await.unwrap();

    complaints
        .update(a.id, assign(ravi, Some(ComplaintStatus::Resolved)))
        .await
        .unwrap();
    complaints.update(b.id, assign(ravi, None)).await.unwrap();
    complaints
        .update(c.id, assign(meera, Some(ComplaintStatus::Resolved)))
        .await
        .unwrap();

    let rows = reports.staff_performance().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "Meera");
    assert_eq!((rows[0].resolved_count, rows[0].total_count), (1, 1));
    assert_eq!(rows[1].name, "Ravi");
    assert_eq!(rows[1].staff_id, ravi);
    assert_eq!((rows[1].resolved_count, rows[1].total_count), (1, 2));
}
