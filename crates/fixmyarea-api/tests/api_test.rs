//! End-to-end HTTP tests against an in-memory store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use fixmyarea_api::AppState;
use fixmyarea_auth::dispatch::{DispatchError, MessageProvider, OtpNotifier, OutboundMessage};
use fixmyarea_auth::{AuthConfig, RegistrationTrust};
use fixmyarea_core::clock::{Clock, ManualClock};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use tower::ServiceExt;

#[derive(Default)]
struct Outbox {
    bodies: Mutex<Vec<String>>,
}

impl Outbox {
    fn last_code(&self) -> String {
        let bodies = self.bodies.lock().unwrap();
        let body = bodies.last().expect("no message sent");
        body.split(|c: char| !c.is_ascii_digit())
            .find(|w| w.len() == 6)
            .expect("no code in message")
            .to_string()
    }
}

#[async_trait]
impl MessageProvider for Outbox {
    async fn send(
        &self,
        _destination: &str,
        message: &OutboundMessage,
    ) -> Result<String, DispatchError> {
        self.bodies.lock().unwrap().push(message.body.clone());
        Ok("msg".into())
    }
}

struct TestApp {
    router: Router,
    outbox: Arc<Outbox>,
}

async fn spawn(trust: RegistrationTrust) -> TestApp {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    fixmyarea_db::run_migrations(&db).await.unwrap();

    let config = AuthConfig {
        jwt_secret: "api-test-secret".into(),
        registration_trust: trust,
        ..AuthConfig::default()
    };
    let outbox = Arc::new(Outbox::default());
    let sms: Arc<dyn MessageProvider> = outbox.clone();
    let notifier = OtpNotifier::new(Some(sms), None, config.otp_expiry_minutes);
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_now());

    let state = AppState::new(db, config, notifier, clock, chrono::Duration::minutes(5));
    TestApp {
        router: fixmyarea_api::router(state),
        outbox,
    }
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Register without a ticket (client-attested apps only).
    async fn register(&self, phone: &str, role: &str) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(registration(phone, role, None)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let data = &body["data"];
        (
            data["token"].as_str().unwrap().to_string(),
            data["_id"].as_str().unwrap().to_string(),
        )
    }
}

fn registration(phone: &str, role: &str, ticket: Option<&str>) -> Value {
    json!({
        "name": format!("User {phone}"),
        "phone": phone,
        "role": role,
        "password": "Secret123",
        "location": { "state": "Kerala", "district": "Ernakulam", "village": "Kakkanad" },
        "registrationTicket": ticket,
    })
}

fn dog_body() -> Value {
    json!({
        "breed": "Indie",
        "color": "Brown",
        "size": "Medium",
        "age": 3,
        "gender": "Female",
        "location": { "state": "Kerala", "district": "Ernakulam", "village": "Kakkanad" },
    })
}

#[tokio::test]
async fn health_reports_database() {
    let app = spawn(RegistrationTrust::VerifiedTicket).await;
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["services"]["database"], "healthy");
}

#[tokio::test]
async fn otp_verification_unlocks_registration() {
    let app = spawn(RegistrationTrust::VerifiedTicket).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/otp/send-registration",
            None,
            Some(json!({ "phone": "9876543210" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "OTP sent successfully");
    assert_eq!(body["data"]["smsSent"], true);

    // Registration without a ticket is refused.
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(registration("9876543210", "resident", None)),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");
    assert_eq!(
        body["message"],
        "Phone verification required. Please verify the registration OTP first."
    );

    let verify = json!({
        "phone": "9876543210",
        "otp": app.outbox.last_code(),
        "type": "registration",
    });
    let (status, body) = app
        .call(Method::POST, "/api/otp/verify", None, Some(verify))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ticket = body["data"]["registrationTicket"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(registration("9876543210", "resident", Some(&ticket))),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) = app.call(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phone"], "9876543210");
    assert_eq!(body["data"]["role"], "resident");

    // A second registration OTP for the same phone is refused.
    let (status, body) = app
        .call(
            Method::POST,
            "/api/otp/send-registration",
            None,
            Some(json!({ "phone": "9876543210" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User with this phone number already exists");
}

#[tokio::test]
async fn login_otp_for_unknown_phone_is_not_found() {
    let app = spawn(RegistrationTrust::VerifiedTicket).await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/otp/send-login",
            None,
            Some(json!({ "phone": "9000000000" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found. Please register first.");
}

#[tokio::test]
async fn password_login_returns_token() {
    let app = spawn(RegistrationTrust::ClientAttested).await;
    app.register("9876543210", "resident").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "phone": "9876543210", "password": "Secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["token"].is_string());
    assert_eq!(body["data"]["loginCount"], 1);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "phone": "9876543210", "password": "Wrong123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = spawn(RegistrationTrust::ClientAttested).await;

    let (status, body) = app.call(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "success": false, "message": "Not authorized, no token" }));

    let (status, body) = app
        .call(Method::GET, "/api/auth/me", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn residents_cannot_reach_dog_records() {
    let app = spawn(RegistrationTrust::ClientAttested).await;
    let (token, _) = app.register("9876543210", "resident").await;

    let (status, body) = app.call(Method::GET, "/api/dogs", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You do not have permission to perform this action");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = spawn(RegistrationTrust::ClientAttested).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn complaint_triage_respects_assignment() {
    let app = spawn(RegistrationTrust::ClientAttested).await;
    let (resident, _) = app.register("9000000001", "resident").await;
    let (assignee, assignee_id) = app.register("9000000002", "staff").await;
    let (other_staff, _) = app.register("9000000003", "staff").await;
    let (admin, _) = app.register("9000000004", "admin").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/complaints",
            Some(&resident),
            Some(json!({
                "category": "Streetlight",
                "description": "Streetlight out near the bus stop",
                "location": "{\"lat\": \"10.01\", \"lng\": 76.34}",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Complaint submitted successfully");
    assert_eq!(body["data"]["status"], "Pending");
    let id = body["data"]["_id"].as_str().unwrap().to_string();
    let uri = format!("/api/complaints/{id}");

    // Staff cannot file complaints.
    let (status, _) = app
        .call(
            Method::POST,
            "/api/complaints",
            Some(&assignee),
            Some(json!({
                "category": "Drainage",
                "description": "Blocked drain on the main road",
                "location": { "lat": 10.0, "lng": 76.3 },
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::PATCH,
            &uri,
            Some(&admin),
            Some(json!({ "status": "In Progress", "assignedTo": assignee_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Complaint updated successfully");
    assert_eq!(body["complaint"]["status"], "In Progress");

    let (status, _) = app
        .call(Method::PATCH, &uri, Some(&other_staff), Some(json!({ "status": "Resolved" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::PATCH, &uri, Some(&assignee), Some(json!({ "status": "Resolved" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["complaint"]["status"], "Resolved");

    let (status, body) = app
        .call(Method::GET, "/api/complaints/my-complaints", Some(&resident), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["assignee"]["phone"], "9000000002");

    let (status, body) = app
        .call(Method::GET, "/api/complaints/assigned", Some(&assignee), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app
        .call(Method::GET, "/api/reports/complaints?groupBy=status", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "_id": "Resolved", "count": 1 }]));

    let (status, body) = app
        .call(Method::GET, "/api/reports/complaints?groupBy=colour", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid groupBy: colour");

    let (status, body) = app
        .call(Method::GET, "/api/complaints/not-a-uuid", Some(&resident), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid id");
}

#[tokio::test]
async fn dog_record_lifecycle() {
    let app = spawn(RegistrationTrust::ClientAttested).await;
    let (staff, _) = app.register("9000000002", "staff").await;
    let (admin, _) = app.register("9000000004", "admin").await;

    let (status, body) = app
        .call(Method::POST, "/api/dogs", Some(&staff), Some(dog_body()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["dogId"], "DOG000001");
    assert_eq!(body["data"]["sterilizationStatus"], "Not Sterilized");
    let id = body["data"]["_id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::PATCH,
            &format!("/api/dogs/{id}/sterilization"),
            Some(&staff),
            Some(json!({ "status": "Sterilized", "date": "2024-01-15T00:00:00Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["sterilizationStatus"], "Sterilized");
    assert!(body["data"]["sterilizationDate"].is_string());

    let (status, body) = app
        .call(
            Method::GET,
            "/api/dogs?status=all&sterilization=Sterilized",
            Some(&staff),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .call(
            Method::PATCH,
            &format!("/api/dogs/{id}/close"),
            Some(&staff),
            Some(json!({ "outcome": "Adopted" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "Adopted");

    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/dogs/{id}/close"),
            Some(&staff),
            Some(json!({ "outcome": "Lost" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/dogs/{id}"), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::DELETE, &format!("/api/dogs/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Dog record deleted successfully");

    let (status, body) = app
        .call(Method::GET, &format!("/api/dogs/{id}"), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Dog record not found");
}

#[tokio::test]
async fn locations_are_public() {
    let app = spawn(RegistrationTrust::ClientAttested).await;
    let (status, body) = app.call(Method::GET, "/api/locations/states", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = app
        .call(Method::GET, "/api/locations/districts", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "State is required");
}
