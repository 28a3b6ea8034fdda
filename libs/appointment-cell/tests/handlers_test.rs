use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::MockServer;

use appointment_cell::router::appointment_routes;
use shared_utils::fake_postgrest::FakePostgrest;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

struct TestApp {
    _server: MockServer,
    store: FakePostgrest,
    router: Router,
    doctor_id: String,
    patient_id: String,
    token: String,
}

async fn create_test_app() -> TestApp {
    let server = MockServer::start().await;
    let store = FakePostgrest::new();
    store.mount(&server).await;

    let user = TestUser::patient("patient@example.com");
    let doctor_id = Uuid::new_v4().to_string();
    let patient_id = Uuid::new_v4().to_string();
    store.seed("doctors", MockSupabaseResponses::doctor_row(&doctor_id, &Uuid::new_v4().to_string()));
    store.seed("patients", MockSupabaseResponses::patient_row(&patient_id, &user.id));

    let config = Arc::new(TestConfig::with_supabase_url(server.uri()).to_app_config());
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));

    TestApp {
        _server: server,
        store,
        router: appointment_routes(config),
        doctor_id,
        patient_id,
        token,
    }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn booking(app: &TestApp) -> Value {
    json!({
        "patient": app.patient_id,
        "doctor": app.doctor_id,
        "time_slot": {
            "start_time": "09:00",
            "end_time": "09:30",
            "online_appointment_charge": 100,
            "physical_appointment_charge": 150
        },
        "appointment_type": "online",
        "notes": "First visit"
    })
}

#[tokio::test]
async fn test_create_appointment() {
    let app = create_test_app().await;

    let response = app.router.clone()
        .oneshot(request("POST", "/", Some(&app.token), Some(booking(&app))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["patient"], app.patient_id.as_str());
    assert_eq!(body["doctor"], app.doctor_id.as_str());
    assert_eq!(body["status"], "pending");
    assert_eq!(body["notes"], "First visit");
    assert_eq!(body["time_slot"]["start_time"], "09:00:00");
    assert_eq!(body["time_slot"]["end_time"], "09:30:00");
    assert_eq!(body["time_slot"]["online_appointment_charge"], 100.0);
    assert_eq!(body["time_slot"]["physical_appointment_charge"], 150.0);

    let response = app.router
        .oneshot(request(
            "GET",
            &format!("/get_appointments_by_patient?patient_id={}", app.patient_id),
            Some(&app.token),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let listed = read_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], body["id"]);
}

#[tokio::test]
async fn test_create_appointment_validation_errors() {
    let app = create_test_app().await;
    let mut payload = booking(&app);
    payload["doctor"] = json!("nope");
    payload["time_slot"]["online_appointment_charge"] = json!("free");

    let response = app.router
        .oneshot(request("POST", "/", Some(&app.token), Some(payload)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["errors"]["doctor"][0], "Invalid pk \"nope\" - object does not exist.");
    assert_eq!(body["errors"]["time_slot.online_appointment_charge"][0], "A valid number is required.");
    assert_eq!(app.store.write_count("appointments"), 0);
}

#[tokio::test]
async fn test_appointments_require_token() {
    let app = create_test_app().await;

    let response = app.router.clone()
        .oneshot(request("POST", "/", None, Some(booking(&app))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.router
        .oneshot(request(
            "GET",
            &format!("/get_appointments_by_doctor?doctor_id={}", app.doctor_id),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.write_count("time_slots"), 0);
}

#[tokio::test]
async fn test_get_appointments_by_doctor() {
    let app = create_test_app().await;

    let response = app.router.clone()
        .oneshot(request(
            "GET",
            &format!("/get_appointments_by_doctor?doctor_id={}", app.doctor_id),
            Some(&app.token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, json!([]));

    let missing = Uuid::new_v4();
    let response = app.router.clone()
        .oneshot(request(
            "GET",
            &format!("/get_appointments_by_doctor?doctor_id={}", missing),
            Some(&app.token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["detail"], format!("Doctor with id {} does not exist.", missing));

    let response = app.router
        .oneshot(request("GET", "/get_appointments_by_doctor", Some(&app.token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_appointments_for_unknown_patient() {
    let app = create_test_app().await;
    let missing = Uuid::new_v4();

    let response = app.router
        .oneshot(request(
            "GET",
            &format!("/get_appointments_by_patient?patient_id={}", missing),
            Some(&app.token),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["detail"], format!("Patient with id {} does not exist.", missing));
}
