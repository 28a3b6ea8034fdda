use assert_matches::assert_matches;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::MockServer;

use appointment_cell::models::{AppointmentError, AppointmentStatus, AppointmentType};
use appointment_cell::services::AppointmentBookingService;
use shared_utils::fake_postgrest::FakePostgrest;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

const TOKEN: &str = "test-token";

struct Fixture {
    _server: MockServer,
    store: FakePostgrest,
    service: AppointmentBookingService,
    doctor_id: String,
    patient_id: String,
}

async fn setup() -> Fixture {
    let server = MockServer::start().await;
    let store = FakePostgrest::new();
    store.mount(&server).await;

    let doctor_id = Uuid::new_v4().to_string();
    let patient_id = Uuid::new_v4().to_string();
    store.seed("doctors", MockSupabaseResponses::doctor_row(&doctor_id, &Uuid::new_v4().to_string()));
    store.seed("patients", MockSupabaseResponses::patient_row(&patient_id, &Uuid::new_v4().to_string()));

    let config = TestConfig::with_supabase_url(server.uri()).to_app_config();

    Fixture {
        _server: server,
        store,
        service: AppointmentBookingService::new(&config),
        doctor_id,
        patient_id,
    }
}

fn booking(patient: &str, doctor: &str) -> Value {
    json!({
        "patient": patient,
        "doctor": doctor,
        "time_slot": {
            "start_time": "09:00",
            "end_time": "09:30",
            "online_appointment_charge": 100,
            "physical_appointment_charge": 150
        },
        "appointment_date": "2026-11-02",
        "appointment_type": "physical"
    })
}

#[tokio::test]
async fn test_booking_stores_its_own_slot() {
    let f = setup().await;

    let appointment = f.service
        .create_appointment(&booking(&f.patient_id, &f.doctor_id), TOKEN)
        .await
        .unwrap();

    assert_eq!(appointment.patient.to_string(), f.patient_id);
    assert_eq!(appointment.doctor.to_string(), f.doctor_id);
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.appointment_type, Some(AppointmentType::Physical));
    assert_eq!(appointment.charge(), Some(150.0));

    let slot = appointment.time_slot.unwrap();
    let stored_slots = f.store.rows("time_slots");
    assert_eq!(stored_slots.len(), 1);
    assert_eq!(stored_slots[0]["id"], json!(slot.id));

    let stored = f.store.rows("appointments");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["time_slot_id"], json!(slot.id));
}

#[tokio::test]
async fn test_identical_bookings_get_distinct_slots() {
    let f = setup().await;
    let payload = booking(&f.patient_id, &f.doctor_id);

    let first = f.service.create_appointment(&payload, TOKEN).await.unwrap();
    let second = f.service.create_appointment(&payload, TOKEN).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_ne!(first.time_slot.unwrap().id, second.time_slot.unwrap().id);
    assert_eq!(f.store.rows("time_slots").len(), 2);
}

#[tokio::test]
async fn test_invalid_slot_writes_nothing() {
    let f = setup().await;
    let mut payload = booking(&f.patient_id, &f.doctor_id);
    payload["time_slot"]["end_time"] = Value::Null;

    let result = f.service.create_appointment(&payload, TOKEN).await;

    assert_matches!(result, Err(AppointmentError::Validation(errors)) => {
        assert_eq!(errors["time_slot.end_time"], vec!["This field is required.".to_string()]);
    });
    assert_eq!(f.store.write_count("time_slots"), 0);
    assert_eq!(f.store.write_count("appointments"), 0);
}

#[tokio::test]
async fn test_unknown_patient_is_a_field_error() {
    let f = setup().await;
    let unknown = Uuid::new_v4().to_string();

    let result = f.service.create_appointment(&booking(&unknown, &f.doctor_id), TOKEN).await;

    assert_matches!(result, Err(AppointmentError::Validation(errors)) => {
        assert_eq!(errors["patient"], vec![format!("Invalid pk \"{}\" - object does not exist.", unknown)]);
        assert!(!errors.contains_key("doctor"));
    });
    assert_eq!(f.store.write_count("time_slots"), 0);
}

#[tokio::test]
async fn test_list_by_doctor() {
    let f = setup().await;

    let empty = f.service.list_by_doctor(&f.doctor_id, TOKEN).await.unwrap();
    assert!(empty.is_empty());

    f.service.create_appointment(&booking(&f.patient_id, &f.doctor_id), TOKEN).await.unwrap();

    let listed = f.service.list_by_doctor(&f.doctor_id, TOKEN).await.unwrap();
    assert_eq!(listed.len(), 1);
    let slot = listed[0].time_slot.as_ref().unwrap();
    assert_eq!(slot.online_appointment_charge, Some(100.0));
}

#[tokio::test]
async fn test_list_for_unknown_profiles() {
    let f = setup().await;

    assert_matches!(
        f.service.list_by_doctor(&Uuid::new_v4().to_string(), TOKEN).await,
        Err(AppointmentError::DoctorNotFound(_))
    );
    assert_matches!(
        f.service.list_by_patient("not-a-uuid", TOKEN).await,
        Err(AppointmentError::PatientNotFound(id)) if id == "not-a-uuid"
    );
}

#[tokio::test]
async fn test_list_by_patient_only_returns_their_appointments() {
    let f = setup().await;
    let other_patient = Uuid::new_v4().to_string();
    f.store.seed("patients", MockSupabaseResponses::patient_row(&other_patient, &Uuid::new_v4().to_string()));

    f.service.create_appointment(&booking(&f.patient_id, &f.doctor_id), TOKEN).await.unwrap();
    f.service.create_appointment(&booking(&other_patient, &f.doctor_id), TOKEN).await.unwrap();

    let listed = f.service.list_by_patient(&f.patient_id, TOKEN).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].patient.to_string(), f.patient_id);

    assert_eq!(f.service.list_by_doctor(&f.doctor_id, TOKEN).await.unwrap().len(), 2);
}
