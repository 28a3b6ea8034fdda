use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use doctor_cell::models::{parse_charge, parse_time_of_day, NewTimeSlot};
use doctor_cell::services::{DoctorService, TimeSlotService};
use doctor_cell::DoctorError;
use patient_cell::{PatientError, PatientService};
use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};
use shared_models::error::FieldErrors;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentRecord, AppointmentStatus,
    AppointmentType, BookingDraft,
};

const REQUIRED: &str = "This field is required.";
const APPOINTMENT_SELECT: &str = "select=*,time_slot:time_slots(*)";

pub struct AppointmentBookingService {
    supabase: SupabaseClient,
    doctors: DoctorService,
    patients: PatientService,
    time_slots: TimeSlotService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctors: DoctorService::new(config),
            patients: PatientService::new(config),
            time_slots: TimeSlotService::new(config),
        }
    }

    /// Book an appointment on a slot of its own.
    ///
    /// The slot described in the payload is always inserted as a new
    /// `time_slots` row, even when an identical slot exists in the doctor's
    /// availability, so no two appointments ever share a slot. Overlapping
    /// bookings are not checked.
    pub async fn create_appointment(&self, payload: &Value, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let draft = self.validate(payload, auth_token).await?;

        let slot = self.time_slots.create_time_slot(&draft.time_slot, auth_token).await?;
        debug!("Created time slot {} for new appointment", slot.id);

        let details = &draft.details;
        let body = json!({
            "patient_id": draft.patient_id,
            "doctor_id": draft.doctor_id,
            "time_slot_id": slot.id,
            "appointment_date": details.appointment_date,
            "appointment_type": details.appointment_type,
            "status": details.status,
            "notes": details.notes,
            "created_at": Utc::now().to_rfc3339(),
        });

        let mut result: Vec<AppointmentRecord> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await?;

        let mut record = result
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Failed to create appointment"))?;
        record.time_slot = Some(slot);

        let appointment = Appointment::from(record);
        info!(
            "Booked appointment {} for patient {} with doctor {} (charge: {:?})",
            appointment.id, appointment.patient, appointment.doctor, appointment.charge()
        );

        Ok(appointment)
    }

    pub async fn list_by_doctor(&self, raw_doctor_id: &str, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let doctor = self.doctors
            .resolve_doctor(raw_doctor_id, Some(auth_token))
            .await
            .map_err(|e| match e {
                DoctorError::DoctorNotFound(id) => AppointmentError::DoctorNotFound(id),
                other => AppointmentError::Storage(other.into()),
            })?;

        self.list_where("doctor_id", doctor.id, auth_token).await
    }

    pub async fn list_by_patient(&self, raw_patient_id: &str, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let patient = self.patients
            .resolve_patient(raw_patient_id, Some(auth_token))
            .await
            .map_err(|e| match e {
                PatientError::NotFound(id) => AppointmentError::PatientNotFound(id),
                PatientError::Storage(source) => AppointmentError::Storage(source),
            })?;

        self.list_where("patient_id", patient.id, auth_token).await
    }

    async fn list_where(&self, column: &str, id: Uuid, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?{}=eq.{}&{}", column, id, APPOINTMENT_SELECT);
        let records: Vec<AppointmentRecord> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        debug!("Found {} appointment(s) for {} {}", records.len(), column, id);
        Ok(records.into_iter().map(Appointment::from).collect())
    }

    /// Check the payload shape, then that the referenced patient and doctor
    /// exist. All problems are reported together; nothing is written on failure.
    async fn validate(&self, payload: &Value, auth_token: &str) -> Result<BookingDraft, AppointmentError> {
        let mut errors = FieldErrors::new();
        let draft = parse_booking_payload(payload, &mut errors);

        let patient_id = reference_field(payload, "patient", &mut errors);
        if let Some(id) = patient_id {
            if self.patients.get_patient(id, Some(auth_token)).await?.is_none() {
                add_error(&mut errors, "patient", invalid_pk(id));
            }
        }

        let doctor_id = reference_field(payload, "doctor", &mut errors);
        if let Some(id) = doctor_id {
            if self.doctors.get_doctor(id, Some(auth_token)).await?.is_none() {
                add_error(&mut errors, "doctor", invalid_pk(id));
            }
        }

        match (draft, patient_id, doctor_id) {
            (Some((time_slot, details)), Some(patient_id), Some(doctor_id)) if errors.is_empty() => {
                Ok(BookingDraft { patient_id, doctor_id, time_slot, details })
            }
            _ => Err(AppointmentError::Validation(errors)),
        }
    }
}

// ==============================================================================
// PAYLOAD PARSING
// ==============================================================================

/// Parse the nested time slot and pass-through fields, recording any problem
/// in `errors`. Returns `None` if anything was rejected.
pub fn parse_booking_payload(payload: &Value, errors: &mut FieldErrors) -> Option<(NewTimeSlot, AppointmentDetails)> {
    if !payload.is_object() {
        add_error(errors, "non_field_errors", "Invalid data. Expected a dictionary.");
        return None;
    }

    let time_slot = parse_time_slot(payload.get("time_slot"), errors);

    let appointment_date = match payload.get("appointment_date") {
        None | Some(Value::Null) => None,
        Some(raw) => {
            let parsed = raw.as_str().and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
            if parsed.is_none() {
                add_error(errors, "appointment_date", "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.");
            }
            parsed
        }
    };

    let appointment_type = choice_field::<AppointmentType>(payload, "appointment_type", errors);
    let status = choice_field::<AppointmentStatus>(payload, "status", errors).unwrap_or_default();

    let notes = match payload.get("notes") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(_) => {
            add_error(errors, "notes", "Not a valid string.");
            None
        }
    };

    if !errors.is_empty() {
        return None;
    }

    Some((time_slot?, AppointmentDetails { appointment_date, appointment_type, status, notes }))
}

fn parse_time_slot(raw: Option<&Value>, errors: &mut FieldErrors) -> Option<NewTimeSlot> {
    let slot = match raw {
        None | Some(Value::Null) => {
            add_error(errors, "time_slot", REQUIRED);
            return None;
        }
        Some(Value::Object(slot)) => slot,
        Some(_) => {
            add_error(errors, "time_slot", "Invalid data. Expected a dictionary.");
            return None;
        }
    };

    let mut time = |key: &str| match slot.get(key) {
        None | Some(Value::Null) => {
            add_error(errors, &format!("time_slot.{}", key), REQUIRED);
            None
        }
        Some(value) => {
            let parsed = value.as_str().and_then(parse_time_of_day);
            if parsed.is_none() {
                add_error(
                    errors,
                    &format!("time_slot.{}", key),
                    "Time has wrong format. Use one of these formats instead: hh:mm[:ss[.uuuuuu]].",
                );
            }
            parsed
        }
    };
    let start_time = time("start_time");
    let end_time = time("end_time");

    let mut charge = |key: &str| match slot.get(key) {
        None | Some(Value::Null) => {
            add_error(errors, &format!("time_slot.{}", key), REQUIRED);
            None
        }
        Some(value) => {
            let parsed = parse_charge(value);
            if parsed.is_none() {
                add_error(errors, &format!("time_slot.{}", key), "A valid number is required.");
            }
            parsed
        }
    };
    let online_appointment_charge = charge("online_appointment_charge");
    let physical_appointment_charge = charge("physical_appointment_charge");

    Some(NewTimeSlot {
        start_time: start_time?,
        end_time: end_time?,
        online_appointment_charge: Some(online_appointment_charge?),
        physical_appointment_charge: Some(physical_appointment_charge?),
    })
}

fn choice_field<T: DeserializeOwned>(payload: &Value, key: &str, errors: &mut FieldErrors) -> Option<T> {
    match payload.get(key) {
        None | Some(Value::Null) => None,
        Some(raw) => {
            let parsed = serde_json::from_value::<T>(raw.clone()).ok();
            if parsed.is_none() {
                add_error(errors, key, format!("{} is not a valid choice.", raw));
            }
            parsed
        }
    }
}

/// A required reference to another profile. Ids that are not UUIDs cannot
/// exist, so they get the same message as unknown ones.
fn reference_field(payload: &Value, key: &str, errors: &mut FieldErrors) -> Option<Uuid> {
    match payload.get(key) {
        None | Some(Value::Null) => {
            add_error(errors, key, REQUIRED);
            None
        }
        Some(raw) => {
            let parsed = raw.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok());
            if parsed.is_none() {
                let shown = raw.as_str().map(str::to_string).unwrap_or_else(|| raw.to_string());
                add_error(errors, key, format!("Invalid pk \"{}\" - object does not exist.", shown));
            }
            parsed
        }
    }
}

fn invalid_pk(id: Uuid) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

fn add_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors.entry(field.to_string()).or_default().push(message.into());
}
