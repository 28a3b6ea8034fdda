use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::models::{NewTimeSlot, TimeSlot};
use shared_models::error::{AppError, FieldErrors};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Whether the consultation happens online or in person; selects the price tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Online,
    Physical,
}

/// Row of the `appointments` table, optionally with its slot embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub time_slot_id: Uuid,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_type: Option<AppointmentType>,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_slot: Option<TimeSlot>,
}

/// Appointment as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient: Uuid,
    pub doctor: Uuid,
    pub time_slot: Option<TimeSlot>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_type: Option<AppointmentType>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Price of the booked slot for the chosen consultation type.
    pub fn charge(&self) -> Option<f64> {
        let slot = self.time_slot.as_ref()?;
        match self.appointment_type? {
            AppointmentType::Online => slot.online_appointment_charge,
            AppointmentType::Physical => slot.physical_appointment_charge,
        }
    }
}

impl From<AppointmentRecord> for Appointment {
    fn from(record: AppointmentRecord) -> Self {
        Self {
            id: record.id,
            patient: record.patient_id,
            doctor: record.doctor_id,
            time_slot: record.time_slot,
            appointment_date: record.appointment_date,
            appointment_type: record.appointment_type,
            status: record.status,
            notes: record.notes,
            created_at: record.created_at,
        }
    }
}

/// Fields copied onto the appointment as submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentDetails {
    pub appointment_date: Option<NaiveDate>,
    pub appointment_type: Option<AppointmentType>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

/// A booking request whose shape has been checked; references are not yet resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub time_slot: NewTimeSlot,
    pub details: AppointmentDetails,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Doctor with id {0} does not exist.")]
    DoctorNotFound(String),

    #[error("Patient with id {0} does not exist.")]
    PatientNotFound(String),

    #[error("Invalid appointment: {} field(s) rejected", .0.len())]
    Validation(FieldErrors),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::DoctorNotFound(_) | AppointmentError::PatientNotFound(_) => {
                AppError::NotFound(message)
            }
            AppointmentError::Validation(errors) => AppError::ValidationError(errors),
            AppointmentError::Storage(_) => AppError::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn appointment(appointment_type: Option<AppointmentType>) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient: Uuid::new_v4(),
            doctor: Uuid::new_v4(),
            time_slot: Some(TimeSlot {
                id: Uuid::new_v4(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                online_appointment_charge: Some(100.0),
                physical_appointment_charge: Some(150.0),
            }),
            appointment_date: None,
            appointment_type,
            status: AppointmentStatus::Pending,
            notes: None,
            created_at: None,
        }
    }

    #[test]
    fn charge_follows_appointment_type() {
        assert_eq!(appointment(Some(AppointmentType::Online)).charge(), Some(100.0));
        assert_eq!(appointment(Some(AppointmentType::Physical)).charge(), Some(150.0));
        assert_eq!(appointment(None).charge(), None);
    }

    #[test]
    fn status_defaults_to_pending() {
        let record: AppointmentRecord = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "doctor_id": Uuid::new_v4(),
            "time_slot_id": Uuid::new_v4(),
            "appointment_date": "2026-11-02",
            "appointment_type": null,
            "notes": null,
            "created_at": null
        }))
        .unwrap();

        assert_eq!(record.status, AppointmentStatus::Pending);
        assert!(record.time_slot.is_none());
        assert_eq!(record.appointment_date, NaiveDate::from_ymd_opt(2026, 11, 2));
    }
}
