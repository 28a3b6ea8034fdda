use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor with id {0} does not exist.")]
    DoctorNotFound(String),

    #[error("Department with id {0} does not exist.")]
    DepartmentNotFound(String),

    #[error("Invalid availability payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid pk \"{0}\" - object does not exist.")]
    UnknownDoctorReference(Uuid),

    #[error("Invalid pk \"{0}\" - object does not exist.")]
    UnknownTimeSlotReference(Uuid),

    #[error("Invalid doctor profile.")]
    InvalidDoctorProfile,

    #[error("Availability for this doctor and day already exists.")]
    AvailabilityExists,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        let message = err.to_string();
        match err {
            DoctorError::DoctorNotFound(_) | DoctorError::DepartmentNotFound(_) => AppError::NotFound(message),
            DoctorError::InvalidPayload(_) | DoctorError::InvalidDoctorProfile => AppError::BadRequest(message),
            DoctorError::UnknownDoctorReference(_) => AppError::invalid_field("doctor", message),
            DoctorError::UnknownTimeSlotReference(_) => AppError::invalid_field("time_slots", message),
            DoctorError::AvailabilityExists => AppError::Conflict(message),
            DoctorError::Storage(_) => AppError::Database(message),
        }
    }
}
