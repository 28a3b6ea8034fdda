use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_complete: bool,
}

#[derive(Error, Debug)]
pub enum PatientError {
    #[error("Patient with id {0} does not exist.")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
