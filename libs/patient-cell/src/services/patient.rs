use anyhow::Result;
use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{PatientError, PatientProfile};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_patient(&self, patient_id: Uuid, auth_token: Option<&str>) -> Result<Option<PatientProfile>> {
        debug!("Fetching patient profile: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let mut result: Vec<PatientProfile> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        Ok(result.pop())
    }

    /// Look up a patient from a raw query id; non-UUID ids are not found.
    pub async fn resolve_patient(&self, raw_id: &str, auth_token: Option<&str>) -> Result<PatientProfile, PatientError> {
        let patient_id = Uuid::parse_str(raw_id.trim())
            .map_err(|_| PatientError::NotFound(raw_id.to_string()))?;

        self.get_patient(patient_id, auth_token)
            .await?
            .ok_or_else(|| PatientError::NotFound(raw_id.to_string()))
    }
}
