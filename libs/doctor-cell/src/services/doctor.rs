use anyhow::Result;
use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::DoctorError;
use crate::models::DoctorProfile;

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_doctor(&self, doctor_id: Uuid, auth_token: Option<&str>) -> Result<Option<DoctorProfile>> {
        debug!("Fetching doctor profile: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let mut result: Vec<DoctorProfile> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        Ok(result.pop())
    }

    /// Look up a doctor from a raw path/query id. Ids that are not UUIDs
    /// cannot exist and are reported as not found.
    pub async fn resolve_doctor(&self, raw_id: &str, auth_token: Option<&str>) -> Result<DoctorProfile, DoctorError> {
        let doctor_id = Uuid::parse_str(raw_id.trim())
            .map_err(|_| DoctorError::DoctorNotFound(raw_id.to_string()))?;

        self.get_doctor(doctor_id, auth_token)
            .await?
            .ok_or_else(|| DoctorError::DoctorNotFound(raw_id.to_string()))
    }

    pub async fn get_doctors_by_department(&self, department_id: Uuid, auth_token: Option<&str>) -> Result<Vec<DoctorProfile>> {
        debug!("Fetching doctors for department: {}", department_id);

        let path = format!("/rest/v1/doctors?department_id=eq.{}", department_id);
        self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await
    }
}
