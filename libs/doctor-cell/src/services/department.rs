use anyhow::Result;
use reqwest::Method;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::DoctorError;
use crate::models::{Department, DoctorProfile};
use crate::services::doctor::DoctorService;

pub struct DepartmentService {
    supabase: SupabaseClient,
    doctors: DoctorService,
}

impl DepartmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctors: DoctorService::new(config),
        }
    }

    pub async fn get_department(&self, department_id: Uuid, auth_token: Option<&str>) -> Result<Option<Department>> {
        let path = format!("/rest/v1/departments?id=eq.{}", department_id);
        let mut result: Vec<Department> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        Ok(result.pop())
    }

    /// Doctors attached to a department; the department itself must exist.
    pub async fn list_doctors(&self, raw_department_id: &str, auth_token: Option<&str>) -> Result<Vec<DoctorProfile>, DoctorError> {
        let not_found = || DoctorError::DepartmentNotFound(raw_department_id.to_string());

        let department_id = Uuid::parse_str(raw_department_id.trim()).map_err(|_| not_found())?;
        let department = self.get_department(department_id, auth_token).await?.ok_or_else(not_found)?;

        Ok(self.doctors.get_doctors_by_department(department.id, auth_token).await?)
    }
}
