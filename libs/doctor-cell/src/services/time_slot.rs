use std::collections::HashMap;

use anyhow::{anyhow, Result};
use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{NewTimeSlot, TimeSlot};

/// Storage for bookable intervals. Rows are only ever inserted; nothing here
/// updates or deletes a slot.
pub struct TimeSlotService {
    supabase: SupabaseClient,
}

impl TimeSlotService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Insert all `slots` in one request. Rows come back in input order.
    pub async fn create_time_slots(&self, slots: &[NewTimeSlot], auth_token: &str) -> Result<Vec<TimeSlot>> {
        if slots.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Creating {} time slots", slots.len());

        let created: Vec<TimeSlot> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/time_slots",
            Some(auth_token),
            Some(serde_json::to_value(slots)?),
            Some(return_representation()),
        ).await?;

        if created.len() != slots.len() {
            return Err(anyhow!(
                "Expected {} time slots to be created, storage returned {}",
                slots.len(),
                created.len()
            ));
        }

        Ok(created)
    }

    pub async fn create_time_slot(&self, slot: &NewTimeSlot, auth_token: &str) -> Result<TimeSlot> {
        self.create_time_slots(std::slice::from_ref(slot), auth_token)
            .await?
            .pop()
            .ok_or_else(|| anyhow!("Failed to create time slot"))
    }

    /// Fetch slots by id, preserving the order of `ids`. Unknown ids are left out.
    pub async fn get_time_slots(&self, ids: &[Uuid], auth_token: Option<&str>) -> Result<Vec<TimeSlot>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
        let path = format!("/rest/v1/time_slots?id=in.({})", id_list);

        let rows: Vec<TimeSlot> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let mut by_id: HashMap<Uuid, TimeSlot> = rows.into_iter().map(|slot| (slot.id, slot)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}
