use std::collections::{HashMap, HashSet};

use anyhow::anyhow;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, return_representation, upsert_representation, SupabaseClient};
use shared_models::auth::User;

use crate::error::DoctorError;
use crate::models::{
    parse_charge, parse_time_of_day, CreateAvailabilityRequest, DaySchedule,
    DoctorAvailability, DoctorAvailabilityRecord, NewTimeSlot, TimeSlot, Weekday,
};
use crate::services::{doctor::DoctorService, time_slot::TimeSlotService};

pub struct AvailabilityService {
    supabase: SupabaseClient,
    doctors: DoctorService,
    time_slots: TimeSlotService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctors: DoctorService::new(config),
            time_slots: TimeSlotService::new(config),
        }
    }

    /// Replace the weekly schedule of a doctor, one day at a time.
    ///
    /// Every valid slot entry becomes a new `time_slots` row. The day's
    /// availability row is then upserted on (doctor_id, day) with the new slot
    /// list, so a single statement both creates the row when missing and
    /// overwrites its previous slots. Slots referenced before are left behind.
    pub async fn set_availability(
        &self,
        doctor_id: &str,
        payload: &Value,
        auth_token: &str,
    ) -> Result<Vec<DoctorAvailabilityRecord>, DoctorError> {
        let doctor = self.doctors.resolve_doctor(doctor_id, Some(auth_token)).await?;
        let schedules = parse_availability_payload(payload)?;

        debug!("Setting availability for doctor {} across {} day(s)", doctor.id, schedules.len());

        let mut updated = Vec::with_capacity(schedules.len());
        for schedule in schedules {
            let slots = self.time_slots.create_time_slots(&schedule.time_slots, auth_token).await?;
            let record = self.replace_day(doctor.id, schedule.day, &slots, auth_token).await?;
            updated.push(record);
        }

        info!("Availability set for doctor {} ({} day(s) updated)", doctor.id, updated.len());
        Ok(updated)
    }

    async fn replace_day(
        &self,
        doctor_id: Uuid,
        day: Weekday,
        slots: &[TimeSlot],
        auth_token: &str,
    ) -> Result<DoctorAvailabilityRecord, DoctorError> {
        let body = json!({
            "doctor_id": doctor_id,
            "day": day.index(),
            "time_slot_ids": slots.iter().map(|slot| slot.id).collect::<Vec<_>>(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut result: Vec<DoctorAvailabilityRecord> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/doctor_availabilities?on_conflict=doctor_id,day",
            Some(auth_token),
            Some(body),
            Some(upsert_representation()),
        ).await?;

        let record = result
            .pop()
            .ok_or_else(|| anyhow!("Failed to store availability for {} on {}", doctor_id, day))?;

        debug!("{} availability for doctor {} now has {} slot(s)", day, doctor_id, record.time_slot_ids.len());
        Ok(record)
    }

    /// All availability rows of a doctor with their slots nested, in stored order.
    pub async fn get_availability(
        &self,
        doctor_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Vec<DoctorAvailability>, DoctorError> {
        let doctor = self.doctors.resolve_doctor(doctor_id, auth_token).await?;

        let path = format!("/rest/v1/doctor_availabilities?doctor_id=eq.{}", doctor.id);
        let records: Vec<DoctorAvailabilityRecord> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let slot_ids: Vec<Uuid> = records.iter().flat_map(|r| r.time_slot_ids.iter().copied()).collect();
        let slots: HashMap<Uuid, TimeSlot> = self.time_slots
            .get_time_slots(&slot_ids, auth_token)
            .await?
            .into_iter()
            .map(|slot| (slot.id, slot))
            .collect();

        Ok(records
            .into_iter()
            .map(|record| {
                let nested = record.time_slot_ids.iter().filter_map(|id| slots.get(id).cloned()).collect();
                DoctorAvailability::from_record(record, nested)
            })
            .collect())
    }

    /// Create one availability row from already stored slots. The doctor must
    /// belong to the caller.
    pub async fn create_availability(
        &self,
        user: &User,
        request: CreateAvailabilityRequest,
        auth_token: &str,
    ) -> Result<DoctorAvailability, DoctorError> {
        let doctor = self.doctors
            .get_doctor(request.doctor, Some(auth_token))
            .await?
            .ok_or(DoctorError::UnknownDoctorReference(request.doctor))?;

        if !doctor.is_owned_by(&user.id) {
            return Err(DoctorError::InvalidDoctorProfile);
        }

        // Repeated ids collapse to their first occurrence.
        let mut seen = HashSet::new();
        let slot_ids: Vec<Uuid> = request.time_slots.into_iter().filter(|id| seen.insert(*id)).collect();

        let slots = self.time_slots.get_time_slots(&slot_ids, Some(auth_token)).await?;
        if let Some(missing) = slot_ids.iter().find(|id| !slots.iter().any(|slot| slot.id == **id)) {
            return Err(DoctorError::UnknownTimeSlotReference(*missing));
        }

        let body = json!({
            "doctor_id": doctor.id,
            "day": request.day.index(),
            "time_slot_ids": slot_ids,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut result: Vec<DoctorAvailabilityRecord> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/doctor_availabilities",
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await.map_err(|e| if is_conflict(&e) { DoctorError::AvailabilityExists } else { DoctorError::Storage(e) })?;

        let record = result.pop().ok_or_else(|| anyhow!("Failed to create availability"))?;
        info!("Created {} availability {} for doctor {}", record.day, record.id, doctor.id);

        Ok(DoctorAvailability::from_record(record, slots))
    }
}

// ==============================================================================
// PAYLOAD PARSING
// ==============================================================================

/// Turn a `set_availability` body into per-day schedules.
///
/// The body is a list of `{day, timeSlots}` entries, optionally wrapped as
/// `{"data": [...]}`. Entries with an unknown day, without slots, or that are
/// not objects are dropped, as are slot entries missing a start or end time.
/// Only a body that is not a list at all is rejected.
pub fn parse_availability_payload(payload: &Value) -> Result<Vec<DaySchedule>, DoctorError> {
    let entries = match payload {
        Value::Array(entries) => entries,
        Value::Object(envelope) => match envelope.get("data") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(DoctorError::InvalidPayload(
                "expected a list of day entries, optionally wrapped in \"data\"".to_string(),
            )),
        },
        _ => return Err(DoctorError::InvalidPayload("expected a list of day entries".to_string())),
    };

    Ok(entries.iter().filter_map(parse_day_entry).collect())
}

fn parse_day_entry(entry: &Value) -> Option<DaySchedule> {
    let day_name = entry.get("day")?.as_str()?;
    let Some(day) = Weekday::from_name(day_name) else {
        debug!("Skipping availability entry with unknown day '{}'", day_name);
        return None;
    };

    let slot_entries = entry
        .get("timeSlots")
        .and_then(Value::as_array)
        .filter(|slots| !slots.is_empty())?;

    let time_slots: Vec<NewTimeSlot> = slot_entries.iter().filter_map(parse_slot_entry).collect();
    if time_slots.len() < slot_entries.len() {
        debug!("Dropped {} malformed slot(s) for {}", slot_entries.len() - time_slots.len(), day);
    }

    Some(DaySchedule { day, time_slots })
}

fn parse_slot_entry(entry: &Value) -> Option<NewTimeSlot> {
    let time_field = |key: &str| entry.get(key).and_then(Value::as_str).and_then(parse_time_of_day);

    Some(NewTimeSlot {
        start_time: time_field("startTime")?,
        end_time: time_field("endTime")?,
        online_appointment_charge: optional_charge(entry.get("online_appointment_charge"))?,
        physical_appointment_charge: optional_charge(entry.get("physical_appointment_charge"))?,
    })
}

/// `Some(None)` when the charge is absent, `None` when present but unusable.
fn optional_charge(raw: Option<&Value>) -> Option<Option<f64>> {
    match raw {
        None | Some(Value::Null) => Some(None),
        Some(value) => parse_charge(value).map(Some),
    }
}
