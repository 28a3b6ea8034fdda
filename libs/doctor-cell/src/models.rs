use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ==============================================================================
// WEEKDAY
// ==============================================================================

/// Day of the week an availability applies to. Stored as its index,
/// Monday = 0 through Sunday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Weekday {
    Monday = 0,
    Tuesday = 1,
    Wednesday = 2,
    Thursday = 3,
    Friday = 4,
    Saturday = 5,
    Sunday = 6,
}

const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
    Weekday::Sunday,
];

impl Weekday {
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    /// Resolve a capitalized English day name. Anything else is not a day.
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_WEEKDAYS.into_iter().find(|day| day.name() == name)
    }
}

impl From<Weekday> for u8 {
    fn from(day: Weekday) -> Self {
        day.index()
    }
}

impl TryFrom<u8> for Weekday {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Weekday::Monday),
            1 => Ok(Weekday::Tuesday),
            2 => Ok(Weekday::Wednesday),
            3 => Ok(Weekday::Thursday),
            4 => Ok(Weekday::Friday),
            5 => Ok(Weekday::Saturday),
            6 => Ok(Weekday::Sunday),
            other => Err(format!("\"{}\" is not a valid day index (0-6)", other)),
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ==============================================================================
// TIME SLOTS
// ==============================================================================

/// A stored bookable interval with its two price tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub online_appointment_charge: Option<f64>,
    pub physical_appointment_charge: Option<f64>,
}

/// Insert shape for the `time_slots` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTimeSlot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub online_appointment_charge: Option<f64>,
    pub physical_appointment_charge: Option<f64>,
}

/// Parse a time of day given as `HH:MM`, `HH:MM:SS` or `HH:MM:SS.fff`.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Parse a non-negative charge sent either as a JSON number or a numeric string.
pub fn parse_charge(raw: &Value) -> Option<f64> {
    let charge = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (charge.is_finite() && charge >= 0.0).then_some(charge)
}

// ==============================================================================
// PROFILES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub department_id: Option<Uuid>,
    pub full_name: Option<String>,
    pub specialization: Option<String>,
    #[serde(default)]
    pub is_complete: bool,
}

impl DoctorProfile {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.to_string() == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

/// Row of the `doctor_availabilities` table; unique per (doctor_id, day).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorAvailabilityRecord {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day: Weekday,
    #[serde(default)]
    pub time_slot_ids: Vec<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Availability as returned to clients, with the time slots nested in stored order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorAvailability {
    pub id: Uuid,
    pub doctor: Uuid,
    pub day: Weekday,
    pub day_name: String,
    pub time_slots: Vec<TimeSlot>,
}

impl DoctorAvailability {
    pub fn from_record(record: DoctorAvailabilityRecord, time_slots: Vec<TimeSlot>) -> Self {
        Self {
            id: record.id,
            doctor: record.doctor_id,
            day: record.day,
            day_name: record.day.name().to_string(),
            time_slots,
        }
    }
}

/// One day of a `set_availability` batch after malformed entries were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule {
    pub day: Weekday,
    pub time_slots: Vec<NewTimeSlot>,
}

/// Direct creation of a single availability row from existing time slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityRequest {
    pub doctor: Uuid,
    pub day: Weekday,
    #[serde(default)]
    pub time_slots: Vec<Uuid>,
}
