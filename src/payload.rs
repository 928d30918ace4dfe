//! JSON documents produced by the two commands.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use getappt_ews::{Appointment, AttendeeAvailability, CalendarEvent, FreeBusyStatus, TimeWindow};
use serde::Serialize;

/// One entry of the `appointments` document.
#[derive(Debug, Clone, Serialize)]
pub struct UserAppointments {
    pub username: String,
    pub appointments: Vec<AppointmentRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentRecord {
    pub subject: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub freebusystatus: FreeBusyStatus,
}

impl From<Appointment> for AppointmentRecord {
    fn from(a: Appointment) -> Self {
        Self {
            subject: a.subject,
            start: a.start,
            end: a.end,
            location: a.location,
            freebusystatus: a.free_busy_status,
        }
    }
}

/// The `availability` document.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityReport {
    pub queried_at: DateTime<Utc>,
    pub window: TimeWindow,
    /// Meaning of each digit in `merged_free_busy`
    pub legend: BTreeMap<String, &'static str>,
    pub users: Vec<UserAvailability>,
}

impl AvailabilityReport {
    pub fn new(
        queried_at: DateTime<Utc>,
        window: TimeWindow,
        results: Vec<AttendeeAvailability>,
    ) -> Self {
        Self {
            queried_at,
            window,
            legend: FreeBusyStatus::legend(),
            users: results.into_iter().map(UserAvailability::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserAvailability {
    pub username: String,
    pub events: Vec<CalendarEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_free_busy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<AttendeeAvailability> for UserAvailability {
    fn from(a: AttendeeAvailability) -> Self {
        Self {
            username: a.mailbox,
            events: a.events,
            merged_free_busy: a.merged_free_busy,
            error: a.error,
        }
    }
}

/// Indented JSON, the form both printed and PUT.
///
/// # Errors
///
/// Only fails if a value cannot be represented as JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
