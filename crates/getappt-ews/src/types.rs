//! EWS data types shared by requests and responses.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EwsError;

/// Value of the `RequestServerVersion` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeVersion {
    Exchange2007Sp1,
    Exchange2010,
    Exchange2010Sp1,
    Exchange2010Sp2,
    Exchange2013,
    Exchange2013Sp1,
    #[default]
    Exchange2016,
}

impl ExchangeVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exchange2007Sp1 => "Exchange2007_SP1",
            Self::Exchange2010 => "Exchange2010",
            Self::Exchange2010Sp1 => "Exchange2010_SP1",
            Self::Exchange2010Sp2 => "Exchange2010_SP2",
            Self::Exchange2013 => "Exchange2013",
            Self::Exchange2013Sp1 => "Exchange2013_SP1",
            Self::Exchange2016 => "Exchange2016",
        }
    }
}

impl FromStr for ExchangeVersion {
    type Err = EwsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "exchange2007sp1" => Ok(Self::Exchange2007Sp1),
            "exchange2010" => Ok(Self::Exchange2010),
            "exchange2010sp1" => Ok(Self::Exchange2010Sp1),
            "exchange2010sp2" => Ok(Self::Exchange2010Sp2),
            "exchange2013" => Ok(Self::Exchange2013),
            "exchange2013sp1" => Ok(Self::Exchange2013Sp1),
            "exchange2016" => Ok(Self::Exchange2016),
            _ => Err(EwsError::UnsupportedVersion(s.to_string())),
        }
    }
}

/// Free/busy status of a time slot or appointment.
///
/// The discriminants are the digits EWS uses in merged free/busy strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FreeBusyStatus {
    Free = 0,
    Tentative = 1,
    Busy = 2,
    OutOfOffice = 3,
    WorkingElsewhere = 4,
    NoData = 5,
}

impl FreeBusyStatus {
    pub const ALL: [FreeBusyStatus; 6] = [
        Self::Free,
        Self::Tentative,
        Self::Busy,
        Self::OutOfOffice,
        Self::WorkingElsewhere,
        Self::NoData,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Tentative => "Tentative",
            Self::Busy => "Busy",
            Self::OutOfOffice => "OutOfOffice",
            Self::WorkingElsewhere => "WorkingElsewhere",
            Self::NoData => "NoData",
        }
    }

    /// Parse `LegacyFreeBusyStatus` / `BusyType` element text.
    ///
    /// Unknown values map to `NoData`.
    pub fn from_wire(value: &str) -> Self {
        match value.trim() {
            "Free" => Self::Free,
            "Tentative" => Self::Tentative,
            "Busy" => Self::Busy,
            "OOF" | "OutOfOffice" => Self::OutOfOffice,
            "WorkingElsewhere" => Self::WorkingElsewhere,
            _ => Self::NoData,
        }
    }

    /// Code to label map, keyed by the digit as a string.
    pub fn legend() -> BTreeMap<String, &'static str> {
        Self::ALL
            .into_iter()
            .map(|s| (s.code().to_string(), s.label()))
            .collect()
    }
}

impl fmt::Display for FreeBusyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A user's calendar folder, as returned by `GetFolder`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarFolder {
    pub mailbox: String,
    pub id: String,
    pub change_key: Option<String>,
}

/// Window and cap for a `FindItem` calendar view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarView {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub max_entries: u32,
}

impl CalendarView {
    /// `days` days starting at `now`, capped at `max_entries` items.
    ///
    /// # Errors
    ///
    /// Returns [`EwsError::InvalidWindow`] when the end is not representable.
    pub fn upcoming(now: DateTime<Utc>, days: u32, max_entries: u32) -> Result<Self, EwsError> {
        Ok(Self {
            start: now,
            end: add_days(now, days)?,
            max_entries,
        })
    }
}

/// Projected appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub subject: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub free_busy_status: FreeBusyStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Whole UTC days: from midnight `days_ahead` days after `now`, lasting
    /// `length_days` days.
    ///
    /// # Errors
    ///
    /// Returns [`EwsError::InvalidWindow`] when either bound is not
    /// representable.
    pub fn whole_days(
        now: DateTime<Utc>,
        days_ahead: u32,
        length_days: u32,
    ) -> Result<Self, EwsError> {
        let midnight = NaiveDateTime::new(now.date_naive(), NaiveTime::MIN).and_utc();
        let start = add_days(midnight, days_ahead)?;
        Ok(Self {
            start,
            end: add_days(start, length_days)?,
        })
    }
}

fn add_days(from: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>, EwsError> {
    from.checked_add_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| EwsError::InvalidWindow(format!("{} + {} days", from.to_rfc3339(), days)))
}

/// `RequestedView` of a free/busy query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AvailabilityView {
    MergedOnly,
    FreeBusy,
    #[default]
    FreeBusyMerged,
    Detailed,
    DetailedMerged,
}

impl AvailabilityView {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MergedOnly => "MergedOnly",
            Self::FreeBusy => "FreeBusy",
            Self::FreeBusyMerged => "FreeBusyMerged",
            Self::Detailed => "Detailed",
            Self::DetailedMerged => "DetailedMerged",
        }
    }
}

impl FromStr for AvailabilityView {
    type Err = EwsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mergedonly" => Ok(Self::MergedOnly),
            "freebusy" => Ok(Self::FreeBusy),
            "freebusymerged" => Ok(Self::FreeBusyMerged),
            "detailed" => Ok(Self::Detailed),
            "detailedmerged" => Ok(Self::DetailedMerged),
            _ => Err(EwsError::UnsupportedView(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityOptions {
    pub window: TimeWindow,
    pub view: AvailabilityView,
    pub merged_interval_minutes: u32,
}

/// One busy block from a free/busy view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub busy_type: FreeBusyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<CalendarEventDetails>,
}

/// Only present for `Detailed*` views and sufficient rights.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventDetails {
    pub subject: Option<String>,
    pub location: Option<String>,
    pub is_meeting: bool,
    pub is_recurring: bool,
    pub is_exception: bool,
    pub is_reminder_set: bool,
    pub is_private: bool,
}

/// Free/busy result for one mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendeeAvailability {
    pub mailbox: String,
    pub events: Vec<CalendarEvent>,
    pub merged_free_busy: Option<String>,
    /// Per-mailbox failure reported by the server
    pub error: Option<String>,
}
