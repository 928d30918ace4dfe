//! Exchange Web Services calendar client for getappt.
//!
//! Covers the three calls the tool needs: binding a user's calendar folder,
//! a calendar-view `FindItem`, and a batched `GetUserAvailability`.

pub mod client;
pub mod error;
pub mod soap;
pub mod types;
pub mod xml;

/// Target for raw SOAP request/response logging.
pub const TRACE_TARGET: &str = "ews_trace";

pub use client::{Credentials, EwsClient};
pub use error::EwsError;
pub use types::{
    Appointment, AttendeeAvailability, AvailabilityOptions, AvailabilityView, CalendarEvent,
    CalendarEventDetails, CalendarFolder, CalendarView, ExchangeVersion, FreeBusyStatus,
    TimeWindow,
};
