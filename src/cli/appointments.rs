use anyhow::{Context, Result};
use chrono::Utc;
use getappt_core::AppointmentsConfig;
use getappt_ews::{CalendarView, EwsClient, EwsError};

use crate::payload::{to_json, AppointmentRecord, UserAppointments};

pub async fn run(client: &EwsClient, users: &[String], config: &AppointmentsConfig) -> Result<String> {
    let view = CalendarView::upcoming(Utc::now(), config.days, config.max_entries)?;
    let appointments = collect(client, users, &view)
        .await
        .context("Failed to fetch appointments")?;
    Ok(to_json(&appointments)?)
}

/// Query each user's calendar in turn; the first failure aborts the run.
///
/// # Errors
///
/// Any error from binding a calendar or reading its view.
pub async fn collect(
    client: &EwsClient,
    users: &[String],
    view: &CalendarView,
) -> Result<Vec<UserAppointments>, EwsError> {
    let mut result = Vec::with_capacity(users.len());

    for user in users {
        let folder = client.bind_calendar(user).await?;
        let appointments = client.find_appointments(&folder, view).await?;

        tracing::info!(user = %user, count = appointments.len(), "Collected appointments");

        result.push(UserAppointments {
            username: user.clone(),
            appointments: appointments.into_iter().map(AppointmentRecord::from).collect(),
        });
    }

    Ok(result)
}

