use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use getappt_core::AvailabilityConfig;
use getappt_ews::{AvailabilityOptions, AvailabilityView, EwsClient, EwsError, TimeWindow};

use crate::payload::{to_json, AvailabilityReport};

pub async fn run(client: &EwsClient, users: &[String], config: &AvailabilityConfig) -> Result<String> {
    let now = Utc::now();
    let options = options_for(now, config)?;
    let report = collect(client, users, &options, now)
        .await
        .context("Failed to fetch availability")?;
    Ok(to_json(&report)?)
}

/// Query options for a run started at `now`.
///
/// # Errors
///
/// Fails when the configured view name is unknown.
pub fn options_for(
    now: DateTime<Utc>,
    config: &AvailabilityConfig,
) -> Result<AvailabilityOptions, EwsError> {
    Ok(AvailabilityOptions {
        window: TimeWindow::whole_days(now, config.days_ahead, config.window_days)?,
        view: config.view.parse::<AvailabilityView>()?,
        merged_interval_minutes: config.merged_interval_minutes,
    })
}

/// One batched free/busy query for all users.
///
/// # Errors
///
/// Request-level failures. Per-user failures are carried in the report.
pub async fn collect(
    client: &EwsClient,
    users: &[String],
    options: &AvailabilityOptions,
    queried_at: DateTime<Utc>,
) -> Result<AvailabilityReport, EwsError> {
    let results = client.get_user_availability(users, options).await?;

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    tracing::info!(users = results.len(), failed, "Collected availability");

    Ok(AvailabilityReport::new(queried_at, options.window, results))
}
