// src/schedule.rs
// =============================================================================
// Cron support for running the checks periodically.
//
// The `cron` crate wants a seconds field; classic five-field crontab lines
// ("0 3 * * *") are accepted too and fire at second 0.
// =============================================================================

use chrono::Utc;
use cron::Schedule;
use std::str::FromStr;
use std::time::Duration;

pub fn parse(spec: &str) -> Result<Schedule, cron::error::Error> {
    let spec = spec.trim();
    if spec.split_whitespace().count() == 5 {
        Schedule::from_str(&format!("0 {}", spec))
    } else {
        Schedule::from_str(spec)
    }
}

/// Time left until the next run, or None if the schedule never fires again.
pub fn until_next(schedule: &Schedule) -> Option<Duration> {
    let next = schedule.upcoming(Utc).next()?;
    Some((next - Utc::now()).to_std().unwrap_or_default())
}
