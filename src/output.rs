//! Output formatting and persistence for stop results.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

use crate::model::StopResult;
use crate::source::StopResults;

/// Logs the next `limit` arrivals of a stop, one line each.
pub fn print_pretty(result: &StopResult, limit: usize) {
    info!(
        stop = %result.stop_id,
        name = result.stop_name.as_deref().unwrap_or("-"),
        count = result.count,
        "Stop"
    );
    for arrival in result.upcoming(limit) {
        info!(
            route = %arrival.route,
            destination = %arrival.destination,
            due = %arrival.due_time,
            "Arrival"
        );
    }
}

/// Renders all results as pretty-printed JSON.
pub fn to_json(results: &StopResults) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

#[derive(Debug, Serialize)]
struct ArrivalRow<'a> {
    fetched_at: DateTime<Utc>,
    stop_id: &'a str,
    stop_name: Option<&'a str>,
    route: &'a str,
    destination: &'a str,
    arrival_timestamp: f64,
    minutes_until: u32,
    due_time: &'a str,
}

/// Appends one CSV row per arrival of `result`.
///
/// Writes headers if the file is missing or still empty. A stop with no
/// arrivals writes nothing.
pub fn append_arrivals(path: &str, result: &StopResult) -> Result<()> {
    let file_exists = Path::new(path)
        .metadata()
        .map(|m| m.len() > 0)
        .unwrap_or(false);
    debug!(path, file_exists, rows = result.count, "Appending CSV rows");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for arrival in &result.arrivals {
        writer.serialize(ArrivalRow {
            fetched_at: result.last_update,
            stop_id: &result.stop_id,
            stop_name: result.stop_name.as_deref(),
            route: &arrival.route,
            destination: &arrival.destination,
            arrival_timestamp: arrival.arrival_timestamp,
            minutes_until: arrival.minutes_until,
            due_time: &arrival.due_time,
        })?;
    }
    writer.flush()?;

    Ok(())
}
