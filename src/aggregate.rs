//! Turns matched records into a sorted, display-ready [`StopResult`].

use chrono::{DateTime, Utc};

use crate::model::{Arrival, FeedRecord, RouteFilter, StopResult};
use crate::normalize::{displayed_minutes, due_label, raw_minutes_until};

/// Applies the route filter, drops departed records and sorts the rest by
/// arrival time. No matching records is an empty result, not an error.
pub fn build_stop_result<'a, I>(
    stop_id: &str,
    stop_name: Option<String>,
    records: I,
    routes: &RouteFilter,
    now: DateTime<Utc>,
) -> StopResult
where
    I: IntoIterator<Item = &'a FeedRecord>,
{
    let mut arrivals: Vec<Arrival> = records
        .into_iter()
        .filter(|record| routes.allows(&record.route_id))
        .filter_map(|record| to_arrival(record, now))
        .collect();

    arrivals.sort_by(|a, b| a.arrival_timestamp.total_cmp(&b.arrival_timestamp));

    StopResult {
        stop_id: stop_id.to_string(),
        stop_name,
        count: arrivals.len(),
        arrivals,
        last_update: now,
    }
}

fn to_arrival(record: &FeedRecord, now: DateTime<Utc>) -> Option<Arrival> {
    let raw = raw_minutes_until(record.time, now);
    let minutes_until = displayed_minutes(raw)?;

    Some(Arrival {
        route: record.route_id.clone(),
        destination: record.headsign.clone(),
        arrival_timestamp: record.time,
        minutes_until,
        due_time: due_label(raw),
    })
}
