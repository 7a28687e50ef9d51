//! Decoders for the two upstream payloads.
//!
//! Both turn a response body into a flat list of [`FeedRecord`]s. A bad
//! top-level payload is a [`DecodeError`]; a bad individual record is logged
//! and dropped.

use prost::Message;
use serde::Deserialize;
use tracing::debug;

use crate::error::DecodeError;
use crate::gtfs_rt::FeedMessage;
use crate::gtfs_rt::trip_update::StopTimeEvent;
use crate::gtfs_rt::trip_update::stop_time_update::ScheduleRelationship;
use crate::model::{EventKind, FeedRecord};
use crate::normalize::parse_iso_time;

pub const UNKNOWN: &str = "Unknown";

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, DecodeError> {
    Ok(FeedMessage::decode(bytes)?)
}

/// Flattens every trip update into one record per stop-time update that
/// carries an absolute time.
pub fn feed_records(feed: &FeedMessage) -> Vec<FeedRecord> {
    let mut records = Vec::new();
    let mut untimed = 0usize;

    for entity in &feed.entity {
        if entity.is_deleted() {
            continue;
        }
        let Some(trip_update) = &entity.trip_update else {
            continue;
        };

        let route_id = trip_update
            .trip
            .route_id
            .clone()
            .unwrap_or_else(|| UNKNOWN.to_string());
        let headsign = trip_update
            .trip_properties
            .as_ref()
            .and_then(|p| p.trip_headsign.clone())
            .unwrap_or_else(|| UNKNOWN.to_string());

        for stu in &trip_update.stop_time_update {
            let Some(stop_id) = &stu.stop_id else {
                continue;
            };
            if stu.schedule_relationship() == ScheduleRelationship::Skipped {
                continue;
            }

            let (event, time) = match (
                absolute_time(stu.arrival.as_ref()),
                absolute_time(stu.departure.as_ref()),
            ) {
                (Some(t), _) => (EventKind::Arrival, t),
                (None, Some(t)) => (EventKind::Departure, t),
                (None, None) => {
                    untimed += 1;
                    continue;
                }
            };

            records.push(FeedRecord {
                trip_id: trip_update.trip.trip_id.clone(),
                route_id: route_id.clone(),
                stop_id: stop_id.clone(),
                headsign: headsign.clone(),
                event,
                time: time as f64,
            });
        }
    }

    debug!(
        entities = feed.entity.len(),
        records = records.len(),
        untimed,
        "Trip updates flattened"
    );
    records
}

/// Delay-only events carry no `time` (or a zero one) and are ignored.
fn absolute_time(event: Option<&StopTimeEvent>) -> Option<i64> {
    event.and_then(|e| e.time).filter(|&t| t > 0)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeparturesResponse {
    #[serde(default)]
    pub stop_departures: Vec<Departure>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Departure {
    pub service_number: Option<String>,
    pub destination: Option<String>,
    pub real_time_departure: Option<String>,
    pub scheduled_departure: Option<String>,
}

impl Departure {
    /// Real-time prediction when present, otherwise the timetable.
    fn time(&self) -> Option<&str> {
        self.real_time_departure
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.scheduled_departure.as_deref().filter(|s| !s.is_empty()))
    }
}

pub fn parse_departures(bytes: &[u8]) -> Result<DeparturesResponse, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// One record per departure with a parseable time, tagged with `stop_id`.
pub fn departure_records(response: &DeparturesResponse, stop_id: &str) -> Vec<FeedRecord> {
    response
        .stop_departures
        .iter()
        .filter_map(|dep| {
            let raw = dep.time()?;
            let time = match parse_iso_time(raw) {
                Ok(time) => time,
                Err(err) => {
                    debug!(stop = stop_id, error = %err, "Skipping departure with bad time");
                    return None;
                }
            };
            Some(FeedRecord {
                trip_id: None,
                route_id: dep
                    .service_number
                    .clone()
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                stop_id: stop_id.to_string(),
                headsign: dep
                    .destination
                    .clone()
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                event: EventKind::Departure,
                time,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::trip_update::{StopTimeUpdate, TripProperties};
    use crate::gtfs_rt::{FeedEntity, FeedHeader, TripDescriptor, TripUpdate};

    fn header() -> FeedHeader {
        FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(1_767_389_000),
            incrementality: None,
            feed_version: None,
        }
    }

    fn event(time: Option<i64>) -> Option<StopTimeEvent> {
        Some(StopTimeEvent {
            time,
            ..Default::default()
        })
    }

    fn stu(stop: &str, arrival: Option<i64>, departure: Option<i64>) -> StopTimeUpdate {
        StopTimeUpdate {
            stop_id: Some(stop.to_string()),
            arrival: arrival.and_then(|t| event(Some(t))),
            departure: departure.and_then(|t| event(Some(t))),
            ..Default::default()
        }
    }

    fn entity(id: &str, route: Option<&str>, updates: Vec<StopTimeUpdate>) -> FeedEntity {
        FeedEntity {
            id: id.to_string(),
            trip_update: Some(TripUpdate {
                trip: TripDescriptor {
                    trip_id: Some(format!("trip-{id}")),
                    route_id: route.map(str::to_string),
                    ..Default::default()
                },
                stop_time_update: updates,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_empty_bytes_returns_default_feed() {
        // An empty byte array decodes to a FeedMessage with default values
        let feed = parse_feed(&[]).unwrap();
        assert_eq!(feed.header.gtfs_realtime_version, "");
        assert!(feed.entity.is_empty());
    }

    #[test]
    fn test_parse_invalid_bytes() {
        let invalid_bytes = vec![0xFF, 0xFE, 0x00, 0x01];
        assert!(matches!(
            parse_feed(&invalid_bytes),
            Err(DecodeError::Protobuf(_))
        ));
    }

    #[test]
    fn test_parse_round_trips_trip_updates() {
        let feed = FeedMessage {
            header: header(),
            entity: vec![entity("1", Some("46A"), vec![stu("8220DB001192", Some(100), None)])],
        };
        let parsed = parse_feed(&feed.encode_to_vec()).unwrap();
        assert_eq!(parsed, feed);
    }

    #[test]
    fn test_arrival_preferred_over_departure() {
        let feed = FeedMessage {
            header: header(),
            entity: vec![entity(
                "1",
                Some("46A"),
                vec![
                    stu("A", Some(100), Some(160)),
                    stu("B", None, Some(220)),
                    stu("C", None, None),
                ],
            )],
        };

        let records = feed_records(&feed);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].stop_id, "A");
        assert_eq!(records[0].event, EventKind::Arrival);
        assert_eq!(records[0].time, 100.0);
        assert_eq!(records[1].stop_id, "B");
        assert_eq!(records[1].event, EventKind::Departure);
        assert_eq!(records[1].trip_id.as_deref(), Some("trip-1"));
    }

    #[test]
    fn test_zero_time_counts_as_absent() {
        let mut update = stu("A", None, Some(300));
        update.arrival = event(Some(0));
        let feed = FeedMessage {
            header: header(),
            entity: vec![entity("1", Some("46A"), vec![update])],
        };

        let records = feed_records(&feed);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event, EventKind::Departure);
        assert_eq!(records[0].time, 300.0);
    }

    #[test]
    fn test_missing_route_and_headsign_default_to_unknown() {
        let feed = FeedMessage {
            header: header(),
            entity: vec![entity("1", None, vec![stu("A", Some(100), None)])],
        };
        let records = feed_records(&feed);
        assert_eq!(records[0].route_id, UNKNOWN);
        assert_eq!(records[0].headsign, UNKNOWN);
    }

    #[test]
    fn test_headsign_from_trip_properties() {
        let mut e = entity("1", Some("39A"), vec![stu("A", Some(100), None)]);
        if let Some(tu) = e.trip_update.as_mut() {
            tu.trip_properties = Some(TripProperties {
                trip_headsign: Some("Ongar".into()),
                ..Default::default()
            });
        }
        let feed = FeedMessage {
            header: header(),
            entity: vec![e],
        };
        assert_eq!(feed_records(&feed)[0].headsign, "Ongar");
    }

    #[test]
    fn test_skipped_and_deleted_are_ignored() {
        let mut skipped = stu("A", Some(100), None);
        skipped.schedule_relationship = Some(ScheduleRelationship::Skipped as i32);
        let mut deleted = entity("2", Some("46A"), vec![stu("B", Some(100), None)]);
        deleted.is_deleted = Some(true);

        let feed = FeedMessage {
            header: header(),
            entity: vec![entity("1", Some("46A"), vec![skipped]), deleted],
        };
        assert!(feed_records(&feed).is_empty());
    }

    #[test]
    fn test_departures_prefer_real_time() {
        let body = br#"{"stopDepartures":[
            {"serviceNumber":"46A","destination":"Phoenix Park",
             "realTimeDeparture":"2026-01-02T21:40:00.000Z",
             "scheduledDeparture":"2026-01-02T21:37:00.000Z"},
            {"serviceNumber":"39A","destination":"Ongar",
             "realTimeDeparture":null,
             "scheduledDeparture":"2026-01-02T21:45:00.000+00:00"}
        ]}"#;
        let response = parse_departures(body).unwrap();
        let records = departure_records(&response, "8220DB001192");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].route_id, "46A");
        assert_eq!(records[0].time, parse_iso_time("2026-01-02T21:40:00Z").unwrap());
        assert_eq!(records[1].headsign, "Ongar");
        assert_eq!(records[1].time, parse_iso_time("2026-01-02T21:45:00Z").unwrap());
        assert!(records.iter().all(|r| r.stop_id == "8220DB001192"));
    }

    #[test]
    fn test_bad_departure_time_does_not_abort_others() {
        let body = br#"{"stopDepartures":[
            {"serviceNumber":"46A","realTimeDeparture":"not a time"},
            {"serviceNumber":"145"},
            {"serviceNumber":"39A","scheduledDeparture":"2026-01-02T21:45:00Z"}
        ]}"#;
        let response = parse_departures(body).unwrap();
        let records = departure_records(&response, "X");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].route_id, "39A");
        assert_eq!(records[0].headsign, UNKNOWN);
    }

    #[test]
    fn test_missing_departure_list_is_empty() {
        let response = parse_departures(b"{}").unwrap();
        assert!(response.stop_departures.is_empty());
        assert!(matches!(
            parse_departures(b"<html>"),
            Err(DecodeError::Json(_))
        ));
    }
}
