//! Records flowing through one fetch cycle and the per-stop result.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Arrival,
    Departure,
}

/// One decoded stop visit. Lives only for the fetch cycle that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRecord {
    pub trip_id: Option<String>,
    pub route_id: String,
    pub stop_id: String,
    pub headsign: String,
    pub event: EventKind,
    pub time: f64,
}

/// Allow-list of route ids. Empty means every route is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteFilter(HashSet<String>);

impl RouteFilter {
    pub fn new<I, S>(routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(routes.into_iter().map(Into::into).collect())
    }

    pub fn allows(&self, route: &str) -> bool {
        self.0.is_empty() || self.0.contains(route)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopQuery {
    pub stop_id: String,
    pub routes: RouteFilter,
}

impl StopQuery {
    pub fn new(stop_id: impl Into<String>, routes: RouteFilter) -> Self {
        Self {
            stop_id: stop_id.into(),
            routes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arrival {
    pub route: String,
    pub destination: String,
    pub arrival_timestamp: f64,
    pub minutes_until: u32,
    pub due_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopResult {
    pub stop_id: String,
    pub stop_name: Option<String>,
    pub arrivals: Vec<Arrival>,
    pub count: usize,
    pub last_update: DateTime<Utc>,
}

impl StopResult {
    pub fn empty(stop_id: &str, stop_name: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            stop_id: stop_id.to_string(),
            stop_name,
            arrivals: Vec::new(),
            count: 0,
            last_update: now,
        }
    }

    /// The next `limit` arrivals, soonest first.
    pub fn upcoming(&self, limit: usize) -> &[Arrival] {
        &self.arrivals[..self.arrivals.len().min(limit)]
    }
}
