//! Client configuration.
//!
//! Stored as a JSON object on disk; every field is optional there and can
//! also come from the environment:
//! ```json
//! {
//!   "feed": "gtfs-rt",
//!   "api_keys": ["primary-key", "secondary-key"],
//!   "stops": "1192, 4495",
//!   "route_filters": ["46A"]
//! }
//! ```
//! List fields take either a JSON array or a comma-separated string.

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Deserializer};

use crate::error::Error;
use crate::matcher::MatchPolicy;
use crate::model::{RouteFilter, StopQuery};
use crate::rotator::{Credential, CredentialRotator};

pub const DEFAULT_TRIP_UPDATES_URL: &str = "https://api.nationaltransport.ie/gtfsr/v2/TripUpdates";
pub const DEFAULT_LOOKUP_URL: &str =
    "https://api-lts.transportforireland.ie/lts/lts/v1/public/locationLookup";
pub const DEFAULT_DEPARTURES_URL: &str =
    "https://api-lts.transportforireland.ie/lts/lts/v1/public/departures";

pub const ENV_API_KEYS: &str = "RTPI_API_KEYS";
pub const ENV_STOPS: &str = "RTPI_STOPS";
pub const ENV_ROUTES: &str = "RTPI_ROUTES";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FeedKind {
    /// GTFS-Realtime protobuf trip updates
    #[default]
    GtfsRt,
    /// Journey-planner JSON lookup + departures
    JourneyPlanner,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RtpiConfig {
    pub feed: FeedKind,
    #[serde(deserialize_with = "list")]
    pub api_keys: Vec<String>,
    #[serde(deserialize_with = "list")]
    pub stops: Vec<String>,
    #[serde(deserialize_with = "list")]
    pub route_filters: Vec<String>,
    pub timeout_secs: u64,
    pub trip_updates_url: String,
    pub lookup_url: String,
    pub departures_url: String,
    pub suffix_match: bool,
    pub substring_match: bool,
}

impl Default for RtpiConfig {
    fn default() -> Self {
        Self {
            feed: FeedKind::default(),
            api_keys: Vec::new(),
            stops: Vec::new(),
            route_filters: Vec::new(),
            timeout_secs: 10,
            trip_updates_url: DEFAULT_TRIP_UPDATES_URL.to_string(),
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
            departures_url: DEFAULT_DEPARTURES_URL.to_string(),
            suffix_match: true,
            substring_match: true,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrString {
    List(Vec<String>),
    Joined(String),
}

fn list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match ListOrString::deserialize(deserializer)? {
        ListOrString::List(items) => clean(items),
        ListOrString::Joined(joined) => parse_list(&joined),
    })
}

/// Splits a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_list(value: &str) -> Vec<String> {
    clean(value.split(',').map(str::to_string))
}

fn clean(items: impl IntoIterator<Item = String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl RtpiConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {path}: {e}")))?;
        serde_json::from_str(&content).map_err(|e| Error::Config(format!("{path}: {e}")))
    }

    /// Fills empty list fields from `RTPI_API_KEYS`, `RTPI_STOPS` and
    /// `RTPI_ROUTES`.
    pub fn with_env(mut self) -> Self {
        for (var, field) in [
            (ENV_API_KEYS, &mut self.api_keys),
            (ENV_STOPS, &mut self.stops),
            (ENV_ROUTES, &mut self.route_filters),
        ] {
            if !field.is_empty() {
                continue;
            }
            if let Ok(value) = std::env::var(var) {
                *field = parse_list(&value);
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.api_keys.is_empty() {
            return Err(Error::Config("at least one API key is required".into()));
        }
        if self.stops.is_empty() {
            return Err(Error::Config("at least one stop id is required".into()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// One query per distinct stop, in configured order, sharing the route
    /// filter.
    pub fn stop_queries(&self) -> Vec<StopQuery> {
        let routes = RouteFilter::new(self.route_filters.iter().cloned());
        let mut queries: Vec<StopQuery> = Vec::with_capacity(self.stops.len());
        for stop in &self.stops {
            if !queries.iter().any(|q| &q.stop_id == stop) {
                queries.push(StopQuery::new(stop.clone(), routes.clone()));
            }
        }
        queries
    }

    pub fn rotator(&self) -> Result<CredentialRotator, Error> {
        CredentialRotator::new(self.api_keys.iter().map(|k| Credential::from(k.as_str())).collect())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn match_policy(&self) -> MatchPolicy {
        MatchPolicy {
            suffix: self.suffix_match,
            substring: self.substring_match,
        }
    }
}

pub fn parse_url(value: &str) -> Result<Url, Error> {
    Url::parse(value).map_err(|e| Error::Config(format!("invalid url {value:?}: {e}")))
}
