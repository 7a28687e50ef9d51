//! The pull-based entry point.
//!
//! [`RtpiClient`] owns one configured [`ArrivalSource`] and the stop list.
//! It never schedules itself; callers decide when to [`fetch`](RtpiClient::fetch).
//! `fetch` takes `&mut self`, so one instance can only have one fetch in
//! flight.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::{FeedKind, RtpiConfig, parse_url};
use crate::error::{Error, FetchError};
use crate::fetch::BasicClient;
use crate::model::StopQuery;
use crate::resolver::StopMetadata;
use crate::source::{ArrivalSource, GtfsRtSource, JourneyPlannerSource, StopResults};

pub struct RtpiClient {
    source: Box<dyn ArrivalSource>,
    stops: Vec<StopQuery>,
}

impl RtpiClient {
    pub fn new(source: Box<dyn ArrivalSource>, stops: Vec<StopQuery>) -> Result<Self, Error> {
        if stops.is_empty() {
            return Err(Error::Config("at least one stop id is required".into()));
        }
        Ok(Self { source, stops })
    }

    /// Builds the source selected by `config.feed` on top of a plain
    /// `reqwest` transport.
    pub fn from_config(config: &RtpiConfig) -> Result<Self, Error> {
        config.validate()?;

        let http = BasicClient::new().map_err(FetchError::from)?;
        let rotator = config.rotator()?;

        let source: Box<dyn ArrivalSource> = match config.feed {
            FeedKind::GtfsRt => Box::new(
                GtfsRtSource::new(http, parse_url(&config.trip_updates_url)?, rotator)
                    .with_timeout(config.timeout())
                    .with_match_policy(config.match_policy()),
            ),
            FeedKind::JourneyPlanner => Box::new(
                JourneyPlannerSource::new(
                    http,
                    parse_url(&config.lookup_url)?,
                    parse_url(&config.departures_url)?,
                    rotator,
                )
                .with_timeout(config.timeout()),
            ),
        };

        info!(
            feed = ?config.feed,
            stops = config.stops.len(),
            keys = config.api_keys.len(),
            "RTPI client configured"
        );
        Self::new(source, config.stop_queries())
    }

    pub fn stops(&self) -> &[StopQuery] {
        &self.stops
    }

    pub async fn fetch(&mut self) -> Result<StopResults, Error> {
        self.fetch_at(Utc::now()).await
    }

    /// Same as [`fetch`](Self::fetch) with an explicit reference time.
    pub async fn fetch_at(&mut self, now: DateTime<Utc>) -> Result<StopResults, Error> {
        self.source.fetch(&self.stops, now).await
    }

    pub async fn resolve_stop(&mut self, query: &str) -> Result<Option<StopMetadata>, Error> {
        self.source.resolve_stop(query).await
    }
}
