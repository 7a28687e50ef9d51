//! Upstream strategies. The transport format is picked when the client is
//! built; each implementation owns its credentials and any per-client state.

mod gtfs_rt;
mod journey_planner;

pub use gtfs_rt::GtfsRtSource;
pub use journey_planner::JourneyPlannerSource;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Error;
use crate::model::{StopQuery, StopResult};
use crate::resolver::StopMetadata;

pub type StopResults = BTreeMap<String, StopResult>;

#[async_trait]
pub trait ArrivalSource: Send {
    /// Fetches arrivals for every stop in `stops`, keyed by the configured
    /// stop id. Stops without matching records map to empty results.
    async fn fetch(&mut self, stops: &[StopQuery], now: DateTime<Utc>) -> Result<StopResults, Error>;

    /// Resolves a short stop code to upstream metadata, when the upstream
    /// has such a notion.
    async fn resolve_stop(&mut self, _query: &str) -> Result<Option<StopMetadata>, Error> {
        Ok(None)
    }
}
