use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use tracing::{debug, info};

use super::{ArrivalSource, StopResults};
use crate::aggregate::build_stop_result;
use crate::error::Error;
use crate::fetch::auth::ApiKey;
use crate::fetch::{DEFAULT_TIMEOUT, HttpClient, fetch_bytes};
use crate::matcher::{MatchKind, MatchPolicy};
use crate::model::{FeedRecord, StopQuery};
use crate::parser::{feed_records, parse_feed};
use crate::rotator::CredentialRotator;

pub const API_KEY_HEADER: &str = "x-api-key";

/// GTFS-R trip updates: one protobuf download serves every configured stop.
pub struct GtfsRtSource<C> {
    client: C,
    url: Url,
    header: String,
    timeout: Duration,
    rotator: CredentialRotator,
    policy: MatchPolicy,
}

impl<C: HttpClient> GtfsRtSource<C> {
    pub fn new(client: C, url: Url, rotator: CredentialRotator) -> Self {
        Self {
            client,
            url,
            header: API_KEY_HEADER.to_string(),
            timeout: DEFAULT_TIMEOUT,
            rotator,
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn rotator(&self) -> &CredentialRotator {
        &self.rotator
    }

    fn matching<'a>(&self, stop: &StopQuery, records: &'a [FeedRecord]) -> Vec<&'a FeedRecord> {
        let (mut exact, mut suffix, mut substring) = (0usize, 0usize, 0usize);
        let matched: Vec<&FeedRecord> = records
            .iter()
            .filter(|record| match self.policy.matches(&stop.stop_id, &record.stop_id) {
                Some(MatchKind::Exact) => {
                    exact += 1;
                    true
                }
                Some(MatchKind::Suffix) => {
                    suffix += 1;
                    true
                }
                Some(MatchKind::Substring) => {
                    substring += 1;
                    true
                }
                None => false,
            })
            .collect();

        debug!(stop = %stop.stop_id, exact, suffix, substring, "Stop records matched");
        matched
    }
}

#[async_trait]
impl<C: HttpClient> ArrivalSource for GtfsRtSource<C> {
    #[tracing::instrument(skip_all, fields(stops = stops.len()))]
    async fn fetch(&mut self, stops: &[StopQuery], now: DateTime<Utc>) -> Result<StopResults, Error> {
        let client = &self.client;
        let url = &self.url;
        let header = self.header.as_str();
        let timeout = self.timeout;

        let bytes = self
            .rotator
            .with_active_credential(move |credential| async move {
                let auth = ApiKey::new(client, header, &credential)?;
                fetch_bytes(&auth, url, timeout).await
            })
            .await?;

        let feed = parse_feed(&bytes)?;
        let records = feed_records(&feed);

        let mut results = StopResults::new();
        for stop in stops {
            let matched = self.matching(stop, &records);
            let result = build_stop_result(&stop.stop_id, None, matched, &stop.routes, now);
            info!(stop = %stop.stop_id, count = result.count, "Stop arrivals ready");
            results.insert(stop.stop_id.clone(), result);
        }

        Ok(results)
    }
}
