use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{ArrivalSource, StopResults};
use crate::aggregate::build_stop_result;
use crate::error::Error;
use crate::fetch::auth::ApiKey;
use crate::fetch::{DEFAULT_TIMEOUT, HttpClient, post_json};
use crate::model::{StopQuery, StopResult};
use crate::parser::{departure_records, parse_departures};
use crate::resolver::{LocationItem, LookupRequest, StopCache, StopMetadata, select_stop};
use crate::rotator::CredentialRotator;

pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeparturesRequest<'a> {
    #[serde(rename = "clientTimeZoneOffsetInMS")]
    client_time_zone_offset_in_ms: i64,
    departure_date: &'a str,
    departure_or_arrival: &'static str,
    departure_time: &'a str,
    refresh: bool,
    request_time: &'a str,
    stop_ids: Vec<&'a str>,
    stop_name: &'a str,
    stop_type: &'a str,
}

impl<'a> DeparturesRequest<'a> {
    fn new(meta: &'a StopMetadata, timestamp: &'a str) -> Self {
        Self {
            client_time_zone_offset_in_ms: 0,
            departure_date: timestamp,
            departure_or_arrival: "DEPARTURE",
            departure_time: timestamp,
            refresh: false,
            request_time: timestamp,
            stop_ids: vec![meta.full_id.as_str()],
            stop_name: &meta.name,
            stop_type: &meta.stop_type,
        }
    }
}

/// Journey-planner JSON API: a stop lookup (cached) plus one departures call
/// per configured stop.
pub struct JourneyPlannerSource<C> {
    client: C,
    lookup_url: Url,
    departures_url: Url,
    header: String,
    timeout: Duration,
    rotator: CredentialRotator,
    cache: StopCache,
}

impl<C: HttpClient> JourneyPlannerSource<C> {
    pub fn new(client: C, lookup_url: Url, departures_url: Url, rotator: CredentialRotator) -> Self {
        Self {
            client,
            lookup_url,
            departures_url,
            header: SUBSCRIPTION_KEY_HEADER.to_string(),
            timeout: DEFAULT_TIMEOUT,
            rotator,
            cache: StopCache::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn rotator(&self) -> &CredentialRotator {
        &self.rotator
    }

    pub fn cached_stops(&self) -> usize {
        self.cache.len()
    }

    async fn lookup(&mut self, query: &str) -> Result<Option<StopMetadata>, Error> {
        if let Some(meta) = self.cache.get(query) {
            return Ok(Some(meta.clone()));
        }

        let client = &self.client;
        let url = &self.lookup_url;
        let header = self.header.as_str();
        let timeout = self.timeout;
        let body = &LookupRequest::new(query);

        let bytes = self
            .rotator
            .with_active_credential(move |credential| async move {
                let auth = ApiKey::new(client, header, &credential)?;
                post_json(&auth, url, body, timeout).await
            })
            .await?;

        let items: Vec<LocationItem> = serde_json::from_slice(&bytes)?;
        match select_stop(query, &items) {
            Some(meta) => {
                debug!(stop = query, full_id = %meta.full_id, name = %meta.name, "Stop resolved");
                Ok(Some(self.cache.insert(query, meta).clone()))
            }
            None => {
                warn!(stop = query, candidates = items.len(), "Stop code not found");
                Ok(None)
            }
        }
    }

    async fn departures(
        &mut self,
        stop: &StopQuery,
        meta: StopMetadata,
        now: DateTime<Utc>,
    ) -> Result<StopResult, Error> {
        let client = &self.client;
        let url = &self.departures_url;
        let header = self.header.as_str();
        let timeout = self.timeout;
        let timestamp = now.format("%Y-%m-%dT%H:%M:%S.000Z").to_string();
        let body = &DeparturesRequest::new(&meta, &timestamp);

        let bytes = self
            .rotator
            .with_active_credential(move |credential| async move {
                let auth = ApiKey::new(client, header, &credential)?;
                post_json(&auth, url, body, timeout).await
            })
            .await?;

        let response = parse_departures(&bytes)?;
        let records = departure_records(&response, &meta.full_id);
        Ok(build_stop_result(
            &stop.stop_id,
            Some(meta.name.clone()),
            &records,
            &stop.routes,
            now,
        ))
    }
}

#[async_trait]
impl<C: HttpClient> ArrivalSource for JourneyPlannerSource<C> {
    #[tracing::instrument(skip_all, fields(stops = stops.len()))]
    async fn fetch(&mut self, stops: &[StopQuery], now: DateTime<Utc>) -> Result<StopResults, Error> {
        let mut results = StopResults::new();

        for stop in stops {
            let result = match self.lookup(&stop.stop_id).await? {
                Some(meta) => self.departures(stop, meta, now).await?,
                None => StopResult::empty(&stop.stop_id, None, now),
            };
            info!(stop = %stop.stop_id, count = result.count, "Stop arrivals ready");
            results.insert(stop.stop_id.clone(), result);
        }

        Ok(results)
    }

    async fn resolve_stop(&mut self, query: &str) -> Result<Option<StopMetadata>, Error> {
        self.lookup(query).await
    }
}
