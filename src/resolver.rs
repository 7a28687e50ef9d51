//! Short stop code to journey-planner stop resolution.
//!
//! The departures endpoint wants the planner's full stop id, name and type,
//! while users configure the number printed on the pole. Successful lookups
//! are memoized for the lifetime of the owning client; there is no expiry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopMetadata {
    pub full_id: String,
    pub name: String,
    pub stop_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest<'a> {
    pub query: &'a str,
    pub exclude_stop_area: bool,
    pub language: &'a str,
}

impl<'a> LookupRequest<'a> {
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            exclude_stop_area: false,
            language: "en",
        }
    }
}

/// One lookup candidate. Localities and stop areas often come back without
/// a name or id, so every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationItem {
    #[serde(default)]
    pub short_code: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl LocationItem {
    /// `None` unless the candidate carries everything a departures request needs.
    pub fn metadata(&self) -> Option<StopMetadata> {
        Some(StopMetadata {
            full_id: self.id.clone()?,
            name: self.name.clone()?,
            stop_type: self.kind.clone()?,
        })
    }
}

/// Picks the lookup result for `query`: an exact short code or id-suffix
/// match first, then any bus stop whose short code contains the query.
/// Incomplete candidates are never selected.
pub fn select_stop(query: &str, items: &[LocationItem]) -> Option<StopMetadata> {
    let candidates: Vec<(&LocationItem, StopMetadata)> = items
        .iter()
        .filter_map(|item| item.metadata().map(|meta| (item, meta)))
        .collect();

    candidates
        .iter()
        .find(|(item, meta)| {
            item.short_code.as_deref() == Some(query) || meta.full_id.ends_with(query)
        })
        .or_else(|| {
            candidates.iter().find(|(item, meta)| {
                meta.stop_type == "BUS_STOP"
                    && item
                        .short_code
                        .as_deref()
                        .is_some_and(|code| code.contains(query))
            })
        })
        .map(|(_, meta)| meta.clone())
}

#[derive(Debug, Default)]
pub struct StopCache(HashMap<String, StopMetadata>);

impl StopCache {
    pub fn get(&self, query: &str) -> Option<&StopMetadata> {
        self.0.get(query)
    }

    pub fn insert(&mut self, query: &str, meta: StopMetadata) -> &StopMetadata {
        self.0.entry(query.to_string()).or_insert(meta)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
