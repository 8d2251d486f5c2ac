// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Explore Share: guide-led trips with open group departures.

use super::{lenient_f64, lenient_string, lenient_u32, non_empty, null_as_default, MapError};
use crate::config::AlgoliaEnv;
use crate::ingest::algolia::{AlgoliaAuth, AlgoliaIndex};
use crate::models::AdventureCreate;
use crate::time_utils::{from_unix_seconds, parse_provider_date};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

pub const PROVIDER: &str = "Explore Share";

pub const ENV: AlgoliaEnv = AlgoliaEnv {
    app_id: "EXPLORE_SHARE_ALGOLIA_APP_ID",
    api_key: "EXPLORE_SHARE_ALGOLIA_API_KEY",
    url: "EXPLORE_SHARE_ALGOLIA_URL",
};

pub fn index() -> AlgoliaIndex {
    AlgoliaIndex {
        provider: PROVIDER,
        index_name: "es_searchable_posts_dato",
        auth: AlgoliaAuth::QueryString,
        hits_per_page: 50,
        params: vec![("filters", "trip_status:Active".to_string())],
        cursor_field: None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExploreShareTrip {
    #[serde(rename = "objectID", default, deserialize_with = "lenient_string")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub post_title: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub trip_currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub trip_extended_info_duration_in_days: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub taxonomies: Taxonomies,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Images,
    #[serde(default, deserialize_with = "null_as_default")]
    pub open_groups: Vec<OpenGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Taxonomies {
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub main_activity: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Images {
    #[serde(default)]
    pub medium: Option<ImageRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub url: Option<String>,
}

/// One scheduled group departure.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenGroup {
    /// Epoch seconds or a date string, depending on the trip
    #[serde(rename = "departureDate", default)]
    pub departure_date: Option<Value>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
}

impl ExploreShareTrip {
    pub fn into_adventures(self) -> Vec<Result<AdventureCreate, MapError>> {
        let object_id = non_empty(self.object_id.clone());
        let name = non_empty(self.post_title.clone());
        let currency = non_empty(self.trip_currency.clone()).map(|c| c.to_uppercase());
        let location = self.taxonomies.country.first().cloned();
        let activity_type = self.taxonomies.main_activity.first().cloned();
        let image_url = self.images.medium.as_ref().and_then(|m| m.url.clone());

        self.open_groups
            .iter()
            .map(|group| {
                let raw_date = group
                    .departure_date
                    .as_ref()
                    .map(date_label)
                    .unwrap_or_default();
                let Some(object_id) = object_id.as_deref() else {
                    return Err(MapError::MissingField {
                        provider: PROVIDER,
                        id: raw_date,
                        field: "objectID",
                    });
                };
                let unique_id = format!("{}-{}", object_id, raw_date);

                let Some(trip_name) = name.clone() else {
                    return Err(MapError::MissingField {
                        provider: PROVIDER,
                        id: unique_id,
                        field: "post_title",
                    });
                };
                let Some(currency) = currency.clone() else {
                    return Err(MapError::MissingField {
                        provider: PROVIDER,
                        id: unique_id,
                        field: "trip_currency",
                    });
                };
                let Some(departure_date) = group.departure_date.as_ref().and_then(departure_instant)
                else {
                    return Err(MapError::BadDate {
                        provider: PROVIDER,
                        id: unique_id,
                        value: raw_date,
                    });
                };

                Ok(AdventureCreate {
                    unique_id,
                    provider_name: PROVIDER.to_string(),
                    trip_name,
                    url: non_empty(self.permalink.clone()),
                    image_url: image_url.clone(),
                    price: group.price,
                    currency,
                    departure_date,
                    duration: self.trip_extended_info_duration_in_days,
                    location: location.clone(),
                    activity_type: activity_type.clone(),
                })
            })
            .collect()
    }
}

/// The departure date exactly as the provider sent it, for identifiers.
fn date_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn departure_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(from_unix_seconds),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok().and_then(from_unix_seconds)
            } else {
                parse_provider_date(s)
            }
        }
        _ => None,
    }
}
