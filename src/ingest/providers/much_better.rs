// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Much Better Adventures: the departures index already holds one hit per
//! departure. Listings are deep, so traversal is time-sliced on `startDate`.

use super::{
    join_non_empty, lenient_f64, lenient_i64, lenient_string, lenient_u32, non_empty,
    null_as_default, MapError,
};
use crate::config::AlgoliaEnv;
use crate::ingest::algolia::{AlgoliaAuth, AlgoliaIndex};
use crate::models::AdventureCreate;
use crate::time_utils::from_unix_seconds;
use serde::Deserialize;

pub const PROVIDER: &str = "Much Better Adventures";

/// Numeric field the time-sliced traversal advances on.
pub const CURSOR_FIELD: &str = "startDate";

const SITE_BASE: &str = "https://www.muchbetteradventures.com";

pub const ENV: AlgoliaEnv = AlgoliaEnv {
    app_id: "MBA_ALGOLIA_APP_ID",
    api_key: "MBA_ALGOLIA_API_KEY",
    url: "MBA_ALGOLIA_URL",
};

pub fn index() -> AlgoliaIndex {
    let mut params = vec![("clickAnalytics", "true".to_string())];
    for facet in ["country", "departureMonth", "difficulty", "duration", "priceGBP"] {
        params.push(("facets", facet.to_string()));
    }
    params.push(("tagFilters", String::new()));

    AlgoliaIndex {
        provider: PROVIDER,
        index_name: "prod_products__by_departure",
        auth: AlgoliaAuth::Headers,
        hits_per_page: 48,
        params,
        cursor_field: Some(CURSOR_FIELD),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MbaDeparture {
    #[serde(rename = "objectID", default, deserialize_with = "lenient_string")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "startDate", default, deserialize_with = "lenient_i64")]
    pub start_date: Option<i64>,
    #[serde(rename = "priceGBP", default, deserialize_with = "lenient_f64")]
    pub price_gbp: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub duration: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub activity: Vec<String>,
    /// Site-relative path
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image: Option<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub url: Option<String>,
}

impl MbaDeparture {
    pub fn into_adventure(self) -> Result<AdventureCreate, MapError> {
        let unique_id = self.object_id.unwrap_or_default();
        if unique_id.trim().is_empty() {
            return Err(MapError::MissingField {
                provider: PROVIDER,
                id: unique_id,
                field: "objectID",
            });
        }

        let Some(trip_name) = non_empty(self.name) else {
            return Err(MapError::MissingField {
                provider: PROVIDER,
                id: unique_id,
                field: "name",
            });
        };
        let Some(departure_date) = self.start_date.and_then(from_unix_seconds) else {
            return Err(MapError::BadDate {
                provider: PROVIDER,
                id: unique_id,
                value: self.start_date.map(|d| d.to_string()).unwrap_or_default(),
            });
        };

        Ok(AdventureCreate {
            unique_id,
            provider_name: PROVIDER.to_string(),
            trip_name,
            url: non_empty(self.url).map(|path| format!("{}{}", SITE_BASE, path)),
            image_url: self.image.and_then(|i| non_empty(i.url)),
            price: self.price_gbp,
            currency: "GBP".to_string(),
            departure_date,
            duration: self.duration,
            location: self.country.into_iter().next(),
            activity_type: join_non_empty(&self.activity),
        })
    }
}
