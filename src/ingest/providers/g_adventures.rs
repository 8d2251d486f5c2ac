// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! G Adventures: one trip dossier per hit, with a list of departure
//! timestamps and per-departure GBP prices.

use super::{
    join_non_empty, lenient_f64, lenient_i64, lenient_string, lenient_u32, non_empty,
    null_as_default, MapError,
};
use crate::config::AlgoliaEnv;
use crate::ingest::algolia::{AlgoliaAuth, AlgoliaIndex};
use crate::models::AdventureCreate;
use crate::time_utils::from_unix_seconds;
use serde::Deserialize;
use std::collections::HashMap;

pub const PROVIDER: &str = "G Adventures";

const TRIP_URL_BASE: &str = "https://www.gadventures.com/trips/";

pub const ENV: AlgoliaEnv = AlgoliaEnv {
    app_id: "G_ADVENTURES_ALGOLIA_APP_ID",
    api_key: "G_ADVENTURES_ALGOLIA_API_KEY",
    url: "G_ADVENTURES_ALGOLIA_URL",
};

pub fn index() -> AlgoliaIndex {
    AlgoliaIndex {
        provider: PROVIDER,
        index_name: "wwwtrips_en",
        auth: AlgoliaAuth::Headers,
        hits_per_page: 50,
        params: vec![
            ("clickAnalytics", "true".to_string()),
            (
                "facets",
                r#"["destinations","duration","travelStyle"]"#.to_string(),
            ),
            ("filters", "departureDates>0".to_string()),
            ("query", String::new()),
        ],
        cursor_field: None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GAdventuresTrip {
    #[serde(rename = "objectID", default, deserialize_with = "lenient_string")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub destinations: Vec<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub duration: Option<u32>,
    #[serde(rename = "travelStyle", default)]
    pub travel_style: Option<String>,
    /// Departure instants, epoch seconds
    #[serde(rename = "departureDates", default, deserialize_with = "null_as_default")]
    pub departure_dates: Vec<i64>,
    #[serde(rename = "pricesGBP", default, deserialize_with = "null_as_default")]
    pub prices_gbp: Vec<DeparturePrice>,
    #[serde(rename = "advertisedPriceGBP", default)]
    pub advertised_price_gbp: Option<Amount>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Images,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeparturePrice {
    #[serde(rename = "startDate", default, deserialize_with = "lenient_i64")]
    pub start_date: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Amount {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Images {
    #[serde(rename = "LARGE_SQUARE", default)]
    pub large_square: Option<String>,
}

impl GAdventuresTrip {
    pub fn into_adventures(self) -> Vec<Result<AdventureCreate, MapError>> {
        let object_id = non_empty(self.object_id.clone());
        let name = non_empty(self.name.clone());
        let default_price = self.advertised_price_gbp.as_ref().and_then(|a| a.amount);
        let prices: HashMap<i64, f64> = self
            .prices_gbp
            .iter()
            .filter_map(|p| Some((p.start_date?, p.amount?)))
            .collect();
        let url = non_empty(self.slug.clone()).map(|slug| format!("{}{}", TRIP_URL_BASE, slug));
        let location = join_non_empty(&self.destinations);

        self.departure_dates
            .iter()
            .map(|&timestamp| {
                let Some(object_id) = object_id.as_deref() else {
                    return Err(MapError::MissingField {
                        provider: PROVIDER,
                        id: timestamp.to_string(),
                        field: "objectID",
                    });
                };
                let unique_id = format!("{}-{}", object_id, timestamp);

                let Some(trip_name) = name.clone() else {
                    return Err(MapError::MissingField {
                        provider: PROVIDER,
                        id: unique_id,
                        field: "name",
                    });
                };
                let Some(departure_date) = from_unix_seconds(timestamp) else {
                    return Err(MapError::BadDate {
                        provider: PROVIDER,
                        id: unique_id,
                        value: timestamp.to_string(),
                    });
                };

                Ok(AdventureCreate {
                    unique_id,
                    provider_name: PROVIDER.to_string(),
                    trip_name,
                    url: url.clone(),
                    image_url: self.images.large_square.clone(),
                    price: prices.get(&timestamp).copied().or(default_price),
                    currency: "GBP".to_string(),
                    departure_date,
                    duration: self.duration,
                    location: location.clone(),
                    activity_type: non_empty(self.travel_style.clone()),
                })
            })
            .collect()
    }
}
