// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Canonical adventure records and list query parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Default page size for list queries.
pub const DEFAULT_LIMIT: u32 = 20;
/// Upper bound on a single list page.
pub const MAX_LIMIT: u32 = 1000;

/// One concrete departure of a trip, as submitted by an ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdventureCreate {
    /// Provider-qualified identifier, unique per departure
    #[validate(length(min = 1, max = 512))]
    pub unique_id: String,
    #[validate(length(min = 1, max = 128))]
    pub provider_name: String,
    #[validate(length(min = 1, max = 512))]
    pub trip_name: String,
    #[validate(url)]
    pub url: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    /// ISO 4217 currency code
    #[validate(length(equal = 3))]
    pub currency: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub departure_date: DateTime<Utc>,
    /// Trip length in days
    pub duration: Option<u32>,
    pub location: Option<String>,
    pub activity_type: Option<String>,
}

/// Stored adventure record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Adventure {
    pub unique_id: String,
    pub provider_name: String,
    pub trip_name: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub currency: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub departure_date: DateTime<Utc>,
    pub duration: Option<u32>,
    pub location: Option<String>,
    pub activity_type: Option<String>,
    /// When an ingestion run last wrote this record
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub last_seen_at: DateTime<Utc>,
}

impl Adventure {
    /// Build the stored form of a submitted record.
    pub fn from_create(create: AdventureCreate, seen_at: DateTime<Utc>) -> Self {
        Self {
            unique_id: create.unique_id,
            provider_name: create.provider_name,
            trip_name: create.trip_name,
            url: create.url,
            image_url: create.image_url,
            price: create.price,
            currency: create.currency,
            departure_date: create.departure_date,
            duration: create.duration,
            location: create.location,
            activity_type: create.activity_type,
            last_seen_at: seen_at,
        }
    }
}

/// Columns that list queries may sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Price,
    Duration,
    DepartureDate,
}

impl SortColumn {
    /// Resolve a client-supplied column name against the allow-list.
    ///
    /// Unknown names return `None`, which disables sorting.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "price" => Some(SortColumn::Price),
            "duration" => Some(SortColumn::Duration),
            "departure_date" => Some(SortColumn::DepartureDate),
            _ => None,
        }
    }

    /// Field name in the store.
    pub fn field(self) -> &'static str {
        match self {
            SortColumn::Price => "price",
            SortColumn::Duration => "duration",
            SortColumn::DepartureDate => "departure_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Only `desc` (any case) sorts descending.
    pub fn parse(order: &str) -> Self {
        if order.eq_ignore_ascii_case("desc") {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }
}

/// Raw list parameters as they arrive on the query string.
#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_order")]
    pub order: String,
    pub activity_type: Option<String>,
    pub location: Option<String>,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}
fn default_sort_by() -> String {
    "departure_date".to_string()
}
fn default_order() -> String {
    "asc".to_string()
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort_by: default_sort_by(),
            order: default_order(),
            activity_type: None,
            location: None,
        }
    }
}

/// A validated list query, ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct AdventureQuery {
    pub limit: u32,
    pub offset: u32,
    pub sort: Option<(SortColumn, SortOrder)>,
    /// Lower-cased substring filter on `activity_type`
    pub activity_type: Option<String>,
    /// Lower-cased substring filter on `location`
    pub location: Option<String>,
}

impl AdventureQuery {
    pub fn has_filters(&self) -> bool {
        self.activity_type.is_some() || self.location.is_some()
    }
}

impl From<ListParams> for AdventureQuery {
    fn from(params: ListParams) -> Self {
        let order = SortOrder::parse(&params.order);
        let normalize = |filter: Option<String>| {
            filter
                .map(|f| f.trim().to_lowercase())
                .filter(|f| !f.is_empty())
        };

        Self {
            limit: params.limit.min(MAX_LIMIT),
            offset: params.offset,
            sort: SortColumn::parse(&params.sort_by).map(|column| (column, order)),
            activity_type: normalize(params.activity_type),
            location: normalize(params.location),
        }
    }
}

/// Request body for the staleness sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRequest {
    pub provider_name: String,
    pub seen_before: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SweepResponse {
    pub deleted: usize,
}
