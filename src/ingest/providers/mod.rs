// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supported providers and the mapping of their raw records onto
//! [`AdventureCreate`].
//!
//! Each provider decodes its hits into its own typed record. The tagged
//! [`ProviderRecord`] has exactly one conversion per variant, so every
//! provider ends up producing the same canonical shape.

pub mod explore_share;
pub mod g_adventures;
pub mod mapo_tapo;
pub mod much_better;

use crate::config::{AlgoliaCredentials, AlgoliaEnv, ConfigError, IngestConfig};
use crate::ingest::algolia::{AlgoliaIndex, AlgoliaSource};
use crate::ingest::paginate::{PageSource, PaginationPolicy};
use crate::models::AdventureCreate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A provider the ingest CLI knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Provider {
    ExploreShare,
    GAdventures,
    MapoTapo,
    MuchBetterAdventures,
}

impl Provider {
    /// `provider_name` stamped on every record.
    pub fn label(self) -> &'static str {
        match self {
            Provider::ExploreShare => explore_share::PROVIDER,
            Provider::GAdventures => g_adventures::PROVIDER,
            Provider::MapoTapo => mapo_tapo::PROVIDER,
            Provider::MuchBetterAdventures => much_better::PROVIDER,
        }
    }

    /// Snapshot file written by the CSV sink when no path is given.
    pub fn default_csv_path(self) -> &'static str {
        match self {
            Provider::ExploreShare => "explore_share_departures.csv",
            Provider::GAdventures => "g_adventures_departures.csv",
            Provider::MapoTapo => "mapotapo_calendar_trips.csv",
            Provider::MuchBetterAdventures => "mba_departures.csv",
        }
    }

    pub fn default_policy(self) -> PaginationPolicy {
        match self {
            Provider::MuchBetterAdventures => PaginationPolicy::TimeSliced {
                cursor_field: much_better::CURSOR_FIELD,
            },
            _ => PaginationPolicy::EmptyPage,
        }
    }

    /// Build the page source for this provider, reading its credentials.
    pub fn source(
        self,
        http: reqwest::Client,
        config: &IngestConfig,
    ) -> Result<Box<dyn PageSource>, ConfigError> {
        match self {
            Provider::ExploreShare => {
                algolia_source(http, config, &explore_share::ENV, explore_share::index())
            }
            Provider::GAdventures => {
                algolia_source(http, config, &g_adventures::ENV, g_adventures::index())
            }
            Provider::MuchBetterAdventures => {
                algolia_source(http, config, &much_better::ENV, much_better::index())
            }
            Provider::MapoTapo => Ok(Box::new(mapo_tapo::MapoTapoSource::new(
                http,
                config.mapo_tapo_url.clone(),
                config.retry.clone(),
            ))),
        }
    }
}

fn algolia_source(
    http: reqwest::Client,
    config: &IngestConfig,
    env: &AlgoliaEnv,
    index: AlgoliaIndex,
) -> Result<Box<dyn PageSource>, ConfigError> {
    let credentials = AlgoliaCredentials::from_env(env)?;
    Ok(Box::new(AlgoliaSource::new(
        http,
        credentials,
        index,
        config.retry.clone(),
    )))
}

/// A raw hit decoded into its provider's typed form.
#[derive(Debug, Clone)]
pub enum ProviderRecord {
    ExploreShare(explore_share::ExploreShareTrip),
    GAdventures(g_adventures::GAdventuresTrip),
    MapoTapo(mapo_tapo::MapoTapoRow),
    MuchBetterAdventures(much_better::MbaDeparture),
}

impl ProviderRecord {
    /// Decode one hit. Failure here is a parse fault for the whole hit.
    pub fn decode(provider: Provider, hit: Value) -> Result<Self, MapError> {
        let decode_err = |e: serde_json::Error| MapError::Decode {
            provider: provider.label(),
            message: e.to_string(),
        };

        Ok(match provider {
            Provider::ExploreShare => {
                ProviderRecord::ExploreShare(serde_json::from_value(hit).map_err(decode_err)?)
            }
            Provider::GAdventures => {
                ProviderRecord::GAdventures(serde_json::from_value(hit).map_err(decode_err)?)
            }
            Provider::MapoTapo => {
                ProviderRecord::MapoTapo(serde_json::from_value(hit).map_err(decode_err)?)
            }
            Provider::MuchBetterAdventures => ProviderRecord::MuchBetterAdventures(
                serde_json::from_value(hit).map_err(decode_err)?,
            ),
        })
    }

    /// One entry per departure; a trip without departures yields none.
    pub fn into_adventures(self) -> Vec<Result<AdventureCreate, MapError>> {
        match self {
            ProviderRecord::ExploreShare(trip) => trip.into_adventures(),
            ProviderRecord::GAdventures(trip) => trip.into_adventures(),
            ProviderRecord::MapoTapo(row) => vec![row.into_adventure()],
            ProviderRecord::MuchBetterAdventures(departure) => vec![departure.into_adventure()],
        }
    }
}

/// A record or departure that could not be mapped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MapError {
    #[error("Malformed {provider} record: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} record {id} is missing {field}")]
    MissingField {
        provider: &'static str,
        id: String,
        field: &'static str,
    },

    #[error("{provider} record {id} has unusable departure date {value:?}")]
    BadDate {
        provider: &'static str,
        id: String,
        value: String,
    },
}

/// Trimmed, non-empty text or `None`.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Join non-empty parts with `", "`; `None` when nothing remains.
pub(crate) fn join_non_empty(parts: &[String]) -> Option<String> {
    let parts: Vec<&str> = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

// Provider payloads are loosely typed: numbers arrive as strings, lists
// arrive as null. These deserializers accept either and never fail.

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite()))
}

pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| value_as_i64(&v)))
}

pub(crate) fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(|v| value_as_i64(&v))
        .and_then(|v| u32::try_from(v).ok()))
}

/// Whole numbers from JSON numbers or numeric strings; fractions truncate.
pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}
