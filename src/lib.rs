// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Adventure Aggregator: one searchable store for adventure travel departures
//!
//! This crate provides the aggregator API (upsert and filtered listing of
//! canonical adventure records) and the ingestion pipelines that scrape
//! provider search endpoints into it.

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod routes;
pub mod time_utils;

use config::Config;
use db::AdventureDb;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: AdventureDb,
}
