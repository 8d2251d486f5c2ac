// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Destinations for mapped adventures: a CSV snapshot or the aggregator API.

use crate::ingest::error::{is_transient_status, SinkError};
use crate::ingest::retry::{retry, RetryPolicy, Retryable};
use crate::models::{Adventure, AdventureCreate, SweepRequest, SweepResponse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome of offering one record to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    /// Not stored; the run continues
    Skipped(String),
}

/// Receives every mapped record of a run.
#[async_trait]
pub trait Sink: Send {
    /// Offer one record. An `Err` aborts the run.
    async fn submit(&mut self, adventure: AdventureCreate) -> Result<Submission, SinkError>;

    /// Called once after the provider is exhausted. Not called on abort.
    async fn finish(&mut self) -> Result<(), SinkError>;
}

/// Buffers a run and writes it as one CSV snapshot.
///
/// Records are de-duplicated by `unique_id` (the last one seen wins) and
/// written sorted by trip name, then departure date. The snapshot replaces
/// the file only when [`Sink::finish`] is reached, so an aborted run leaves
/// the previous snapshot in place.
pub struct CsvSink {
    path: PathBuf,
    records: Vec<AdventureCreate>,
    positions: HashMap<String, usize>,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_snapshot(&mut self) -> Result<usize, SinkError> {
        self.records.sort_by(|a, b| {
            a.trip_name
                .cmp(&b.trip_name)
                .then(a.departure_date.cmp(&b.departure_date))
        });

        let mut staging = self.path.clone().into_os_string();
        staging.push(".partial");
        let staging = PathBuf::from(staging);

        let mut writer = csv::Writer::from_path(&staging)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        drop(writer);

        std::fs::rename(&staging, &self.path)?;
        Ok(self.records.len())
    }
}

#[async_trait]
impl Sink for CsvSink {
    async fn submit(&mut self, adventure: AdventureCreate) -> Result<Submission, SinkError> {
        match self.positions.get(&adventure.unique_id) {
            Some(&index) => {
                tracing::debug!(unique_id = %adventure.unique_id, "Replacing duplicate");
                self.records[index] = adventure;
            }
            None => {
                self.positions
                    .insert(adventure.unique_id.clone(), self.records.len());
                self.records.push(adventure);
            }
        }
        Ok(Submission::Accepted)
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        if self.records.is_empty() {
            tracing::warn!(path = %self.path.display(), "No records; snapshot not written");
            return Ok(());
        }

        let rows = self.write_snapshot()?;
        tracing::info!(path = %self.path.display(), rows, "Wrote CSV snapshot");
        Ok(())
    }
}

/// Failure of one call to the aggregator API.
#[derive(Debug)]
enum ApiCallError {
    Transport(reqwest::Error),
    Status { status: u16, body: String },
    /// 200 with a body that is not the expected JSON
    Decode(reqwest::Error),
}

impl fmt::Display for ApiCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiCallError::Transport(e) => write!(f, "{}", e),
            ApiCallError::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            ApiCallError::Decode(e) => write!(f, "undecodable response: {}", e),
        }
    }
}

impl Retryable for ApiCallError {
    fn is_retryable(&self) -> bool {
        match self {
            ApiCallError::Transport(e) => e.is_timeout() || e.is_connect(),
            ApiCallError::Status { status, .. } => is_transient_status(*status),
            ApiCallError::Decode(_) => false,
        }
    }
}

impl ApiCallError {
    fn into_sink_error(self) -> SinkError {
        match self {
            ApiCallError::Transport(e) => SinkError::Unreachable(e.to_string()),
            ApiCallError::Status { status, body } => SinkError::Api { status, body },
            ApiCallError::Decode(e) => SinkError::Response(e.to_string()),
        }
    }
}

/// Upserts each record through `POST /adventures/`.
///
/// Tracks the earliest `last_seen_at` the server stamped during this sink's
/// run, which is the sweep cutoff. Use one sink per run.
pub struct ApiSink {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    first_seen_at: Option<DateTime<Utc>>,
}

impl ApiSink {
    pub fn new(http: reqwest::Client, api_url: &str, retry: RetryPolicy) -> Self {
        Self {
            http,
            base_url: api_url.trim_end_matches('/').to_string(),
            retry,
            first_seen_at: None,
        }
    }

    /// Server time of the first record accepted in this run.
    pub fn first_seen_at(&self) -> Option<DateTime<Utc>> {
        self.first_seen_at
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiCallError>
    where
        B: serde::Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(ApiCallError::Transport)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ApiCallError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response.json().await.map_err(ApiCallError::Decode)
    }

    /// Delete this provider's records that this run did not refresh.
    ///
    /// The cutoff is the server's own stamp on the first accepted record, so
    /// clock skew between this host and the server cannot reach records
    /// written by the run. Returns `None` without contacting the server when
    /// nothing was accepted.
    pub async fn sweep(&self, provider_name: &str) -> Result<Option<usize>, SinkError> {
        let Some(seen_before) = self.first_seen_at else {
            tracing::warn!(
                provider = provider_name,
                "No adventures accepted in this run; skipping sweep"
            );
            return Ok(None);
        };

        let request = SweepRequest {
            provider_name: provider_name.to_string(),
            seen_before,
        };

        let response: SweepResponse = retry(&self.retry, "sweep", || {
            self.post_json("/adventures/sweep", &request)
        })
        .await
        .map_err(ApiCallError::into_sink_error)?;

        tracing::info!(
            provider = provider_name,
            seen_before = %seen_before,
            deleted = response.deleted,
            "Swept stale adventures"
        );
        Ok(Some(response.deleted))
    }
}

#[async_trait]
impl Sink for ApiSink {
    async fn submit(&mut self, adventure: AdventureCreate) -> Result<Submission, SinkError> {
        if adventure.unique_id.trim().is_empty() {
            tracing::warn!(trip = %adventure.trip_name, "Skipping adventure without unique_id");
            return Ok(Submission::Skipped("missing unique_id".to_string()));
        }
        if adventure.price.is_none() {
            tracing::warn!(unique_id = %adventure.unique_id, "Skipping adventure without price");
            return Ok(Submission::Skipped("missing price".to_string()));
        }

        let result: Result<Adventure, ApiCallError> =
            retry(&self.retry, "upsert", || {
                self.post_json("/adventures/", &adventure)
            })
            .await;

        match result {
            Ok(stored) => {
                tracing::debug!(unique_id = %adventure.unique_id, "Upserted");
                self.first_seen_at = Some(match self.first_seen_at {
                    Some(seen) => seen.min(stored.last_seen_at),
                    None => stored.last_seen_at,
                });
                Ok(Submission::Accepted)
            }
            Err(ApiCallError::Status { status, body }) => {
                tracing::warn!(
                    unique_id = %adventure.unique_id,
                    status,
                    body = %body,
                    "Upsert rejected"
                );
                Ok(Submission::Skipped(format!("HTTP {}", status)))
            }
            Err(ApiCallError::Decode(e)) => {
                tracing::warn!(
                    unique_id = %adventure.unique_id,
                    error = %e,
                    "Upsert response not understood"
                );
                Ok(Submission::Skipped("undecodable response".to_string()))
            }
            Err(ApiCallError::Transport(e)) => {
                tracing::error!(unique_id = %adventure.unique_id, error = %e, "Aggregator API unreachable");
                Err(SinkError::Unreachable(e.to_string()))
            }
        }
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
