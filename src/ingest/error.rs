// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ingestion error types.

use crate::config::ConfigError;
use crate::ingest::retry::Retryable;

/// A provider request that did not produce a page of hits.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request to {provider} failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from {provider}: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            FetchError::Status { status, .. } => is_transient_status(*status),
            FetchError::Decode { .. } => false,
        }
    }
}

/// A sink failure that ends the run.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Aggregator API unreachable: {0}")]
    Unreachable(String),

    #[error("Aggregator API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response from aggregator API: {0}")]
    Response(String),

    #[error("Failed to write CSV snapshot: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Rate limiting and server-side failures are worth another attempt.
pub fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
