// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider ingestion: fetch listings, map them to adventures, and hand
//! them to a sink.

pub mod algolia;
pub mod error;
pub mod paginate;
pub mod pipeline;
pub mod providers;
pub mod retry;
pub mod sink;

pub use error::{FetchError, IngestError, SinkError};
pub use paginate::{PageRequest, PageSource, PaginationPolicy, Paginator};
pub use pipeline::{run, RunSummary};
pub use providers::{MapError, Provider, ProviderRecord};
pub use sink::{ApiSink, CsvSink, Sink, Submission};
