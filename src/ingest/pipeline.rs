// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One ingestion run: paginate a provider, map each hit, feed the sink.

use crate::ingest::error::IngestError;
use crate::ingest::paginate::{PageSource, Paginator};
use crate::ingest::providers::{Provider, ProviderRecord};
use crate::ingest::sink::{Sink, Submission};
use serde::Serialize;
use std::fmt;

/// Counters reported at the end of every run, including aborted ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub provider: &'static str,
    pub pages: u32,
    /// Raw hits returned by the provider
    pub records: usize,
    /// Hits that could not be decoded at all
    pub parse_faults: usize,
    /// Departures that decoded but could not be mapped
    pub dropped: usize,
    pub offered: usize,
    pub accepted: usize,
    pub skipped: usize,
    /// Stopped by a page cap rather than by exhausting the provider
    pub capped: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} pages, {} records ({} parse faults, {} dropped departures); \
             {} offered, {} accepted, {} skipped",
            self.provider,
            self.pages,
            self.records,
            self.parse_faults,
            self.dropped,
            self.offered,
            self.accepted,
            self.skipped
        )?;
        if self.capped {
            write!(f, " [page limit reached]")?;
        }
        Ok(())
    }
}

/// Run `provider` to exhaustion (or its page cap) into `sink`.
///
/// Malformed records are counted and skipped. A fetch fault that survives
/// retries, or a fatal sink error, aborts the run without calling
/// [`Sink::finish`].
pub async fn run<S, K>(
    provider: Provider,
    paginator: &mut Paginator<S>,
    sink: &mut K,
) -> Result<RunSummary, IngestError>
where
    S: PageSource,
    K: Sink + ?Sized,
{
    let mut summary = RunSummary {
        provider: provider.label(),
        ..RunSummary::default()
    };
    tracing::info!(
        provider = summary.provider,
        source = paginator.source_name(),
        "Starting ingestion run"
    );

    let outcome = drain(provider, paginator, sink, &mut summary).await;
    summary.pages = paginator.pages_fetched();
    summary.capped = paginator.was_capped();

    match outcome {
        Ok(()) => {
            tracing::info!(
                provider = summary.provider,
                pages = summary.pages,
                records = summary.records,
                parse_faults = summary.parse_faults,
                dropped = summary.dropped,
                offered = summary.offered,
                accepted = summary.accepted,
                skipped = summary.skipped,
                capped = summary.capped,
                "Ingestion run complete"
            );
            Ok(summary)
        }
        Err(e) => {
            tracing::error!(
                provider = summary.provider,
                pages = summary.pages,
                records = summary.records,
                accepted = summary.accepted,
                error = %e,
                "Ingestion run aborted"
            );
            Err(e)
        }
    }
}

async fn drain<S, K>(
    provider: Provider,
    paginator: &mut Paginator<S>,
    sink: &mut K,
    summary: &mut RunSummary,
) -> Result<(), IngestError>
where
    S: PageSource,
    K: Sink + ?Sized,
{
    while let Some(hits) = paginator.next_page().await? {
        summary.records += hits.len();

        for hit in hits {
            let record = match ProviderRecord::decode(provider, hit) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed record");
                    summary.parse_faults += 1;
                    continue;
                }
            };

            for mapped in record.into_adventures() {
                let adventure = match mapped {
                    Ok(adventure) => adventure,
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping departure");
                        summary.dropped += 1;
                        continue;
                    }
                };

                summary.offered += 1;
                match sink.submit(adventure).await? {
                    Submission::Accepted => summary.accepted += 1,
                    Submission::Skipped(_) => summary.skipped += 1,
                }
            }
        }
    }

    sink.finish().await?;
    Ok(())
}
