// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ingest CLI: scrape one provider into the aggregator API or a CSV snapshot.

use adventure_aggregator::config::IngestConfig;
use adventure_aggregator::ingest::{
    pipeline, ApiSink, CsvSink, IngestError, PageSource, PaginationPolicy, Paginator, Provider,
    RunSummary, Sink,
};
use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    /// Upsert each record through the aggregator API
    Api,
    /// Write one CSV snapshot per run
    Csv,
}

#[derive(Debug, Parser)]
#[command(name = "ingest", about = "Scrape a provider into the adventure aggregator")]
struct Arguments {
    /// Provider to scrape
    #[arg(value_enum)]
    provider: Provider,
    /// Where mapped records go
    #[arg(long, value_enum, default_value_t = SinkKind::Api)]
    sink: SinkKind,
    /// CSV snapshot path (defaults to a per-provider file name)
    #[arg(short, long, value_name = "path")]
    output: Option<PathBuf>,
    /// Aggregator API base URL (overrides AGGREGATOR_API_URL)
    #[arg(long, value_name = "url")]
    api_url: Option<String>,
    /// Stop after this many provider pages (smoke testing)
    #[arg(long, value_name = "n")]
    max_pages: Option<u32>,
    /// After a complete run, delete this provider's records not seen in it
    #[arg(long)]
    sweep: bool,
}

#[tokio::main]
async fn main() {
    init_logging();

    let args = Arguments::parse();
    match run(args).await {
        Ok(summary) => println!("{}", summary),
        Err(error) => {
            eprintln!("ingest: {:#}", error);
            process::exit(1);
        }
    }
}

async fn run(args: Arguments) -> anyhow::Result<RunSummary> {
    if args.sweep && args.sink != SinkKind::Api {
        bail!("--sweep requires --sink api");
    }

    let (config, http, source) = prepare(args.provider, args.api_url)
        .with_context(|| format!("configuring {}", args.provider.label()))?;

    let policy = match args.max_pages {
        Some(pages) => PaginationPolicy::FixedPages(pages),
        None => args.provider.default_policy(),
    };
    let mut paginator = Paginator::new(source, policy, config.request_delay);

    match args.sink {
        SinkKind::Csv => {
            let path = args
                .output
                .unwrap_or_else(|| PathBuf::from(args.provider.default_csv_path()));
            let mut sink = CsvSink::new(path);
            let summary = ingest(args.provider, &mut paginator, &mut sink).await?;
            println!("Snapshot: {}", sink.path().display());
            Ok(summary)
        }
        SinkKind::Api => {
            let mut sink = ApiSink::new(http, &config.api_url, config.retry.clone());
            let summary = ingest(args.provider, &mut paginator, &mut sink).await?;

            if args.sweep {
                if summary.capped {
                    tracing::warn!("Run was capped by --max-pages; skipping sweep");
                } else {
                    let deleted = sink
                        .sweep(args.provider.label())
                        .await
                        .context("sweeping stale adventures")?;
                    if let Some(deleted) = deleted {
                        println!("Swept {} stale adventures", deleted);
                    }
                }
            }
            Ok(summary)
        }
    }
}

/// Load configuration and build the provider source.
fn prepare(
    provider: Provider,
    api_url: Option<String>,
) -> Result<(IngestConfig, reqwest::Client, Box<dyn PageSource>), IngestError> {
    let mut config = IngestConfig::from_env()?;
    if let Some(api_url) = api_url {
        config.api_url = api_url;
    }

    let http = config.http_client()?;
    let source = provider.source(http.clone(), &config)?;
    Ok((config, http, source))
}

async fn ingest<S, K>(
    provider: Provider,
    paginator: &mut Paginator<S>,
    sink: &mut K,
) -> anyhow::Result<RunSummary>
where
    S: PageSource,
    K: Sink,
{
    pipeline::run(provider, paginator, sink)
        .await
        .with_context(|| format!("ingesting {}", provider.label()))
}

/// Human-readable logs for interactive runs.
fn init_logging() {
    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("adventure_aggregator=info,warn")),
        )
        .init();
}
