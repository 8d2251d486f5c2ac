// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Page-at-a-time traversal of provider listings.
//!
//! A [`PageSource`] knows how to fetch one page; a [`Paginator`] decides
//! which page to ask for next and when the listing is exhausted.

use crate::ingest::error::FetchError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Which page to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page within the current batch
    pub page: u32,
    /// Only records whose cursor field is strictly greater than this
    pub after: Option<i64>,
}

/// One provider endpoint that returns pages of raw hits.
#[async_trait]
pub trait PageSource: Send {
    /// Provider label for logs and errors.
    fn name(&self) -> &'static str;

    async fn fetch_page(&mut self, request: PageRequest) -> Result<Vec<Value>, FetchError>;
}

#[async_trait]
impl<S: PageSource + ?Sized> PageSource for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn fetch_page(&mut self, request: PageRequest) -> Result<Vec<Value>, FetchError> {
        (**self).fetch_page(request).await
    }
}

/// When to stop asking for pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationPolicy {
    /// Stop at the first page with no hits.
    EmptyPage,
    /// Stop after this many pages (or an earlier empty page). Smoke tests only.
    FixedPages(u32),
    /// Page through batches; each new batch starts strictly after the largest
    /// `cursor_field` value of the previous one.
    TimeSliced { cursor_field: &'static str },
}

/// Drives a [`PageSource`] according to a [`PaginationPolicy`].
pub struct Paginator<S> {
    source: S,
    policy: PaginationPolicy,
    delay: Duration,
    page: u32,
    pages_fetched: u32,
    cursor: Option<i64>,
    batch_records: usize,
    batch_max: Option<i64>,
    finished: bool,
    capped: bool,
}

impl<S: PageSource> Paginator<S> {
    pub fn new(source: S, policy: PaginationPolicy, delay: Duration) -> Self {
        tracing::debug!(provider = source.name(), policy = ?policy, "Paginating");
        Self {
            source,
            policy,
            delay,
            page: 0,
            pages_fetched: 0,
            cursor: None,
            batch_records: 0,
            batch_max: None,
            finished: false,
            capped: false,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// True when traversal stopped because of a page cap rather than because
    /// the provider ran out of records.
    pub fn was_capped(&self) -> bool {
        self.capped
    }

    /// Fetch the next non-empty page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>, FetchError> {
        if self.finished {
            return Ok(None);
        }

        if let PaginationPolicy::FixedPages(limit) = self.policy {
            if self.pages_fetched >= limit {
                tracing::info!(
                    provider = self.source.name(),
                    pages = limit,
                    "Page limit reached"
                );
                self.capped = true;
                self.finished = true;
                return Ok(None);
            }
        }

        loop {
            let hits = self.fetch().await?;

            if !hits.is_empty() {
                if let PaginationPolicy::TimeSliced { cursor_field } = self.policy {
                    self.track_cursor(cursor_field, &hits);
                }
                self.page += 1;
                return Ok(Some(hits));
            }

            match self.policy {
                PaginationPolicy::EmptyPage | PaginationPolicy::FixedPages(_) => {
                    tracing::info!(
                        provider = self.source.name(),
                        page = self.page,
                        "No more records"
                    );
                    self.finished = true;
                    return Ok(None);
                }
                PaginationPolicy::TimeSliced { .. } => {
                    if !self.advance_batch() {
                        self.finished = true;
                        return Ok(None);
                    }
                }
            }
        }
    }

    async fn fetch(&mut self) -> Result<Vec<Value>, FetchError> {
        if self.pages_fetched > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let request = PageRequest {
            page: self.page,
            after: self.cursor,
        };
        tracing::debug!(
            provider = self.source.name(),
            page = request.page,
            after = ?request.after,
            "Fetching page"
        );

        let hits = self.source.fetch_page(request).await?;
        self.pages_fetched += 1;
        Ok(hits)
    }

    fn track_cursor(&mut self, cursor_field: &str, hits: &[Value]) {
        self.batch_records += hits.len();
        let page_max = hits
            .iter()
            .filter_map(|hit| hit.get(cursor_field).and_then(Value::as_i64))
            .max();
        self.batch_max = self.batch_max.max(page_max);
    }

    /// Start the next time slice. Returns false when traversal should stop.
    fn advance_batch(&mut self) -> bool {
        let provider = self.source.name();

        if self.batch_records == 0 {
            tracing::info!(provider, "Batch yielded no records; listing exhausted");
            return false;
        }

        let next = match (self.batch_max, self.cursor) {
            (Some(next), Some(current)) if next <= current => None,
            (next, _) => next,
        };
        let Some(next) = next else {
            tracing::warn!(
                provider,
                cursor = ?self.cursor,
                batch_max = ?self.batch_max,
                "Cursor did not advance; stopping"
            );
            return false;
        };

        tracing::info!(
            provider,
            batch_records = self.batch_records,
            after = next,
            "Starting next time slice"
        );
        self.cursor = Some(next);
        self.page = 0;
        self.batch_records = 0;
        self.batch_max = None;
        true
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::ScriptedSource;
    use super::*;
    use serde_json::json;

    fn hits(dates: &[i64]) -> Vec<Value> {
        dates.iter().map(|d| json!({ "startDate": d })).collect()
    }

    async fn drain<S: PageSource>(paginator: &mut Paginator<S>) -> Vec<Vec<Value>> {
        let mut pages = Vec::new();
        while let Some(page) = paginator.next_page().await.unwrap() {
            pages.push(page);
        }
        pages
    }

    #[tokio::test]
    async fn test_empty_page_policy_stops_on_first_empty_page() {
        let source = ScriptedSource::new(vec![hits(&[1, 2]), hits(&[3]), vec![], hits(&[4])]);
        let requests = source.requests.clone();
        let mut paginator = Paginator::new(source, PaginationPolicy::EmptyPage, Duration::ZERO);

        let pages = drain(&mut paginator).await;

        assert_eq!(pages.len(), 2);
        assert_eq!(paginator.pages_fetched(), 3);
        assert!(!paginator.was_capped());
        let pages_requested: Vec<u32> = requests.lock().unwrap().iter().map(|r| r.page).collect();
        assert_eq!(pages_requested, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_fixed_pages_policy_never_exceeds_limit() {
        let source = ScriptedSource::new(vec![hits(&[1]), hits(&[2]), hits(&[3])]);
        let mut paginator = Paginator::new(source, PaginationPolicy::FixedPages(2), Duration::ZERO);

        let pages = drain(&mut paginator).await;

        assert_eq!(pages.len(), 2);
        assert_eq!(paginator.pages_fetched(), 2);
        assert!(paginator.was_capped());
        // Exhausted paginators stay exhausted
        assert!(paginator.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_time_sliced_policy_advances_cursor_between_batches() {
        let source = ScriptedSource::new(vec![
            hits(&[10, 30]),
            hits(&[20]),
            vec![],
            // second batch, after 30
            hits(&[40, 50]),
            vec![],
            // third batch, after 50, is empty
            vec![],
        ]);
        let requests = source.requests.clone();
        let mut paginator = Paginator::new(
            source,
            PaginationPolicy::TimeSliced {
                cursor_field: "startDate",
            },
            Duration::ZERO,
        );

        let pages = drain(&mut paginator).await;

        assert_eq!(pages.len(), 3);
        let requests = requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![
                PageRequest { page: 0, after: None },
                PageRequest { page: 1, after: None },
                PageRequest { page: 2, after: None },
                PageRequest { page: 0, after: Some(30) },
                PageRequest { page: 1, after: Some(30) },
                PageRequest { page: 0, after: Some(50) },
            ]
        );
    }

    #[tokio::test]
    async fn test_time_sliced_policy_stops_when_cursor_stalls() {
        // A provider that ignores the cursor filter returns the same batch forever
        let source = ScriptedSource::new(vec![
            hits(&[10, 20]),
            vec![],
            hits(&[10, 20]),
            vec![],
            hits(&[10, 20]),
            vec![],
        ]);
        let mut paginator = Paginator::new(
            source,
            PaginationPolicy::TimeSliced {
                cursor_field: "startDate",
            },
            Duration::ZERO,
        );

        let pages = drain(&mut paginator).await;

        assert_eq!(pages.len(), 2);
        assert_eq!(paginator.pages_fetched(), 4);
    }

    #[tokio::test]
    async fn test_time_sliced_policy_stops_without_cursor_values() {
        let source = ScriptedSource::new(vec![vec![json!({ "name": "no date" })], vec![]]);
        let mut paginator = Paginator::new(
            source,
            PaginationPolicy::TimeSliced {
                cursor_field: "startDate",
            },
            Duration::ZERO,
        );

        let pages = drain(&mut paginator).await;

        assert_eq!(pages.len(), 1);
        assert_eq!(paginator.pages_fetched(), 2);
    }

    #[tokio::test]
    async fn test_fetch_errors_propagate() {
        let mut source = ScriptedSource::new(vec![hits(&[1])]);
        source.pages.push_back(Err(FetchError::Status {
            provider: "Scripted",
            status: 500,
            body: "boom".to_string(),
        }));
        let mut paginator = Paginator::new(source, PaginationPolicy::EmptyPage, Duration::ZERO);

        assert!(paginator.next_page().await.unwrap().is_some());
        assert!(matches!(
            paginator.next_page().await,
            Err(FetchError::Status { status: 500, .. })
        ));
    }
}
