// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Algolia multi-query search client.
//!
//! Three of the providers expose their public search through Algolia. Each
//! request posts `{"requests": [{"indexName", "params"}]}` and reads the hits
//! of the first result.

use crate::config::AlgoliaCredentials;
use crate::ingest::error::FetchError;
use crate::ingest::paginate::{PageRequest, PageSource};
use crate::ingest::retry::{retry, RetryPolicy};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Where the provider's front end puts its search-only key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgoliaAuth {
    /// `x-algolia-*` request headers
    Headers,
    /// `x-algolia-*` query-string parameters
    QueryString,
}

/// One provider's index and fixed search parameters.
#[derive(Debug, Clone)]
pub struct AlgoliaIndex {
    pub provider: &'static str,
    pub index_name: &'static str,
    pub auth: AlgoliaAuth,
    pub hits_per_page: u32,
    /// Parameters sent with every page; keys may repeat
    pub params: Vec<(&'static str, String)>,
    /// Numeric field used for `numericFilters={field}>{after}` when a
    /// time-slice cursor is set
    pub cursor_field: Option<&'static str>,
}

#[derive(Deserialize)]
struct MultiQueryResponse {
    results: Vec<QueryResult>,
}

#[derive(Deserialize)]
struct QueryResult {
    #[serde(default)]
    hits: Vec<Value>,
}

/// [`PageSource`] backed by an Algolia index.
pub struct AlgoliaSource {
    http: reqwest::Client,
    credentials: AlgoliaCredentials,
    index: AlgoliaIndex,
    retry: RetryPolicy,
}

impl AlgoliaSource {
    pub fn new(
        http: reqwest::Client,
        credentials: AlgoliaCredentials,
        index: AlgoliaIndex,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            credentials,
            index,
            retry,
        }
    }

    /// URL-encoded `params` string for one page.
    pub fn params_for(&self, request: PageRequest) -> String {
        let mut params: Vec<(&str, String)> = self
            .index
            .params
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        params.push(("hitsPerPage", self.index.hits_per_page.to_string()));
        params.push(("page", request.page.to_string()));

        if let (Some(field), Some(after)) = (self.index.cursor_field, request.after) {
            params.push(("numericFilters", format!("{}>{}", field, after)));
        }

        encode_params(&params)
    }

    async fn post_query(&self, body: &Value) -> Result<Vec<Value>, FetchError> {
        let provider = self.index.provider;
        let mut request = self.http.post(&self.credentials.endpoint).json(body);

        request = match self.index.auth {
            AlgoliaAuth::Headers => request
                .header("x-algolia-api-key", &self.credentials.api_key)
                .header("x-algolia-application-id", &self.credentials.app_id),
            AlgoliaAuth::QueryString => request.query(&[
                ("x-algolia-agent", "Algolia for JavaScript"),
                ("x-algolia-api-key", self.credentials.api_key.as_str()),
                ("x-algolia-application-id", self.credentials.app_id.as_str()),
            ]),
        };

        let response = request
            .send()
            .await
            .map_err(|source| FetchError::Transport { provider, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MultiQueryResponse =
            response.json().await.map_err(|e| FetchError::Decode {
                provider,
                message: e.to_string(),
            })?;

        parsed
            .results
            .into_iter()
            .next()
            .map(|result| result.hits)
            .ok_or_else(|| FetchError::Decode {
                provider,
                message: "response contained no results".to_string(),
            })
    }
}

#[async_trait]
impl PageSource for AlgoliaSource {
    fn name(&self) -> &'static str {
        self.index.provider
    }

    async fn fetch_page(&mut self, request: PageRequest) -> Result<Vec<Value>, FetchError> {
        let body = json!({
            "requests": [{
                "indexName": self.index.index_name,
                "params": self.params_for(request),
            }]
        });

        let hits = retry(&self.retry, self.index.provider, || self.post_query(&body)).await?;

        tracing::info!(
            provider = self.index.provider,
            page = request.page,
            hits = hits.len(),
            "Fetched page"
        );
        Ok(hits)
    }
}

/// Join key/value pairs into a query string, encoding values.
pub fn encode_params(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
