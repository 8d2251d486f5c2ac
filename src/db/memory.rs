// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local adventure store for development and tests.

use crate::db::query::apply_query;
use crate::models::{Adventure, AdventureQuery};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Adventures keyed by `unique_id`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    adventures: Arc<DashMap<String, Adventure>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace the record with the same `unique_id`.
    pub fn upsert(&self, adventure: Adventure) -> Adventure {
        self.adventures
            .insert(adventure.unique_id.clone(), adventure.clone());
        adventure
    }

    pub fn list(&self, query: &AdventureQuery) -> Vec<Adventure> {
        let snapshot: Vec<Adventure> = self
            .adventures
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        apply_query(snapshot, query)
    }

    /// Remove a provider's records last seen before `before`.
    pub fn sweep(&self, provider_name: &str, before: DateTime<Utc>) -> usize {
        let initial = self.adventures.len();
        self.adventures
            .retain(|_, a| !(a.provider_name == provider_name && a.last_seen_at < before));
        initial.saturating_sub(self.adventures.len())
    }

    pub fn len(&self) -> usize {
        self.adventures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adventures.is_empty()
    }
}
