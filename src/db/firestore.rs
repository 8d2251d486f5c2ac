// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed adventure store.
//!
//! One document per adventure in the `adventures` collection, keyed by the
//! URL-encoded `unique_id`. Writes replace the whole document.

use crate::db::collections;
use crate::db::query::apply_query;
use crate::error::AppError;
use crate::models::{Adventure, AdventureQuery, SortColumn, SortOrder};
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use firestore::FirestoreQueryDirection;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    /// Connect to Firestore.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore emulator");

        Ok(Self { client })
    }

    /// Write the full record, replacing any document with the same id.
    ///
    /// Returns `None` when Firestore refuses the document itself (bad id,
    /// conflicting write) rather than failing to reach the database.
    pub async fn upsert(&self, adventure: &Adventure) -> Result<Option<Adventure>, AppError> {
        let result: Result<Adventure, FirestoreError> = self
            .client
            .fluent()
            .update()
            .in_col(collections::ADVENTURES)
            .document_id(document_id(&adventure.unique_id))
            .object(adventure)
            .execute()
            .await;

        match result {
            Ok(stored) => Ok(Some(stored)),
            Err(
                e @ (FirestoreError::InvalidParametersError(_)
                | FirestoreError::DataConflictError(_)),
            ) => {
                tracing::warn!(
                    unique_id = %adventure.unique_id,
                    error = %e,
                    "Firestore rejected adventure write"
                );
                Ok(None)
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Run a list query.
    ///
    /// Sorting and the range go to Firestore when possible. Substring filters
    /// and nullable sort columns are evaluated in process over the ordered
    /// collection, since Firestore has no substring operator and orders nulls
    /// first.
    pub async fn list(&self, query: &AdventureQuery) -> Result<Vec<Adventure>, AppError> {
        let mut select = self
            .client
            .fluent()
            .select()
            .from(collections::ADVENTURES);

        if let Some((column, order)) = query.sort {
            select = select.order_by([(column.field(), direction(order))]);
        }

        if can_push_down(query) {
            return select
                .offset(query.offset)
                .limit(query.limit)
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()));
        }

        let all: Vec<Adventure> = select
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(
            scanned = all.len(),
            "Evaluating adventure query in process"
        );

        Ok(apply_query(all, query))
    }

    /// Delete a provider's records last seen before `before`.
    pub async fn sweep(&self, provider_name: &str, before: DateTime<Utc>) -> Result<usize, AppError> {
        let records: Vec<Adventure> = self
            .client
            .fluent()
            .select()
            .from(collections::ADVENTURES)
            .filter(|q| q.for_all([q.field("provider_name").eq(provider_name)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let stale: Vec<Adventure> = records
            .into_iter()
            .filter(|a| a.last_seen_at < before)
            .collect();

        self.batch_delete(&stale).await?;

        tracing::info!(
            provider = provider_name,
            deleted = stale.len(),
            "Swept stale adventures"
        );
        Ok(stale.len())
    }

    /// Delete documents in transactional batches.
    async fn batch_delete(&self, adventures: &[Adventure]) -> Result<(), AppError> {
        for chunk in adventures.chunks(BATCH_SIZE) {
            let mut transaction = self
                .client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for adventure in chunk {
                self.client
                    .fluent()
                    .delete()
                    .from(collections::ADVENTURES)
                    .document_id(document_id(&adventure.unique_id))
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add deletion to transaction: {}", e))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Firestore document ids may not contain `/`.
fn document_id(unique_id: &str) -> String {
    urlencoding::encode(unique_id).into_owned()
}

fn direction(order: SortOrder) -> FirestoreQueryDirection {
    match order {
        SortOrder::Ascending => FirestoreQueryDirection::Ascending,
        SortOrder::Descending => FirestoreQueryDirection::Descending,
    }
}

/// Whether Firestore can evaluate the whole query with matching semantics.
fn can_push_down(query: &AdventureQuery) -> bool {
    !query.has_filters()
        && matches!(query.sort, None | Some((SortColumn::DepartureDate, _)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListParams;

    #[test]
    fn test_document_id_escapes_slashes() {
        assert_eq!(document_id("abc/2024-01-01"), "abc%2F2024-01-01");
        assert_eq!(document_id("T1-1700000000"), "T1-1700000000");
    }

    #[test]
    fn test_push_down_rules() {
        let default: AdventureQuery = ListParams::default().into();
        assert!(can_push_down(&default));

        let by_price: AdventureQuery = ListParams {
            sort_by: "price".to_string(),
            ..ListParams::default()
        }
        .into();
        assert!(!can_push_down(&by_price));

        let filtered: AdventureQuery = ListParams {
            location: Some("nepal".to_string()),
            ..ListParams::default()
        }
        .into();
        assert!(!can_push_down(&filtered));
    }
}
