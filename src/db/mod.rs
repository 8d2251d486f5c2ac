//! Database layer: adventure store access.
//!
//! [`AdventureDb`] is created once at startup, injected into the API state,
//! and closed after the server stops.

pub mod firestore;
pub mod memory;
pub mod query;

pub use self::firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::config::StoreBackend;
use crate::error::AppError;
use crate::models::{Adventure, AdventureCreate, AdventureQuery};
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const ADVENTURES: &str = "adventures";
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreStore),
    Memory(MemoryStore),
}

/// Handle to the adventure store.
#[derive(Clone)]
pub struct AdventureDb {
    backend: Backend,
}

impl AdventureDb {
    /// Open the configured backend.
    pub async fn connect(store: &StoreBackend) -> Result<Self, AppError> {
        let backend = match store {
            StoreBackend::Firestore { project_id } => {
                Backend::Firestore(FirestoreStore::new(project_id).await?)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory adventure store; data is lost on restart");
                Backend::Memory(MemoryStore::new())
            }
        };
        Ok(Self { backend })
    }

    /// Fresh, empty in-memory store.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryStore::new()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Firestore(_) => "firestore",
            Backend::Memory(_) => "memory",
        }
    }

    /// Insert a new adventure or fully replace the one with the same
    /// `unique_id`, stamping `last_seen_at`.
    ///
    /// `Ok(None)` means the store accepted the request but wrote no record.
    pub async fn upsert_adventure(
        &self,
        adventure: AdventureCreate,
    ) -> Result<Option<Adventure>, AppError> {
        let record = Adventure::from_create(adventure, Utc::now());
        match &self.backend {
            Backend::Firestore(store) => store.upsert(&record).await,
            Backend::Memory(store) => Ok(Some(store.upsert(record))),
        }
    }

    /// Filter, sort and paginate stored adventures.
    pub async fn list_adventures(&self, query: &AdventureQuery) -> Result<Vec<Adventure>, AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.list(query).await,
            Backend::Memory(store) => Ok(store.list(query)),
        }
    }

    /// Delete a provider's adventures last written before `before`.
    pub async fn sweep_stale(
        &self,
        provider_name: &str,
        before: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.sweep(provider_name, before).await,
            Backend::Memory(store) => Ok(store.sweep(provider_name, before)),
        }
    }

    /// Release the store. Clones held elsewhere stay usable until dropped.
    pub async fn close(self) {
        match self.backend {
            Backend::Firestore(store) => {
                drop(store);
                tracing::info!("Firestore client closed");
            }
            Backend::Memory(store) => {
                tracing::info!(records = store.len(), "In-memory store closed");
            }
        }
    }
}
