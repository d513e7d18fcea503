//! Mutations against the remote registry.
//!
//! Each operation issues one remote mutation and, only when it succeeds,
//! fetches the whole record list again. The store is never patched locally:
//! applying a [`Synced`] result replaces its contents with exactly what the
//! remote store holds. A failed mutation has nothing to apply.
//!
//! None of these calls touch a [`RecordStore`] while a request is in flight,
//! so callers can run them without holding any lock on shared state.

use crate::errors::{AppError, ResultExt};
use crate::models::{PropertyDetails, PropertyRecord};
use crate::record_store::RecordStore;
use crate::registry_client::RegistryClient;

/// A mutation the remote store accepted, plus the reload that followed it.
#[derive(Debug)]
pub struct Synced<T> {
    pub value: T,
    /// Fresh record list, or why it could not be fetched.
    pub reload: Result<Vec<PropertyRecord>, AppError>,
}

impl<T> Synced<T> {
    /// Loads the fresh list into `store` when there is one.
    ///
    /// A failed reload leaves the store at its last-known-good contents and is
    /// handed back; the mutation itself still stands.
    pub fn apply(self, store: &mut RecordStore) -> (T, Option<AppError>) {
        match self.reload {
            Ok(records) => {
                store.load(records);
                (self.value, None)
            }
            Err(e) => {
                tracing::warn!("Keeping last loaded records: {}", e);
                (self.value, Some(e))
            }
        }
    }
}

#[derive(Clone)]
pub struct SyncClient {
    client: RegistryClient,
}

impl SyncClient {
    pub fn new(client: RegistryClient) -> Self {
        Self { client }
    }

    /// Current remote record list.
    pub async fn fetch_all(&self) -> Result<Vec<PropertyRecord>, AppError> {
        self.client
            .list_records()
            .await
            .context("Failed to load records from registry")
    }

    /// Submits a draft; the value is the id the remote store assigned to it.
    pub async fn create(&self, draft: &PropertyDetails) -> Result<Synced<i64>, AppError> {
        let id = self.client.create_record(draft).await?;
        let reload = self
            .fetch_all()
            .await
            .with_context(|| format!("Record {} was created but the reload failed", id));
        Ok(Synced { value: id, reload })
    }

    /// Replaces a record server-side.
    pub async fn update(&self, record: &PropertyRecord) -> Result<Synced<()>, AppError> {
        self.client
            .update_record(record)
            .await
            .with_context(|| format!("Failed to update record {}", record.id))?;
        let reload = self
            .fetch_all()
            .await
            .with_context(|| format!("Record {} was updated but the reload failed", record.id));
        Ok(Synced { value: (), reload })
    }

    pub async fn delete(&self, id: i64) -> Result<Synced<()>, AppError> {
        self.client
            .delete_record(id)
            .await
            .with_context(|| format!("Failed to delete record {}", id))?;
        let reload = self
            .fetch_all()
            .await
            .with_context(|| format!("Record {} was deleted but the reload failed", id));
        Ok(Synced { value: (), reload })
    }
}
