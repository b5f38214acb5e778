//! Persistence seam for the edit session

use async_trait::async_trait;

use crate::date_key::EntryDate;
use crate::models::Entry;
use crate::storage::StorageResult;

/// Where an edit session reads and writes entries
///
/// [`StoreHandle`](crate::store::StoreHandle) is the production
/// implementation; tests substitute in-memory fakes.
#[async_trait]
pub trait EntryRepository: Send + Sync + 'static {
    /// Create or replace the entry for `date`
    async fn save_entry(&self, date: &EntryDate, content: &str) -> StorageResult<Entry>;

    /// Fetch the entry for `date`, if one was ever saved
    async fn load_entry(&self, date: &EntryDate) -> StorageResult<Option<Entry>>;
}
