use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{DemographicRecord, PreRegistrationId, StatusCode};

/// One page of a creator's records plus the size of the full result set.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<DemographicRecord>,
    pub total: usize,
}

/// Storage abstraction so the service can be exercised without a database.
pub trait DemographicRepository: Send + Sync {
    fn find_by_id(
        &self,
        id: &PreRegistrationId,
    ) -> Result<Option<DemographicRecord>, RepositoryError>;

    /// Records created by `creator`, skipping those in `exclude_status`.
    fn find_by_creator(
        &self,
        creator: &str,
        exclude_status: StatusCode,
    ) -> Result<Vec<DemographicRecord>, RepositoryError>;

    /// Same filter as [`find_by_creator`](Self::find_by_creator), ordered by creation time.
    fn find_by_creator_paged(
        &self,
        creator: &str,
        exclude_status: StatusCode,
        page: usize,
        size: usize,
    ) -> Result<RecordPage, RepositoryError>;

    fn find_by_status_in_and_ids_in(
        &self,
        statuses: &[StatusCode],
        ids: &[PreRegistrationId],
    ) -> Result<Vec<DemographicRecord>, RepositoryError>;

    fn save(&self, record: DemographicRecord) -> Result<DemographicRecord, RepositoryError>;

    /// Returns the number of rows removed.
    fn delete_by_id(&self, id: &PreRegistrationId) -> Result<usize, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record was modified concurrently")]
    Conflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Mutex-guarded map used by the API binary and the test-suite.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDemographicRepository {
    records: Arc<Mutex<HashMap<PreRegistrationId, DemographicRecord>>>,
}

impl InMemoryDemographicRepository {
    fn lock(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<PreRegistrationId, DemographicRecord>>, RepositoryError>
    {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }

    fn by_creator(
        &self,
        creator: &str,
        exclude_status: StatusCode,
    ) -> Result<Vec<DemographicRecord>, RepositoryError> {
        let guard = self.lock()?;
        let mut records: Vec<DemographicRecord> = guard
            .values()
            .filter(|record| record.created_by == creator && record.status != exclude_status)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DemographicRepository for InMemoryDemographicRepository {
    fn find_by_id(
        &self,
        id: &PreRegistrationId,
    ) -> Result<Option<DemographicRecord>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn find_by_creator(
        &self,
        creator: &str,
        exclude_status: StatusCode,
    ) -> Result<Vec<DemographicRecord>, RepositoryError> {
        self.by_creator(creator, exclude_status)
    }

    fn find_by_creator_paged(
        &self,
        creator: &str,
        exclude_status: StatusCode,
        page: usize,
        size: usize,
    ) -> Result<RecordPage, RepositoryError> {
        let all = self.by_creator(creator, exclude_status)?;
        let total = all.len();
        let records = all
            .into_iter()
            .skip(page.saturating_mul(size))
            .take(size)
            .collect();
        Ok(RecordPage { records, total })
    }

    fn find_by_status_in_and_ids_in(
        &self,
        statuses: &[StatusCode],
        ids: &[PreRegistrationId],
    ) -> Result<Vec<DemographicRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| guard.get(id))
            .filter(|record| statuses.contains(&record.status))
            .cloned()
            .collect())
    }

    fn save(&self, record: DemographicRecord) -> Result<DemographicRecord, RepositoryError> {
        self.lock()?.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn delete_by_id(&self, id: &PreRegistrationId) -> Result<usize, RepositoryError> {
        Ok(usize::from(self.lock()?.remove(id).is_some()))
    }
}
