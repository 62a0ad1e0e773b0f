use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::crypto::{content_hash, CryptoError, PayloadCipher};
use super::domain::{DemographicRecord, PreRegistrationId, StatusCode};
use super::dto::{
    ApplicationStatusView, ApplicationSummary, ApplicationsPage, DeletionResult,
    DemographicRequest, DemographicResponse, PreRegIdsFilter, STATUS_NOT_UPDATED, STATUS_UPDATED,
};
use super::envelope::{format_timestamp, ids, MainRequest, MainResponse};
use super::identity::{IdentityError, IdentityMapping, IdentityValidator};
use super::remote::{BookingClient, DocumentClient, RemoteError};
use super::repository::{DemographicRepository, RepositoryError};
use crate::config::DemographicConfig;

const MAX_ID_ATTEMPTS: usize = 5;
const BATCH_STATUSES: [StatusCode; 2] = [StatusCode::Booked, StatusCode::Expired];
/// Document service code for "no documents uploaded for this application".
const DOCUMENTS_MISSING: &str = "PRG_PAM_DOC_005";
/// Booking service code for "no booking held for this application".
const BOOKING_MISSING: &str = "PRG_BOOK_RCI_013";

/// Source of fresh pre-registration identifiers.
pub trait PridGenerator: Send + Sync {
    fn generate(&self) -> PreRegistrationId;
}

/// Fourteen-digit identifiers with a non-zero leading digit.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPridGenerator;

impl PridGenerator for RandomPridGenerator {
    fn generate(&self) -> PreRegistrationId {
        let value: u64 = rand::thread_rng().gen_range(10_000_000_000_000..100_000_000_000_000);
        PreRegistrationId(value.to_string())
    }
}

/// Runtime knobs for the service.
#[derive(Debug, Clone)]
pub struct DemographicSettings {
    pub version: String,
    pub page_size: usize,
    pub mapping: IdentityMapping,
}

impl DemographicSettings {
    pub fn from_config(config: &DemographicConfig) -> Result<Self, IdentityError> {
        Ok(Self {
            version: config.version.clone(),
            page_size: config.page_size,
            mapping: IdentityMapping::load(config.identity_mapping_path.as_deref())?,
        })
    }
}

/// Orchestrates the application lifecycle across the store, crypto, and remote services.
pub struct DemographicService<R, B, D> {
    repository: Arc<R>,
    booking: Arc<B>,
    documents: Arc<D>,
    cipher: Arc<dyn PayloadCipher>,
    validator: Arc<dyn IdentityValidator>,
    ids: Arc<dyn PridGenerator>,
    settings: DemographicSettings,
}

impl<R, B, D> DemographicService<R, B, D>
where
    R: DemographicRepository + 'static,
    B: BookingClient + 'static,
    D: DocumentClient + 'static,
{
    pub fn new(
        repository: Arc<R>,
        booking: Arc<B>,
        documents: Arc<D>,
        cipher: Arc<dyn PayloadCipher>,
        validator: Arc<dyn IdentityValidator>,
        settings: DemographicSettings,
    ) -> Self {
        Self {
            repository,
            booking,
            documents,
            cipher,
            validator,
            ids: Arc::new(RandomPridGenerator),
            settings,
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn PridGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn settings(&self) -> &DemographicSettings {
        &self.settings
    }

    /// Validate, encrypt, and store a new application in `Pending_Appointment`.
    pub fn create(
        &self,
        request: MainRequest<DemographicRequest>,
        actor: &str,
    ) -> Result<MainResponse<DemographicResponse>, DemographicError> {
        self.check_envelope(&request, ids::CREATE)?;
        let details = self.validated_details(&request.request)?;
        let id = self.next_id()?;
        let now = Utc::now();
        let (applicant_detail, detail_hash) = self.seal(&details, now)?;

        let record = DemographicRecord {
            id,
            created_by: actor.to_string(),
            created_at: now,
            updated_by: None,
            updated_at: None,
            status: StatusCode::PendingAppointment,
            lang_code: request.request.lang_code.clone(),
            applicant_detail,
            detail_hash,
            encrypted_at: now,
        };
        let stored = self.repository.save(record)?;
        info!(pre_registration_id = %stored.id, actor, "application created");

        Ok(self.respond(ids::CREATE, view(&stored, Some(details))))
    }

    /// Replace the demographic details of an existing application, keeping its status.
    pub fn update(
        &self,
        id: &PreRegistrationId,
        request: MainRequest<DemographicRequest>,
        actor: &str,
    ) -> Result<MainResponse<DemographicResponse>, DemographicError> {
        self.check_envelope(&request, ids::UPDATE)?;
        let details = self.validated_details(&request.request)?;
        let mut record = self.require(id)?;

        let now = Utc::now();
        let (applicant_detail, detail_hash) = self.seal(&details, now)?;
        record.applicant_detail = applicant_detail;
        record.detail_hash = detail_hash;
        record.encrypted_at = now;
        record.lang_code = request.request.lang_code.clone();
        record.updated_by = Some(actor.to_string());
        record.updated_at = Some(now);

        let stored = self.repository.save(record)?;
        info!(pre_registration_id = %stored.id, actor, "application details updated");

        Ok(self.respond(ids::UPDATE, view(&stored, Some(details))))
    }

    /// Fetch an application. The integrity check runs whether or not details are returned.
    pub fn fetch(
        &self,
        id: &PreRegistrationId,
        include_details: bool,
    ) -> Result<MainResponse<DemographicResponse>, DemographicError> {
        let record = self.require(id)?;
        let details = self.open(&record)?;
        let operation = if include_details {
            ids::RETRIEVE_DETAILS
        } else {
            ids::RETRIEVE_BASIC
        };
        Ok(self.respond(operation, view(&record, include_details.then_some(details))))
    }

    pub fn application_status(
        &self,
        id: &PreRegistrationId,
        actor: &str,
    ) -> Result<MainResponse<ApplicationStatusView>, DemographicError> {
        let record = self.require(id)?;
        self.open(&record)?;
        debug!(pre_registration_id = %id, actor, status = %record.status, "status retrieved");
        Ok(self.respond(
            ids::RETRIEVE_STATUS,
            ApplicationStatusView {
                pre_registration_id: record.id,
                status_code: record.status,
            },
        ))
    }

    /// List a creator's open applications one page at a time.
    ///
    /// Booking lookups are best-effort: a failed lookup leaves `booking_metadata`
    /// empty for that row and the rest of the page is still returned.
    pub async fn list_by_creator(
        &self,
        creator: &str,
        page_index: &str,
    ) -> Result<MainResponse<ApplicationsPage>, DemographicError> {
        let page = page_index.trim().parse::<usize>().map_err(|_| {
            DemographicError::IllegalArgument(format!(
                "pageIndex '{page_index}' is not a non-negative integer"
            ))
        })?;

        let slice = self.repository.find_by_creator_paged(
            creator,
            StatusCode::Consumed,
            page,
            self.settings.page_size,
        )?;
        if slice.total == 0 {
            return Err(DemographicError::RecordNotFound(format!(
                "no applications found for user {creator}"
            )));
        }

        let mut basic_details = Vec::with_capacity(slice.records.len());
        for record in slice.records {
            let details = self.open(&record)?;
            let booking_metadata = if record.status == StatusCode::Booked {
                match self.booking.appointment(&record.id).await {
                    Ok(metadata) => Some(metadata),
                    Err(err) => {
                        warn!(pre_registration_id = %record.id, error = %err, "booking lookup failed");
                        None
                    }
                }
            } else {
                None
            };
            basic_details.push(ApplicationSummary {
                pre_registration_id: record.id,
                status_code: record.status,
                demographic_metadata: self.settings.mapping.extract_display(&details),
                booking_metadata,
            });
        }

        let page_view = ApplicationsPage {
            total_records: slice.total.to_string(),
            no_of_records: basic_details.len().to_string(),
            page_index: page.to_string(),
            basic_details,
        };
        Ok(self.respond(ids::RETRIEVE_BASIC, page_view))
    }

    /// Move an application to `new_status`.
    ///
    /// A missing record, unknown status, or disallowed transition is reported in
    /// the payload as [`STATUS_NOT_UPDATED`] rather than as an error.
    pub fn update_status(
        &self,
        id: &PreRegistrationId,
        new_status: &str,
        actor: &str,
    ) -> Result<MainResponse<String>, DemographicError> {
        let Some(mut record) = self.repository.find_by_id(id)? else {
            info!(pre_registration_id = %id, "status not updated: no such application");
            return Ok(self.status_not_updated());
        };
        let Some(target) = StatusCode::parse(new_status) else {
            info!(pre_registration_id = %id, new_status, "status not updated: unknown status");
            return Ok(self.status_not_updated());
        };
        if !record.status.can_transition_to(target) {
            info!(
                pre_registration_id = %id,
                from = %record.status,
                to = %target,
                "status not updated: transition not allowed"
            );
            return Ok(self.status_not_updated());
        }

        record.status = target;
        record.updated_by = Some(actor.to_string());
        record.updated_at = Some(Utc::now());
        self.repository.save(record)?;
        info!(pre_registration_id = %id, actor, status = %target, "status updated");

        Ok(self.respond(ids::UPDATE_STATUS, STATUS_UPDATED.to_string()))
    }

    /// Last-modified timestamps of booked or expired applications among `filter`'s ids.
    pub fn batch_status_by_ids(
        &self,
        filter: &PreRegIdsFilter,
    ) -> Result<MainResponse<BTreeMap<String, String>>, DemographicError> {
        let requested: Vec<PreRegistrationId> = filter
            .pre_registration_ids
            .iter()
            .flatten()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(PreRegistrationId::from)
            .collect();
        if requested.is_empty() {
            return Err(DemographicError::RecordNotFoundForIds);
        }

        let records = self
            .repository
            .find_by_status_in_and_ids_in(&BATCH_STATUSES, &requested)?;
        if records.is_empty() {
            return Err(DemographicError::RecordNotFoundForIds);
        }

        let timestamps = records
            .into_iter()
            .map(|record| (record.id.0.clone(), format_timestamp(record.last_modified())))
            .collect();
        Ok(self.respond(ids::RETRIEVE_DATE, timestamps))
    }

    /// Delete an application after its documents and booking are gone.
    ///
    /// Documents go first, then the booking of a `Booked` application. The record
    /// is only removed once every remote deletion has succeeded; "nothing to
    /// delete" answers from either service count as success so a retry can finish.
    pub async fn delete_individual(
        &self,
        id: &PreRegistrationId,
        actor: &str,
    ) -> Result<MainResponse<DeletionResult>, DemographicError> {
        let record = self.require(id)?;
        if !record.status.permits_deletion() {
            return Err(DemographicError::DeletionNotPermitted {
                id: id.clone(),
                status: record.status,
            });
        }

        match self.documents.delete_documents(id).await {
            Ok(_) => {}
            Err(err) if err.rejection_code() == Some(DOCUMENTS_MISSING) => {
                debug!(pre_registration_id = %id, "no documents to delete");
            }
            Err(source) => {
                return Err(DemographicError::DocumentDeletionFailed {
                    id: id.clone(),
                    source,
                })
            }
        }

        if record.status == StatusCode::Booked {
            match self.booking.delete_booking(id).await {
                Ok(_) => {}
                Err(err) if err.rejection_code() == Some(BOOKING_MISSING) => {
                    debug!(pre_registration_id = %id, "booking already released");
                }
                Err(source) => {
                    return Err(DemographicError::BookingDeletionFailed {
                        id: id.clone(),
                        source,
                    })
                }
            }
        }

        if self.repository.delete_by_id(id)? == 0 {
            return Err(DemographicError::RecordFailedToDelete(id.clone()));
        }
        info!(pre_registration_id = %id, actor, "application deleted");

        Ok(self.respond(
            ids::DELETE,
            DeletionResult {
                pre_registration_id: id.clone(),
                deleted_by: actor.to_string(),
                deleted_date_time: format_timestamp(Utc::now()),
            },
        ))
    }

    fn respond<T>(&self, operation: &str, payload: T) -> MainResponse<T> {
        MainResponse::success(operation, &self.settings.version, payload)
    }

    fn check_envelope<T>(
        &self,
        request: &MainRequest<T>,
        expected_id: &str,
    ) -> Result<(), DemographicError> {
        if let Some(id) = request.id.as_deref() {
            if id != expected_id {
                return Err(DemographicError::InvalidRequest(format!(
                    "request id '{id}' does not match '{expected_id}'"
                )));
            }
        }
        if let Some(version) = request.version.as_deref() {
            if version != self.settings.version {
                return Err(DemographicError::InvalidRequest(format!(
                    "request version '{version}' is not supported"
                )));
            }
        }
        Ok(())
    }

    fn validated_details(&self, request: &DemographicRequest) -> Result<Value, DemographicError> {
        if request.lang_code.trim().is_empty() {
            return Err(DemographicError::InvalidRequest(
                "langCode is required".to_string(),
            ));
        }
        let details = request.demographic_details.as_ref().ok_or_else(|| {
            DemographicError::InvalidRequest("demographicDetails is required".to_string())
        })?;

        let mandatory = self.settings.mapping.mandatory_fields();
        if !self.validator.validate(&mandatory, details, &[])? {
            return Err(DemographicError::InvalidRequest(
                "identity document failed validation".to_string(),
            ));
        }
        Ok(details.clone())
    }

    fn next_id(&self) -> Result<PreRegistrationId, DemographicError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = self.ids.generate();
            if self.repository.find_by_id(&candidate)?.is_none() {
                return Ok(candidate);
            }
            debug!(pre_registration_id = %candidate, "generated id already in use");
        }
        Err(RepositoryError::Conflict.into())
    }

    fn seal(
        &self,
        details: &Value,
        at: chrono::DateTime<Utc>,
    ) -> Result<(Vec<u8>, String), DemographicError> {
        let plaintext = serde_json::to_vec(details)
            .map_err(|err| DemographicError::InvalidRequest(err.to_string()))?;
        let hash = content_hash(&plaintext);
        let ciphertext = self.cipher.encrypt(&plaintext, at)?;
        Ok((ciphertext, hash))
    }

    /// Decrypt a stored payload and check it against the stored hash.
    fn open(&self, record: &DemographicRecord) -> Result<Value, DemographicError> {
        let plaintext = match self
            .cipher
            .decrypt(&record.applicant_detail, record.encrypted_at)
        {
            Ok(plaintext) => plaintext,
            Err(CryptoError::Tampered) => return Err(integrity_failure(record)),
            Err(other) => return Err(other.into()),
        };
        if content_hash(&plaintext) != record.detail_hash {
            return Err(integrity_failure(record));
        }

        serde_json::from_slice(&plaintext)
            .map_err(|err| DemographicError::Crypto(CryptoError::Malformed(err.to_string())))
    }

    fn status_not_updated(&self) -> MainResponse<String> {
        self.respond(ids::UPDATE_STATUS, STATUS_NOT_UPDATED.to_string())
    }

    fn require(&self, id: &PreRegistrationId) -> Result<DemographicRecord, DemographicError> {
        self.repository
            .find_by_id(id)?
            .ok_or_else(|| DemographicError::RecordNotFound(format!("no application {id}")))
    }
}

fn integrity_failure(record: &DemographicRecord) -> DemographicError {
    error!(pre_registration_id = %record.id, "stored payload failed integrity check");
    DemographicError::Hashing(record.id.clone())
}

fn view(record: &DemographicRecord, details: Option<Value>) -> DemographicResponse {
    DemographicResponse {
        pre_registration_id: record.id.clone(),
        created_by: record.created_by.clone(),
        created_date_time: format_timestamp(record.created_at),
        updated_by: record.updated_by.clone(),
        updated_date_time: record.updated_at.map(format_timestamp),
        status_code: record.status,
        lang_code: record.lang_code.clone(),
        demographic_details: details,
    }
}

/// Error raised by the demographic service.
#[derive(Debug, thiserror::Error)]
pub enum DemographicError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    #[error("record not found: {0}")]
    RecordNotFound(String),
    #[error("no records found for the requested pre-registration ids")]
    RecordNotFoundForIds,
    #[error("demographic details of {0} failed the integrity check")]
    Hashing(PreRegistrationId),
    #[error("application {id} in status {status} cannot be deleted")]
    DeletionNotPermitted {
        id: PreRegistrationId,
        status: StatusCode,
    },
    #[error("booking deletion failed for {id}: {source}")]
    BookingDeletionFailed {
        id: PreRegistrationId,
        source: RemoteError,
    },
    #[error("document deletion failed for {id}: {source}")]
    DocumentDeletionFailed {
        id: PreRegistrationId,
        source: RemoteError,
    },
    #[error("failed to delete application {0}")]
    RecordFailedToDelete(PreRegistrationId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl DemographicError {
    pub fn error_code(&self) -> &'static str {
        match self {
            DemographicError::InvalidRequest(_) => "PRG_PAM_APP_014",
            DemographicError::IllegalArgument(_) => "PRG_PAM_APP_019",
            DemographicError::RecordNotFound(_) => "PRG_PAM_APP_005",
            DemographicError::RecordNotFoundForIds => "PRG_PAM_APP_016",
            DemographicError::Hashing(_) => "PRG_PAM_APP_010",
            DemographicError::DeletionNotPermitted { .. } => "PRG_PAM_APP_003",
            DemographicError::BookingDeletionFailed { .. } => "PRG_PAM_DEM_001",
            DemographicError::DocumentDeletionFailed { .. } => "PRG_PAM_DOC_015",
            DemographicError::RecordFailedToDelete(_) => "PRG_PAM_APP_004",
            DemographicError::Repository(_) => "PRG_PAM_APP_002",
            DemographicError::Crypto(_) => "PRG_PAM_APP_012",
            DemographicError::Identity(_) => "PRG_PAM_APP_007",
        }
    }
}
