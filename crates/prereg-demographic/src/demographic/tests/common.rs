use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::demographic::crypto::AesGcmCipher;
use crate::demographic::domain::{
    BookingMetadata, DemographicRecord, PreRegistrationId, StatusCode,
};
use crate::demographic::dto::DemographicRequest;
use crate::demographic::envelope::{ids, MainRequest};
use crate::demographic::identity::{IdentityMapping, SchemaIdentityValidator};
use crate::demographic::remote::{
    BookingClient, DeleteBooking, DocumentClient, DocumentDeleteResponse, RemoteError,
};
use crate::demographic::repository::{
    DemographicRepository, InMemoryDemographicRepository, RecordPage, RepositoryError,
};
use crate::demographic::service::{DemographicService, DemographicSettings, PridGenerator};

pub(super) const CREATOR: &str = "9876543210";
pub(super) const TEST_KEY: [u8; 32] = [7u8; 32];

pub(super) type TestService =
    DemographicService<InMemoryDemographicRepository, MemoryBooking, MemoryDocuments>;

pub(super) fn details() -> Value {
    json!({
        "identity": {
            "IDSchemaVersion": 1.0,
            "fullName": [{ "language": "fra", "value": "Amina Diallo" }],
            "dateOfBirth": "1990/04/12",
            "gender": [{ "language": "fra", "value": "Femelle" }],
            "postalCode": "10112",
            "phone": "9876543210",
            "email": "amina@example.org"
        }
    })
}

pub(super) fn create_request() -> MainRequest<DemographicRequest> {
    MainRequest::new(
        ids::CREATE,
        "1.0",
        DemographicRequest {
            lang_code: "fra".to_string(),
            demographic_details: Some(details()),
        },
    )
}

pub(super) fn update_request(details: Value) -> MainRequest<DemographicRequest> {
    MainRequest::new(
        ids::UPDATE,
        "1.0",
        DemographicRequest {
            lang_code: "eng".to_string(),
            demographic_details: Some(details),
        },
    )
}

pub(super) fn booking_slot() -> BookingMetadata {
    BookingMetadata {
        reg_date: NaiveDate::from_ymd_opt(2018, 12, 10).expect("valid date"),
        slot_from_time: "09:00".to_string(),
        slot_to_time: "09:13".to_string(),
        registration_center_id: "10001".to_string(),
    }
}

fn rejected(code: &str) -> RemoteError {
    RemoteError::Rejected {
        code: code.to_string(),
        message: "remote rejected the call".to_string(),
    }
}

/// Booking double. Lookups fail for ids listed in `failing_lookups`.
#[derive(Default, Clone)]
pub(super) struct MemoryBooking {
    slots: Arc<Mutex<HashMap<PreRegistrationId, BookingMetadata>>>,
    failing_lookups: Arc<Mutex<Vec<PreRegistrationId>>>,
    fail_deletes: Arc<Mutex<bool>>,
    deleted: Arc<Mutex<Vec<PreRegistrationId>>>,
}

impl MemoryBooking {
    pub(super) fn book(&self, id: &PreRegistrationId) {
        self.slots
            .lock()
            .expect("booking mutex poisoned")
            .insert(id.clone(), booking_slot());
    }

    pub(super) fn fail_lookup(&self, id: &PreRegistrationId) {
        self.failing_lookups
            .lock()
            .expect("booking mutex poisoned")
            .push(id.clone());
    }

    pub(super) fn fail_deletes(&self) {
        *self.fail_deletes.lock().expect("booking mutex poisoned") = true;
    }

    pub(super) fn deleted(&self) -> Vec<PreRegistrationId> {
        self.deleted.lock().expect("booking mutex poisoned").clone()
    }
}

#[async_trait]
impl BookingClient for MemoryBooking {
    async fn appointment(&self, id: &PreRegistrationId) -> Result<BookingMetadata, RemoteError> {
        if self
            .failing_lookups
            .lock()
            .expect("booking mutex poisoned")
            .contains(id)
        {
            return Err(RemoteError::Transport("connection refused".to_string()));
        }
        self.slots
            .lock()
            .expect("booking mutex poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| rejected("PRG_BOOK_RCI_013"))
    }

    async fn delete_booking(&self, id: &PreRegistrationId) -> Result<DeleteBooking, RemoteError> {
        if *self.fail_deletes.lock().expect("booking mutex poisoned") {
            return Err(rejected("PRG_BOOK_RCI_028"));
        }
        if self
            .slots
            .lock()
            .expect("booking mutex poisoned")
            .remove(id)
            .is_none()
        {
            return Err(rejected("PRG_BOOK_RCI_013"));
        }
        self.deleted
            .lock()
            .expect("booking mutex poisoned")
            .push(id.clone());
        Ok(DeleteBooking {
            pre_registration_id: id.clone(),
            deleted_by: None,
            deleted_date_time: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DocumentBehaviour {
    Succeed,
    NothingUploaded,
    Fail,
}

impl Default for DocumentBehaviour {
    fn default() -> Self {
        Self::Succeed
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDocuments {
    behaviour: Arc<Mutex<DocumentBehaviour>>,
    deleted: Arc<Mutex<Vec<PreRegistrationId>>>,
}

impl MemoryDocuments {
    pub(super) fn behave(&self, behaviour: DocumentBehaviour) {
        *self.behaviour.lock().expect("document mutex poisoned") = behaviour;
    }

    pub(super) fn deleted(&self) -> Vec<PreRegistrationId> {
        self.deleted.lock().expect("document mutex poisoned").clone()
    }
}

#[async_trait]
impl DocumentClient for MemoryDocuments {
    async fn delete_documents(
        &self,
        id: &PreRegistrationId,
    ) -> Result<DocumentDeleteResponse, RemoteError> {
        let behaviour = *self.behaviour.lock().expect("document mutex poisoned");
        match behaviour {
            DocumentBehaviour::Succeed => {
                self.deleted
                    .lock()
                    .expect("document mutex poisoned")
                    .push(id.clone());
                Ok(DocumentDeleteResponse {
                    message: "All documents deleted successfully".to_string(),
                })
            }
            DocumentBehaviour::NothingUploaded => Err(rejected("PRG_PAM_DOC_005")),
            DocumentBehaviour::Fail => Err(RemoteError::Status {
                status: 503,
                body: "maintenance".to_string(),
            }),
        }
    }
}

/// Hands out `base`, `base + 1`, ... as fourteen-digit ids.
pub(super) struct SequencePrid {
    next: AtomicUsize,
}

impl SequencePrid {
    pub(super) fn starting_at(base: usize) -> Self {
        Self {
            next: AtomicUsize::new(base),
        }
    }
}

impl PridGenerator for SequencePrid {
    fn generate(&self) -> PreRegistrationId {
        let value = self.next.fetch_add(1, Ordering::SeqCst);
        PreRegistrationId(format!("{value:014}"))
    }
}

/// Always returns the same id, to exercise collision handling.
pub(super) struct FixedPrid(pub(super) &'static str);

impl PridGenerator for FixedPrid {
    fn generate(&self) -> PreRegistrationId {
        PreRegistrationId::from(self.0)
    }
}

pub(super) struct UnavailableRepository;

impl DemographicRepository for UnavailableRepository {
    fn find_by_id(
        &self,
        _id: &PreRegistrationId,
    ) -> Result<Option<DemographicRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_creator(
        &self,
        _creator: &str,
        _exclude_status: StatusCode,
    ) -> Result<Vec<DemographicRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_creator_paged(
        &self,
        _creator: &str,
        _exclude_status: StatusCode,
        _page: usize,
        _size: usize,
    ) -> Result<RecordPage, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_status_in_and_ids_in(
        &self,
        _statuses: &[StatusCode],
        _ids: &[PreRegistrationId],
    ) -> Result<Vec<DemographicRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save(&self, _record: DemographicRecord) -> Result<DemographicRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_by_id(&self, _id: &PreRegistrationId) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn settings(page_size: usize) -> DemographicSettings {
    DemographicSettings {
        version: "1.0".to_string(),
        page_size,
        mapping: IdentityMapping::bundled().expect("bundled mapping"),
    }
}

pub(super) fn service_with<R: DemographicRepository + 'static>(
    repository: Arc<R>,
    booking: MemoryBooking,
    documents: MemoryDocuments,
    page_size: usize,
) -> DemographicService<R, MemoryBooking, MemoryDocuments> {
    DemographicService::new(
        repository,
        Arc::new(booking),
        Arc::new(documents),
        Arc::new(AesGcmCipher::new(&TEST_KEY).expect("valid key")),
        Arc::new(SchemaIdentityValidator::bundled().expect("schema compiles")),
        settings(page_size),
    )
    .with_id_generator(Arc::new(SequencePrid::starting_at(10_000_000_000_001)))
}

pub(super) fn build_service() -> (
    TestService,
    InMemoryDemographicRepository,
    MemoryBooking,
    MemoryDocuments,
) {
    build_service_with_page_size(10)
}

pub(super) fn build_service_with_page_size(
    page_size: usize,
) -> (
    TestService,
    InMemoryDemographicRepository,
    MemoryBooking,
    MemoryDocuments,
) {
    let repository = InMemoryDemographicRepository::default();
    let booking = MemoryBooking::default();
    let documents = MemoryDocuments::default();
    let service = service_with(
        Arc::new(repository.clone()),
        booking.clone(),
        documents.clone(),
        page_size,
    );
    (service, repository, booking, documents)
}

/// Create an application as [`CREATOR`] and return its id.
pub(super) fn seed(service: &TestService) -> PreRegistrationId {
    seed_as(service, CREATOR)
}

pub(super) fn seed_as(service: &TestService, actor: &str) -> PreRegistrationId {
    service
        .create(create_request(), actor)
        .expect("create succeeds")
        .response
        .expect("payload present")
        .pre_registration_id
}

pub(super) fn force_status(
    repository: &InMemoryDemographicRepository,
    id: &PreRegistrationId,
    status: StatusCode,
) {
    let mut record = repository
        .find_by_id(id)
        .expect("lookup")
        .expect("record exists");
    record.status = status;
    repository.save(record).expect("save");
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
