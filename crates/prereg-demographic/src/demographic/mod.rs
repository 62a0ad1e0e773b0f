//! Pre-registration application lifecycle: intake, retrieval, status changes,
//! and cascading deletion across the booking and document services.

pub mod crypto;
pub mod domain;
pub mod dto;
pub mod envelope;
pub mod identity;
pub mod remote;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use crypto::{content_hash, AesGcmCipher, CryptoError, PayloadCipher};
pub use domain::{BookingMetadata, DemographicRecord, PreRegistrationId, StatusCode};
pub use dto::{
    ApplicationStatusView, ApplicationSummary, ApplicationsPage, DeletionResult,
    DemographicRequest, DemographicResponse, PreRegIdsFilter, STATUS_NOT_UPDATED, STATUS_UPDATED,
};
pub use envelope::{ErrorInfo, MainRequest, MainResponse};
pub use identity::{
    load_identity_schema, IdentityError, IdentityMapping, IdentityValidator,
    SchemaIdentityValidator,
};
pub use remote::{
    BookingClient, DeleteBooking, DocumentClient, DocumentDeleteResponse, HttpBookingClient,
    HttpDocumentClient, RemoteError,
};
pub use repository::{
    DemographicRepository, InMemoryDemographicRepository, RecordPage, RepositoryError,
};
pub use router::{demographic_router, ACTOR_HEADER};
pub use service::{
    DemographicError, DemographicService, DemographicSettings, PridGenerator,
    RandomPridGenerator,
};
