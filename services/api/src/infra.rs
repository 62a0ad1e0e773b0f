use metrics_exporter_prometheus::PrometheusHandle;
use prereg_demographic::config::DemographicConfig;
use prereg_demographic::demographic::{
    load_identity_schema, AesGcmCipher, DemographicService, DemographicSettings,
    HttpBookingClient, HttpDocumentClient, InMemoryDemographicRepository,
    SchemaIdentityValidator,
};
use prereg_demographic::error::AppError;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type LiveService =
    DemographicService<InMemoryDemographicRepository, HttpBookingClient, HttpDocumentClient>;

/// Build the service from configuration: identity files, cipher, and remote clients.
pub(crate) fn demographic_service(config: &DemographicConfig) -> Result<LiveService, AppError> {
    let schema = load_identity_schema(config.identity_schema_path.as_deref())?;
    let validator = SchemaIdentityValidator::new(&schema)?;
    let cipher = AesGcmCipher::new(config.encryption_key.as_bytes())?;
    let booking = HttpBookingClient::new(&config.booking_url, config.remote_timeout)?;
    let documents = HttpDocumentClient::new(&config.document_url, config.remote_timeout)?;
    let settings = DemographicSettings::from_config(config)?;

    Ok(DemographicService::new(
        Arc::new(InMemoryDemographicRepository::default()),
        Arc::new(booking),
        Arc::new(documents),
        Arc::new(cipher),
        Arc::new(validator),
        settings,
    ))
}
