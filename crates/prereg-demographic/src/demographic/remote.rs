//! Reqwest-backed clients for the booking and document services.
//!
//! Both services answer with the same envelope we emit; a populated `errors`
//! list is treated as a failure even on a 2xx status.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::domain::{BookingMetadata, PreRegistrationId};
use super::envelope::MainResponse;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBooking {
    pub pre_registration_id: PreRegistrationId,
    #[serde(default)]
    pub deleted_by: Option<String>,
    #[serde(default)]
    pub deleted_date_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDeleteResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("undecodable response: {0}")]
    Decode(String),
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },
    #[error("response envelope carried no payload")]
    EmptyResponse,
}

impl RemoteError {
    pub fn rejection_code(&self) -> Option<&str> {
        match self {
            RemoteError::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[async_trait]
pub trait BookingClient: Send + Sync {
    async fn appointment(&self, id: &PreRegistrationId) -> Result<BookingMetadata, RemoteError>;

    async fn delete_booking(&self, id: &PreRegistrationId) -> Result<DeleteBooking, RemoteError>;
}

#[async_trait]
pub trait DocumentClient: Send + Sync {
    async fn delete_documents(
        &self,
        id: &PreRegistrationId,
    ) -> Result<DocumentDeleteResponse, RemoteError>;
}

fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

fn map_transport_error(error: reqwest::Error) -> RemoteError {
    RemoteError::Transport(error.to_string())
}

async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, RemoteError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    if !status.is_success() {
        return Err(RemoteError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    let envelope: MainResponse<T> =
        serde_json::from_slice(&body).map_err(|err| RemoteError::Decode(err.to_string()))?;
    if let Some(error) = envelope.first_error() {
        return Err(RemoteError::Rejected {
            code: error.error_code.clone(),
            message: error.message.clone(),
        });
    }
    envelope.response.ok_or(RemoteError::EmptyResponse)
}

pub struct HttpBookingClient {
    client: Client,
    base_url: String,
}

impl HttpBookingClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: trim_base(base_url),
        })
    }
}

#[async_trait]
impl BookingClient for HttpBookingClient {
    async fn appointment(&self, id: &PreRegistrationId) -> Result<BookingMetadata, RemoteError> {
        let response = self
            .client
            .get(format!("{}/appointment/{}", self.base_url, id))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;
        read_envelope(response).await
    }

    async fn delete_booking(&self, id: &PreRegistrationId) -> Result<DeleteBooking, RemoteError> {
        let response = self
            .client
            .delete(format!("{}/appointment", self.base_url))
            .query(&[("preRegistrationId", id.as_str())])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;
        read_envelope(response).await
    }
}

pub struct HttpDocumentClient {
    client: Client,
    base_url: String,
}

impl HttpDocumentClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: trim_base(base_url),
        })
    }
}

#[async_trait]
impl DocumentClient for HttpDocumentClient {
    async fn delete_documents(
        &self,
        id: &PreRegistrationId,
    ) -> Result<DocumentDeleteResponse, RemoteError> {
        let response = self
            .client
            .delete(format!("{}/documents/preregistration/{}", self.base_url, id))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;
        read_envelope(response).await
    }
}
