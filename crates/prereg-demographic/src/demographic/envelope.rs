//! Request/response wrappers shared by every pre-registration endpoint and by the
//! booking and document services we call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operation identifiers echoed in the `id` field of responses.
pub mod ids {
    pub const CREATE: &str = "mosip.pre-registration.demographic.create";
    pub const UPDATE: &str = "mosip.pre-registration.demographic.update";
    pub const RETRIEVE_BASIC: &str = "mosip.pre-registration.demographic.retrieve.basic";
    pub const RETRIEVE_DETAILS: &str = "mosip.pre-registration.demographic.retrieve.details";
    pub const RETRIEVE_STATUS: &str = "mosip.pre-registration.demographic.retrieve.status";
    pub const UPDATE_STATUS: &str = "mosip.pre-registration.demographic.update.status";
    pub const DELETE: &str = "mosip.pre-registration.demographic.delete";
    pub const RETRIEVE_DATE: &str = "mosip.pre-registration.demographic.retrieve.date";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainRequest<T> {
    pub id: Option<String>,
    pub version: Option<String>,
    pub requesttime: Option<String>,
    pub request: T,
}

impl<T> MainRequest<T> {
    pub fn new(id: &str, version: &str, request: T) -> Self {
        Self {
            id: Some(id.to_string()),
            version: Some(version.to_string()),
            requesttime: Some(format_timestamp(Utc::now())),
            request,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "errorCode")]
    pub error_code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainResponse<T> {
    pub id: Option<String>,
    pub version: Option<String>,
    pub responsetime: Option<String>,
    pub response: Option<T>,
    pub errors: Option<Vec<ErrorInfo>>,
}

impl<T> MainResponse<T> {
    pub fn success(id: &str, version: &str, payload: T) -> Self {
        Self {
            id: Some(id.to_string()),
            version: Some(version.to_string()),
            responsetime: Some(format_timestamp(Utc::now())),
            response: Some(payload),
            errors: None,
        }
    }

    pub fn failure(id: &str, version: &str, errors: Vec<ErrorInfo>) -> Self {
        Self {
            id: Some(id.to_string()),
            version: Some(version.to_string()),
            responsetime: Some(format_timestamp(Utc::now())),
            response: None,
            errors: Some(errors),
        }
    }

    /// First reported error, if the envelope carries any.
    pub fn first_error(&self) -> Option<&ErrorInfo> {
        self.errors.as_ref().and_then(|errors| errors.first())
    }
}

/// UTC timestamp in the `yyyy-MM-dd'T'HH:mm:ss.SSS'Z'` wire format.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
