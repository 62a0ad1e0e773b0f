use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{BookingMetadata, PreRegistrationId, StatusCode};

/// Payload sent when an application is created or its details are replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicRequest {
    #[serde(default)]
    pub lang_code: String,
    pub demographic_details: Option<Value>,
}

/// Application view returned by create, update, and fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicResponse {
    pub pre_registration_id: PreRegistrationId,
    pub created_by: String,
    pub created_date_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_date_time: Option<String>,
    pub status_code: StatusCode,
    pub lang_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demographic_details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatusView {
    pub pre_registration_id: PreRegistrationId,
    pub status_code: StatusCode,
}

/// One row of a creator's application listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub pre_registration_id: PreRegistrationId,
    pub status_code: StatusCode,
    pub demographic_metadata: BTreeMap<String, Value>,
    pub booking_metadata: Option<BookingMetadata>,
}

/// Paged listing. Counts are strings on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationsPage {
    pub basic_details: Vec<ApplicationSummary>,
    pub total_records: String,
    pub no_of_records: String,
    pub page_index: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionResult {
    pub pre_registration_id: PreRegistrationId,
    pub deleted_by: String,
    pub deleted_date_time: String,
}

/// Filter for the batch last-update query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreRegIdsFilter {
    #[serde(default)]
    pub registration_center_id: Option<String>,
    #[serde(default)]
    pub pre_registration_ids: Option<Vec<String>>,
}

/// Sentinel payloads returned by status updates.
pub const STATUS_UPDATED: &str = "STATUS_UPDATED_SUCESSFULLY";
pub const STATUS_NOT_UPDATED: &str = "STATUS_NOT_UPDATED_SUCESSFULLY";
