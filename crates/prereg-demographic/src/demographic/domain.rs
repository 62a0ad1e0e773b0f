use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Pre-registration identifier (PRID).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreRegistrationId(pub String);

impl PreRegistrationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreRegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PreRegistrationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    #[serde(rename = "Pending_Appointment")]
    PendingAppointment,
    #[serde(rename = "Booked")]
    Booked,
    #[serde(rename = "Expired")]
    Expired,
    #[serde(rename = "Consumed")]
    Consumed,
    #[serde(rename = "Canceled")]
    Canceled,
}

impl StatusCode {
    pub const ALL: [StatusCode; 5] = [
        StatusCode::PendingAppointment,
        StatusCode::Booked,
        StatusCode::Expired,
        StatusCode::Consumed,
        StatusCode::Canceled,
    ];

    pub fn code(self) -> &'static str {
        match self {
            StatusCode::PendingAppointment => "Pending_Appointment",
            StatusCode::Booked => "Booked",
            StatusCode::Expired => "Expired",
            StatusCode::Consumed => "Consumed",
            StatusCode::Canceled => "Canceled",
        }
    }

    /// Case-insensitive lookup against the status vocabulary.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.code().eq_ignore_ascii_case(raw))
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StatusCode::Expired | StatusCode::Consumed | StatusCode::Canceled
        )
    }

    pub fn can_transition_to(self, target: StatusCode) -> bool {
        use StatusCode::*;
        matches!(
            (self, target),
            (PendingAppointment, Booked)
                | (Booked, Consumed)
                | (Booked, PendingAppointment)
                | (PendingAppointment | Booked, Expired)
                | (PendingAppointment | Booked, Canceled)
        )
    }

    pub fn permits_deletion(self) -> bool {
        matches!(self, StatusCode::PendingAppointment | StatusCode::Booked)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Stored application. `applicant_detail` is ciphertext; `detail_hash` covers the plaintext.
/// Uploaded documents live in the document service, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemographicRecord {
    pub id: PreRegistrationId,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub status: StatusCode,
    pub lang_code: String,
    pub applicant_detail: Vec<u8>,
    pub detail_hash: String,
    pub encrypted_at: DateTime<Utc>,
}

impl DemographicRecord {
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// Appointment slot owned by the booking service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingMetadata {
    pub reg_date: NaiveDate,
    pub slot_from_time: String,
    pub slot_to_time: String,
    pub registration_center_id: String,
}
