//! Registration data model, validation and persistence.

mod adapter;
mod validator;

pub use adapter::{Lookup, RegistrationAdapter};
pub use validator::{validate_submission, ValidatedSubmission};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Message returned after a successful create.
pub const CREATED_MESSAGE: &str = "Registration submitted successfully";

/// Message returned after a successful lookup.
pub const FOUND_MESSAGE: &str = "Registration found";

/// Registration status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    /// Submitted and awaiting review
    Pending,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
        }
    }
}

/// A validated registration with optional fields defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationSubmission {
    pub team_name: String,
    pub category: String,
    pub team_size: i64,
    pub contact_name: String,
    pub designation: String,
    pub email: String,
    pub phone: String,
    pub alt_phone: String,
    pub players: String,
    pub terms_accepted: bool,
    pub newsletter_subscribed: bool,
}

/// The document persisted for each registration.
///
/// `registration_id` is both the document key and a field of the document so
/// exported collections stay self-describing.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationRecord {
    pub registration_id: String,
    #[serde(flatten)]
    pub submission: RegistrationSubmission,
    pub status: RegistrationStatus,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl RegistrationRecord {
    /// Create a new pending record.
    pub fn new_pending(
        registration_id: String,
        submission: RegistrationSubmission,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            registration_id,
            submission,
            status: RegistrationStatus::Pending,
            created_at,
        }
    }
}

/// Registration as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub registration_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

/// Format a timestamp as stored in documents (RFC 3339, UTC, full precision).
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 with any offset, and ISO-8601 without an offset, which is
/// read as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp {:?}: {}", value, e))
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn submission() -> RegistrationSubmission {
        RegistrationSubmission {
            team_name: "Warriors".into(),
            category: "senior".into(),
            team_size: 10,
            contact_name: "A B".into(),
            designation: "coach".into(),
            email: "a@b.com".into(),
            phone: "9876543210".into(),
            alt_phone: String::new(),
            players: "1. X".into(),
            terms_accepted: true,
            newsletter_subscribed: false,
        }
    }

    #[test]
    fn test_record_document_shape() {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 31, 22, 0, 0).unwrap();
        let record = RegistrationRecord::new_pending("abc".into(), submission(), created_at);

        let document = serde_json::to_value(&record).unwrap();
        assert_eq!(document["registration_id"], "abc");
        assert_eq!(document["team_name"], "Warriors");
        assert_eq!(document["team_size"], 10);
        assert_eq!(document["alt_phone"], "");
        assert_eq!(document["newsletter_subscribed"], false);
        assert_eq!(document["status"], "pending");
        assert_eq!(document["created_at"], "2026-01-31T22:00:00Z");
        assert!(document.get("submission").is_none());
    }

    #[test]
    fn test_timestamp_keeps_subsecond_precision() {
        let timestamp = Utc.timestamp_opt(1_769_896_800, 123_456_789).unwrap();
        let formatted = format_timestamp(&timestamp);
        assert_eq!(parse_timestamp(&formatted), Ok(timestamp));
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        let parsed = parse_timestamp("2026-02-01T03:30:00+05:30").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 1, 31, 22, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_timestamp_as_utc() {
        let parsed = parse_timestamp("2026-01-31T22:00:00.500000").unwrap();
        assert_eq!(
            parsed,
            Utc.with_ymd_and_hms(2026, 1, 31, 22, 0, 0).unwrap()
                + chrono::Duration::milliseconds(500)
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_registration_status_serialization() {
        let json = serde_json::to_string(&RegistrationStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        assert_eq!(RegistrationStatus::Pending.as_str(), "pending");
    }
}
