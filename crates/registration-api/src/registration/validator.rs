//! Structural validation of inbound registration payloads.
//!
//! Only presence and type are checked. Email and phone contents are accepted
//! as given.

use super::RegistrationSubmission;
use crate::error::{FieldIssue, ValidationError};
use serde_json::{Map, Value};

const FIELD_REQUIRED: &str = "field required";

/// A structurally valid submission, before defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub team_name: String,
    pub category: String,
    pub team_size: i64,
    pub contact_name: String,
    pub designation: String,
    pub email: String,
    pub phone: String,
    pub alt_phone: Option<String>,
    pub players: String,
    pub terms_accepted: bool,
    pub newsletter_subscribed: Option<bool>,
}

impl ValidatedSubmission {
    /// Apply defaults for the optional fields.
    pub fn normalize(self) -> RegistrationSubmission {
        RegistrationSubmission {
            team_name: self.team_name,
            category: self.category,
            team_size: self.team_size,
            contact_name: self.contact_name,
            designation: self.designation,
            email: self.email,
            phone: self.phone,
            alt_phone: self.alt_phone.unwrap_or_default(),
            players: self.players,
            terms_accepted: self.terms_accepted,
            newsletter_subscribed: self.newsletter_subscribed.unwrap_or(false),
        }
    }
}

/// Validate a raw JSON payload, reporting every offending field.
pub fn validate_submission(raw: &Value) -> Result<ValidatedSubmission, ValidationError> {
    let Some(object) = raw.as_object() else {
        return Err(ValidationError::new(vec![FieldIssue::new(
            "body",
            "expected a JSON object",
        )]));
    };

    let mut fields = FieldReader::new(object);

    let team_name = fields.non_empty_string("team_name");
    let category = fields.string("category");
    let team_size = fields.integer("team_size");
    let contact_name = fields.string("contact_name");
    let designation = fields.string("designation");
    let email = fields.string("email");
    let phone = fields.string("phone");
    let alt_phone = fields.optional_string("alt_phone");
    let players = fields.string("players");
    let terms_accepted = fields.boolean("terms_accepted");
    let newsletter_subscribed = fields.optional_boolean("newsletter_subscribed");

    let (
        Some(team_name),
        Some(category),
        Some(team_size),
        Some(contact_name),
        Some(designation),
        Some(email),
        Some(phone),
        Some(players),
        Some(terms_accepted),
    ) = (
        team_name,
        category,
        team_size,
        contact_name,
        designation,
        email,
        phone,
        players,
        terms_accepted,
    )
    else {
        return Err(fields.into_error());
    };

    fields.finish()?;

    Ok(ValidatedSubmission {
        team_name,
        category,
        team_size,
        contact_name,
        designation,
        email,
        phone,
        alt_phone,
        players,
        terms_accepted,
        newsletter_subscribed,
    })
}

/// Reads typed fields out of a JSON object, collecting issues as it goes.
struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    issues: Vec<FieldIssue>,
}

impl<'a> FieldReader<'a> {
    fn new(object: &'a Map<String, Value>) -> Self {
        Self {
            object,
            issues: Vec::new(),
        }
    }

    /// Field value, treating `null` the same as absent.
    fn present(&self, name: &str) -> Option<&'a Value> {
        self.object.get(name).filter(|value| !value.is_null())
    }

    fn reject(&mut self, name: &str, message: &str) {
        self.issues.push(FieldIssue::new(name, message));
    }

    fn string(&mut self, name: &str) -> Option<String> {
        match self.present(name) {
            None => {
                self.reject(name, FIELD_REQUIRED);
                None
            }
            Some(value) => self.as_string(name, value),
        }
    }

    fn non_empty_string(&mut self, name: &str) -> Option<String> {
        let value = self.string(name)?;
        if value.trim().is_empty() {
            self.reject(name, "must not be empty");
            return None;
        }
        Some(value)
    }

    fn optional_string(&mut self, name: &str) -> Option<String> {
        let value = self.present(name)?;
        self.as_string(name, value)
    }

    fn as_string(&mut self, name: &str, value: &Value) -> Option<String> {
        match value.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                self.reject(name, "must be a string");
                None
            }
        }
    }

    /// Integers may arrive as JSON numbers without a fractional part or as
    /// strings holding a base-10 integer.
    fn integer(&mut self, name: &str) -> Option<i64> {
        let Some(value) = self.present(name) else {
            self.reject(name, FIELD_REQUIRED);
            return None;
        };

        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        if parsed.is_none() {
            self.reject(name, "must be an integer");
        }
        parsed
    }

    fn boolean(&mut self, name: &str) -> Option<bool> {
        match self.present(name) {
            None => {
                self.reject(name, FIELD_REQUIRED);
                None
            }
            Some(value) => self.as_boolean(name, value),
        }
    }

    fn optional_boolean(&mut self, name: &str) -> Option<bool> {
        let value = self.present(name)?;
        self.as_boolean(name, value)
    }

    fn as_boolean(&mut self, name: &str, value: &Value) -> Option<bool> {
        match value.as_bool() {
            Some(b) => Some(b),
            None => {
                self.reject(name, "must be a boolean");
                None
            }
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }

    fn into_error(self) -> ValidationError {
        ValidationError::new(self.issues)
    }
}
