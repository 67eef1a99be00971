//! Tournament registration intake API.
//!
//! Validates registration submissions, persists them to a managed document
//! database and serves them back by id.

pub mod api;
pub mod config;
pub mod error;
pub mod registration;

pub use config::Config;
pub use error::{ApiError, StorageError, ValidationError};
pub use registration::{
    Lookup, RegistrationAdapter, RegistrationRecord, RegistrationResponse, RegistrationStatus,
    RegistrationSubmission,
};
