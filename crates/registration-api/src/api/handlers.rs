//! HTTP request handlers.

use super::types::{HealthResponse, RootResponse};
use super::AppState;
use crate::error::{ApiError, FieldIssue, ValidationError};
use crate::registration::{validate_submission, Lookup, RegistrationResponse};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::{info, warn};

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: state.app.version.clone(),
        environment: state.app.environment.clone(),
    })
}

/// Service information.
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        name: state.app.name.clone(),
        version: state.app.version.clone(),
        status: "running".to_string(),
    })
}

/// Submit a new registration.
pub async fn create_registration(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let Json(raw) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Unreadable registration body");
        ValidationError::new(vec![FieldIssue::new("body", rejection.body_text())])
    })?;

    let submission = match validate_submission(&raw) {
        Ok(validated) => validated.normalize(),
        Err(e) => {
            warn!(error = %e, "Registration rejected");
            return Err(e.into());
        }
    };

    info!(team_name = %submission.team_name, "Registration request received");

    let response = state.adapter.create(submission).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Fetch a registration by id.
pub async fn get_registration(
    State(state): State<AppState>,
    Path(registration_id): Path<String>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    info!(registration_id = %registration_id, "Retrieving registration");

    match state.adapter.read(&registration_id).await? {
        Lookup::Found(response) => Ok(Json(response)),
        Lookup::NotFound => Err(ApiError::NotFound(registration_id)),
    }
}
