use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use altgate_duckdb::license::{CreateLicenseParams, CreateOutcome};

use crate::{
    error::{AppError, INVALID_LICENSE, LICENSE_EXISTS},
    extract::JsonBody,
    routes::required_license_key,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateLicenseRequest {
    pub admin_token: Option<String>,
    pub license_key: Option<String>,
    pub plan: Option<String>,
    /// Accepted for older admin scripts; the plan table always decides.
    pub monthly_quota: Option<i64>,
    pub site_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListLicensesRequest {
    pub admin_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetLicenseRequest {
    pub admin_token: Option<String>,
    pub license_key: Option<String>,
}

/// Compare the supplied token with the configured one.
///
/// Both sides are hashed first so the comparison works on fixed-length
/// digests regardless of input length.
fn require_admin(state: &AppState, supplied: Option<&str>) -> Result<(), AppError> {
    let Some(supplied) = supplied else {
        warn!("Admin request without token");
        return Err(AppError::Unauthorized);
    };
    let expected = Sha256::digest(state.config.admin_token.as_bytes());
    if Sha256::digest(supplied.as_bytes()) != expected {
        warn!("Admin request with invalid token");
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// `POST /admin/create-license`: create a license; never overwrites.
#[tracing::instrument(skip(state, req))]
pub async fn create_license(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateLicenseRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&state, req.admin_token.as_deref())?;
    let license_key = required_license_key(req.license_key.as_deref())?.to_string();

    if let Some(requested) = req.monthly_quota {
        debug!(requested, "monthly_quota ignored; plan quota is authoritative");
    }

    let outcome = state
        .db
        .create_license(
            CreateLicenseParams {
                license_key,
                plan: req.plan,
                site_url: req.site_url.filter(|url| !url.trim().is_empty()),
            },
            &state.config.plan_quotas,
        )
        .await?;

    match outcome {
        CreateOutcome::Created(license) => Ok(Json(json!({
            "success": true,
            "license": license,
        }))),
        CreateOutcome::Duplicate => Err(AppError::Rejected(LICENSE_EXISTS)),
    }
}

/// `POST /admin/list-licenses`: every license, normalized.
#[tracing::instrument(skip(state, req))]
pub async fn list_licenses(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ListLicensesRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&state, req.admin_token.as_deref())?;

    let licenses = state.db.list_licenses(&state.config.plan_quotas).await?;

    Ok(Json(json!({
        "success": true,
        "total": licenses.len(),
        "licenses": licenses,
    })))
}

/// `POST /admin/reset-license`: zero a license's monthly counter.
#[tracing::instrument(skip(state, req))]
pub async fn reset_license(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ResetLicenseRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&state, req.admin_token.as_deref())?;
    let license_key = required_license_key(req.license_key.as_deref())?;

    let license = state
        .db
        .reset_usage(license_key, &state.config.plan_quotas)
        .await?
        .ok_or(AppError::Rejected(INVALID_LICENSE))?;

    Ok(Json(json!({
        "success": true,
        "license": license,
    })))
}
