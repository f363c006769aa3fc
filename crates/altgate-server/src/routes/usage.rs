use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, INVALID_LICENSE},
    extract::JsonBody,
    routes::required_license_key,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct UsageRequest {
    pub license_key: Option<String>,
}

/// `POST /usage`: current plan, quota and usage for a license.
///
/// Reading normalizes the row, so this is also where a new month's reset
/// first becomes visible to the plugin.
#[tracing::instrument(skip(state, req))]
pub async fn usage(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<UsageRequest>,
) -> Result<Json<Value>, AppError> {
    let license_key = required_license_key(req.license_key.as_deref())?;

    let license = state
        .db
        .get_license(license_key, &state.config.plan_quotas)
        .await?
        .ok_or(AppError::Rejected(INVALID_LICENSE))?;

    Ok(Json(json!({
        "success": true,
        "plan": license.plan,
        "monthly_quota": license.monthly_quota,
        "used_this_month": license.used_this_month,
    })))
}
