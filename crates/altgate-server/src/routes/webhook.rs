use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use altgate_duckdb::license::UpsertLicenseParams;

use crate::{
    error::AppError,
    state::AppState,
    webhook::{parse_event, verify_signature, SIGNATURE_HEADER},
};

/// `POST /freemius/webhook`: license create/update from the billing provider.
///
/// The signature is checked over the raw body before anything is parsed; a
/// missing or wrong signature leaves the store untouched.
#[tracing::instrument(skip(state, headers, body))]
pub async fn freemius_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if !verify_signature(&state.config.webhook_secret, &body, signature) {
        warn!(
            has_signature = signature.is_some(),
            "Webhook signature verification failed"
        );
        return Err(AppError::Unauthorized);
    }

    let event = parse_event(&body).map_err(|e| {
        warn!(error = %e, "Webhook payload rejected");
        AppError::BadRequest(e.to_string())
    })?;

    let monthly_quota = state.config.plan_quotas.quota(event.plan);
    state
        .db
        .upsert_license(UpsertLicenseParams {
            license_key: event.license_key.clone(),
            plan: event.plan,
            monthly_quota,
            site_url: event.site_url,
        })
        .await?;

    info!(
        license_key = %event.license_key,
        plan = %event.plan,
        plan_name = event.plan_name.as_deref().unwrap_or(""),
        "Webhook applied"
    );
    Ok(Json(json!({ "success": true })))
}
