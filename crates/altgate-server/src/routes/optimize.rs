use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use altgate_core::describe::render_template;
use altgate_core::image_source::ImageSource;
use altgate_core::language::PromptLanguage;
use altgate_core::license::UsageSnapshot;

use crate::{
    error::{AppError, INVALID_LICENSE, QUOTA_EXCEEDED},
    extract::JsonBody,
    routes::required_license_key,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct OptimizeImageRequest {
    pub license_key: Option<String>,
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
    /// Alt-text template containing `{description}`.
    pub template: Option<String>,
    /// `pt-BR` (default) or `en-US`.
    pub lang: Option<String>,
}

/// `POST /optimize/image`: generate alt text for one image.
///
/// Order matters: input validation, license and quota check, preprocessing,
/// generation, and only then the usage increment. A failure anywhere before
/// the increment leaves the counter untouched.
///
/// The quota check and the increment are separate statements, so concurrent
/// requests for a key at `quota - 1` can each pass the check and leave usage
/// slightly above the quota. No increment is ever lost.
#[tracing::instrument(skip(state, req))]
pub async fn optimize_image(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<OptimizeImageRequest>,
) -> Result<Json<Value>, AppError> {
    let license_key = required_license_key(req.license_key.as_deref())?;
    let source = ImageSource::from_parts(req.image_url.as_deref(), req.image_base64.as_deref())?;

    let license = state
        .db
        .get_license(license_key, &state.config.plan_quotas)
        .await?
        .ok_or(AppError::Rejected(INVALID_LICENSE))?;

    if license.quota_exhausted() {
        info!(
            license_key,
            plan = %license.plan,
            used = license.used_this_month,
            quota = license.monthly_quota,
            "Optimize rejected: quota exhausted"
        );
        return Err(AppError::Rejected(QUOTA_EXCEEDED));
    }

    let image = state.images.prepare(&source).await?;
    let language = PromptLanguage::from_code(req.lang.as_deref());
    let description = state.describer.describe(&image, language).await?;
    let alt = render_template(req.template.as_deref(), description.trim());

    state.db.increment_usage(license_key).await?;

    let usage = UsageSnapshot {
        used_this_month: license.used_this_month + 1,
        ..license.usage()
    };
    let remaining = (usage.monthly_quota - usage.used_this_month).max(0);
    info!(
        license_key,
        source = source.kind(),
        lang = language.code(),
        remaining,
        "Alt text generated"
    );

    Ok(Json(json!({
        "success": true,
        "alt": alt,
        "remaining": remaining,
        "usage": usage,
    })))
}
