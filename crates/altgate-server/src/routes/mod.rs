pub mod admin;
pub mod health;
pub mod optimize;
pub mod usage;
pub mod webhook;

use altgate_core::error::CoreError;

/// Trimmed, non-empty `license_key` from a request body.
pub(crate) fn required_license_key(raw: Option<&str>) -> Result<&str, CoreError> {
    raw.map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(CoreError::MissingLicenseKey)
}
