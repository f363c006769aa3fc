use thiserror::Error;

/// Caller-input errors detected before any I/O happens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("license_key is required")]
    MissingLicenseKey,

    #[error("exactly one of image_url or image_base64 is required")]
    MissingImageSource,

    #[error("send either image_url or image_base64, not both")]
    AmbiguousImageSource,
}
