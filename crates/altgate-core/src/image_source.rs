use crate::error::CoreError;

/// Where the image to describe comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Remote image fetched over HTTP(S).
    Url(String),
    /// Base64 payload, optionally wrapped in a `data:<mime>;base64,` URL.
    Inline(String),
}

impl ImageSource {
    /// Build from the two optional request fields. Blank strings count as
    /// absent; exactly one must remain.
    pub fn from_parts(
        image_url: Option<&str>,
        image_base64: Option<&str>,
    ) -> Result<Self, CoreError> {
        let url = image_url.map(str::trim).filter(|s| !s.is_empty());
        let data = image_base64.map(str::trim).filter(|s| !s.is_empty());
        match (url, data) {
            (Some(url), None) => Ok(ImageSource::Url(url.to_string())),
            (None, Some(data)) => Ok(ImageSource::Inline(data.to_string())),
            (Some(_), Some(_)) => Err(CoreError::AmbiguousImageSource),
            (None, None) => Err(CoreError::MissingImageSource),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ImageSource::Url(_) => "url",
            ImageSource::Inline(_) => "inline",
        }
    }
}
