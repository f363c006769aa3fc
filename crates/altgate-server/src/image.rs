use std::io::Cursor;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use tracing::debug;

use crate::config::Config;

use altgate_core::describe::PreparedImage;
use altgate_core::image_source::ImageSource;

/// Longest side, in pixels, of any image handed to the vision model.
pub const MAX_DIMENSION: u32 = 1024;

/// Fetches or decodes the caller's image and bounds it to
/// [`MAX_DIMENSION`] before it reaches the vision model.
///
/// Fetch failures, non-2xx responses and undecodable data are all errors;
/// nothing is retried.
#[derive(Clone)]
pub struct ImagePreprocessor {
    client: reqwest::Client,
    max_bytes: usize,
}

impl ImagePreprocessor {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.fetch_timeout().min(std::time::Duration::from_secs(5)))
            .timeout(config.fetch_timeout())
            .build()
            .context("image fetch client build failed")?;
        Ok(Self {
            client,
            max_bytes: config.max_image_bytes,
        })
    }

    /// Load `source` and return a bounded JPEG ready for the model.
    pub async fn prepare(&self, source: &ImageSource) -> Result<PreparedImage> {
        let bytes = match source {
            ImageSource::Url(url) => self.fetch(url).await?,
            ImageSource::Inline(data) => decode_inline(data)?,
        };
        if bytes.len() > self.max_bytes {
            bail!("image is {} bytes, limit is {}", bytes.len(), self.max_bytes);
        }
        // Decode and resize are CPU-bound; keep them off the async workers.
        tokio::task::spawn_blocking(move || downsample(&bytes))
            .await
            .context("image processing task failed")?
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("image fetch failed: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("image fetch returned {status}: {url}");
        }
        if let Some(len) = response.content_length() {
            if len > self.max_bytes as u64 {
                bail!("remote image is {len} bytes, limit is {}", self.max_bytes);
            }
        }

        // Chunked responses carry no length; enforce the cap while streaming.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("image body read failed: {url}"))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                bail!(
                    "remote image exceeds {} bytes, download aborted",
                    self.max_bytes
                );
            }
            body.extend_from_slice(&chunk);
        }
        debug!(url, bytes = body.len(), "Remote image fetched");
        Ok(body)
    }
}

/// Decode a base64 payload, accepting an optional `data:<mime>;base64,`
/// prefix and embedded whitespace or line breaks.
pub fn decode_inline(data: &str) -> Result<Vec<u8>> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .context("image_base64 is not valid base64")
}

/// Decode `bytes`, shrink to fit [`MAX_DIMENSION`] keeping the aspect ratio,
/// and re-encode as JPEG.
pub fn downsample(bytes: &[u8]) -> Result<PreparedImage> {
    let decoded = image::load_from_memory(bytes).context("image could not be decoded")?;

    let bounded = if decoded.width() > MAX_DIMENSION || decoded.height() > MAX_DIMENSION {
        decoded.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Triangle)
    } else {
        decoded
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(bounded.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Jpeg)
        .context("image re-encode failed")?;

    Ok(PreparedImage {
        bytes: out.into_inner(),
        mime: "image/jpeg",
        width: rgb.width(),
        height: rgb.height(),
    })
}
