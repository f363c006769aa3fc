use std::sync::Arc;

use anyhow::Result;

use altgate_core::describe::DescriptionModel;
use altgate_duckdb::DuckDbBackend;

use crate::{config::Config, image::ImagePreprocessor, vision::OpenAiVision};

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
///
/// Everything here is read-only after startup. The only mutable resource is
/// the database, whose connection is serialised inside [`DuckDbBackend`].
pub struct AppState {
    pub db: Arc<DuckDbBackend>,

    /// Parsed configuration, loaded once at startup.
    pub config: Arc<Config>,

    pub images: ImagePreprocessor,

    /// Vision backend. [`OpenAiVision`] in production; tests swap in fakes
    /// through [`AppState::with_describer`].
    pub describer: Arc<dyn DescriptionModel>,
}

impl AppState {
    /// Construct the production state: OpenAI-compatible vision client plus
    /// the image preprocessor, both configured from `config`.
    pub fn new(db: DuckDbBackend, config: Config) -> Result<Self> {
        let describer = Arc::new(OpenAiVision::new(&config)?);
        Self::with_describer(db, config, describer)
    }

    pub fn with_describer(
        db: DuckDbBackend,
        config: Config,
        describer: Arc<dyn DescriptionModel>,
    ) -> Result<Self> {
        Ok(Self {
            db: Arc::new(db),
            images: ImagePreprocessor::new(&config)?,
            config: Arc::new(config),
            describer,
        })
    }
}
