pub mod config;
pub mod describe;
pub mod error;
pub mod image_source;
pub mod language;
pub mod license;
pub mod plan;
