pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod image;
pub mod routes;
pub mod state;
pub mod vision;
pub mod webhook;
