/// Re-export `Config` from `altgate-core` for use within this crate.
///
/// All environment-variable parsing lives in `altgate-core` so integration
/// tests can build a `Config` directly with fake secrets.
pub use altgate_core::config::Config;
