//! Google Cloud API snippets
//!
//! Small, independent functions, each demonstrating one call against a
//! Google Cloud REST API, sharing a thin authenticated client.

pub mod config;
pub mod gcp;
pub mod snippets;

/// Version injected at compile time via GCP_SNIPPETS_VERSION (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("GCP_SNIPPETS_VERSION") {
    Some(v) => v,
    None => "dev",
};
