//! GCP API interaction module
//!
//! This module provides the plumbing every snippet shares: authentication,
//! the HTTP client, per-service endpoints, pagination and long-running
//! operation polling.
//!
//! # Module Structure
//!
//! - [`auth`] - GCP authentication using Application Default Credentials
//! - [`client`] - Main GCP client and per-service URL builders
//! - [`http`] - HTTP utilities for REST API calls and the API error type
//! - [`iam_policy`] - IAM allow policy shared by several services
//! - [`int64`] - serde adapter for proto3 JSON int64 strings
//! - [`operation`] - Waiting on long-running operations
//! - [`pager`] - Draining paginated list calls
//!
//! # Example
//!
//! ```ignore
//! use gcp_snippets::gcp::client::GcpClient;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new().await?;
//!     let url = client.compute_zonal_url("my-project", "us-central1-a", "instances");
//!     let instances = client.get(&url).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
pub mod iam_policy;
pub mod int64;
pub mod operation;
pub mod pager;

pub use client::GcpClient;
