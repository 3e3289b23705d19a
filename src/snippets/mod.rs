//! Snippets
//!
//! One function per API call. Each takes an output writer and a
//! [`GcpClient`](crate::gcp::GcpClient), performs one request (waiting on the
//! operation if one is returned), writes a short confirmation and returns the
//! resource.

pub mod compute;
pub mod genai;
pub mod iam;
pub mod iot;
pub mod pubsub;
pub mod pubsublite;
pub mod storagetransfer;
pub mod translate;
