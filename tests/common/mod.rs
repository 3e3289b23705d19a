//! Shared helpers for the wiremock-backed integration tests

#![allow(dead_code)]

use gcp_snippets::gcp::auth::GcpCredentials;
use gcp_snippets::gcp::client::{Endpoints, GcpClient};
use gcp_snippets::gcp::operation::PollPolicy;
use wiremock::MockServer;

pub const PROJECT: &str = "test-project";
pub const ZONE: &str = "us-central1-a";

/// Client whose every service points at the mock server
pub fn test_client(server: &MockServer) -> GcpClient {
    GcpClient::with_credentials(GcpCredentials::from_token("test-token"))
        .expect("client")
        .with_endpoints(Endpoints::with_base_url(&server.uri()))
        .with_poll_policy(PollPolicy::immediate(5))
}

/// Captured snippet output as a string
pub fn output(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf).into_owned()
}
