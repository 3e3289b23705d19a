//! Integration tests for the GCP HTTP client using wiremock
//!
//! These tests verify the client, pagination and operation polling against
//! mocked endpoints, including error statuses and empty bodies.

mod common;

use common::test_client;
use gcp_snippets::gcp::client::format_gcp_error;
use gcp_snippets::gcp::http::{is_not_found, ApiError, GcpHttpClient};
use gcp_snippets::gcp::operation::{wait_operation, Operation};
use gcp_snippets::gcp::pager::{list_aggregated, list_all};
use serde_json::json;
use wiremock::matchers::{bearer_token, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test module for HTTP client integration tests
mod http_client_tests {
    use super::*;

    /// Test successful GET request returns parsed JSON
    #[tokio::test]
    async fn test_get_success_returns_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/zones/us-central1-a/instances"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"name": "instance-1", "status": "RUNNING"},
                    {"name": "instance-2", "status": "STOPPED"}
                ]
            })))
            .mount(&server)
            .await;

        let http = GcpHttpClient::new().unwrap();
        let url = format!(
            "{}/compute/v1/projects/test-project/zones/us-central1-a/instances",
            server.uri()
        );

        let response = http.get(&url, "test-token").await.unwrap();

        assert_eq!(response["items"].as_array().unwrap().len(), 2);
        assert_eq!(response["items"][0]["name"], "instance-1");
    }

    /// Test 401 response maps to an authentication message
    #[tokio::test]
    async fn test_401_returns_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/projects/test-project/topics"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": 401, "message": "Request had invalid authentication credentials."}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .get(&client.pubsub_url("projects/test-project/topics"))
            .await
            .unwrap_err();

        let api = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api.status, 401);
        assert!(format_gcp_error(&err).starts_with("Authentication failed"));
    }

    /// Test 403 response indicates permission denied
    #[tokio::test]
    async fn test_403_returns_forbidden() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/projects/test-project/roles"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "Permission 'iam.roles.list' denied"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .get(&client.iam_url("projects/test-project/roles"))
            .await
            .unwrap_err();

        assert_eq!(
            format_gcp_error(&err),
            "Permission denied. Check your GCP IAM permissions."
        );
    }

    /// Test 404 response for non-existent resources
    #[tokio::test]
    async fn test_404_returns_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/projects/test-project/subscriptions/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "Resource not found (resource=missing).", "status": "NOT_FOUND"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .get(&client.pubsub_url("projects/test-project/subscriptions/missing"))
            .await
            .unwrap_err();

        assert!(is_not_found(&err));
        assert_eq!(
            err.downcast_ref::<ApiError>().unwrap().message,
            "Resource not found (resource=missing)."
        );
    }

    /// Test POST request with JSON body
    #[tokio::test]
    async fn test_post_with_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/test-project/topics/t1:publish"))
            .and(bearer_token("test-token"))
            .and(body_json(json!({"messages": [{"data": "aGk="}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messageIds": ["1"]})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let response = client
            .post(
                &client.pubsub_url("projects/test-project/topics/t1:publish"),
                Some(&json!({"messages": [{"data": "aGk="}]})),
            )
            .await
            .unwrap();

        assert_eq!(response["messageIds"][0], "1");
    }

    /// Test DELETE request with an empty body
    #[tokio::test]
    async fn test_delete_request() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/v1/projects/test-project/topics/t1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let response = client
            .delete(&client.pubsub_url("projects/test-project/topics/t1"))
            .await
            .unwrap();

        assert!(response.is_null());
    }

    /// Test empty JSON object response handling
    #[tokio::test]
    async fn test_empty_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/test-project/subscriptions/s1:acknowledge"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let response = client
            .post(
                &client.pubsub_url("projects/test-project/subscriptions/s1:acknowledge"),
                Some(&json!({"ackIds": ["a"]})),
            )
            .await
            .unwrap();

        assert_eq!(response, json!({}));
    }

    /// Test rate limiting (429) response
    #[tokio::test]
    async fn test_rate_limit_429() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/projects/test-project/topics"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .get(&client.pubsub_url("projects/test-project/topics"))
            .await
            .unwrap_err();

        let api = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api.status, 429);
        assert_eq!(api.message, "Too Many Requests");
        assert_eq!(format_gcp_error(&err), "Rate limit exceeded. Please try again later.");
    }

    /// Test pagination with nextPageToken
    #[tokio::test]
    async fn test_pagination_with_next_page_token() {
        let server = MockServer::start().await;

        // Second page, matched first when the token is present
        Mock::given(method("GET"))
            .and(path("/v1/projects/test-project/topics"))
            .and(query_param("pageToken", "token-page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "topics": [
                    {"name": "projects/test-project/topics/t3"},
                    {"name": "projects/test-project/topics/t4"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        // First page
        Mock::given(method("GET"))
            .and(path("/v1/projects/test-project/topics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "topics": [
                    {"name": "projects/test-project/topics/t1"},
                    {"name": "projects/test-project/topics/t2"}
                ],
                "nextPageToken": "token-page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let topics = list_all(&client, &client.pubsub_url("projects/test-project/topics"), "topics")
            .await
            .unwrap();

        let names: Vec<&str> = topics.iter().filter_map(|t| t["name"].as_str()).collect();
        assert_eq!(
            names,
            [
                "projects/test-project/topics/t1",
                "projects/test-project/topics/t2",
                "projects/test-project/topics/t3",
                "projects/test-project/topics/t4",
            ]
        );
    }

    /// Aggregated lists drop warning-only scopes
    #[tokio::test]
    async fn test_aggregated_list_groups_by_scope() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/aggregated/instances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": {
                    "zones/us-central1-a": {"instances": [{"name": "a"}, {"name": "b"}]},
                    "zones/europe-west1-b": {"instances": [{"name": "c"}]},
                    "zones/asia-east1-a": {"warning": {"code": "NO_RESULTS_ON_PAGE"}}
                }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let grouped = list_aggregated(
            &client,
            &client.compute_aggregated_url("test-project", "instances"),
            "instances",
        )
        .await
        .unwrap();

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["zones/us-central1-a"].len(), 2);
        assert_eq!(grouped["zones/europe-west1-b"][0]["name"], "c");
    }
}

mod operation_tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_operation_polls_until_done() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/operations/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/op-1",
                "done": true,
                "response": {"name": "result"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let op = Operation {
            name: "operations/op-1".to_string(),
            ..Default::default()
        };
        let response = wait_operation(&client, &client.endpoints.pubsub(), op)
            .await
            .unwrap();

        assert_eq!(response["name"], "result");
    }

    #[tokio::test]
    async fn test_wait_operation_surfaces_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/operations/op-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/op-2",
                "done": true,
                "error": {"code": 9, "message": "precondition failed"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let op = Operation {
            name: "operations/op-2".to_string(),
            ..Default::default()
        };
        let err = wait_operation(&client, &client.endpoints.pubsub(), op)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("precondition failed"));
    }

    #[tokio::test]
    async fn test_wait_operation_gives_up_after_bound() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/operations/op-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/op-3",
                "done": false
            })))
            .expect(5)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let op = Operation {
            name: "operations/op-3".to_string(),
            ..Default::default()
        };
        let err = wait_operation(&client, &client.endpoints.pubsub(), op)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("did not finish after 5 polls"));
    }
}
