//! Cloud IoT registry, device and manager tests

mod common;

use common::{output, test_client, PROJECT};
use gcp_snippets::snippets::iot::{devices, manager, registries};
use serde_json::json;
use std::io::Write as _;
use tempfile::NamedTempFile;
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REGISTRY: &str = "/v1/projects/test-project/locations/us-central1/registries/reg1";

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

mod registry_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_registry_with_topic() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/test-project/locations/us-central1/registries"))
            .and(body_partial_json(json!({
                "id": "reg1",
                "eventNotificationConfigs": [{"pubsubTopicName": "projects/test-project/topics/t1"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "reg1",
                "name": "projects/test-project/locations/us-central1/registries/reg1",
                "httpConfig": {"httpEnabledState": "HTTP_ENABLED"},
                "mqttConfig": {"mqttEnabledState": "MQTT_ENABLED"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        registries::create_registry(
            &mut out,
            &client,
            PROJECT,
            "us-central1",
            "reg1",
            "projects/test-project/topics/t1",
        )
        .await
        .unwrap();

        assert_eq!(
            output(&out),
            "Created registry:\n\tID: reg1\n\tHTTP: HTTP_ENABLED\n\tMQTT: MQTT_ENABLED\n\
             \tName: projects/test-project/locations/us-central1/registries/reg1\n"
        );
    }

    #[tokio::test]
    async fn test_set_registry_iam_replaces_policy() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("{}:setIamPolicy", REGISTRY)))
            .and(body_json(json!({
                "policy": {"bindings": [{"role": "roles/viewer", "members": ["user:a@example.com"]}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bindings": [{"role": "roles/viewer", "members": ["user:a@example.com"]}],
                "etag": "BwX"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        let policy = registries::set_registry_iam(
            &mut out,
            &client,
            PROJECT,
            "us-central1",
            "reg1",
            "user:a@example.com",
            "roles/viewer",
        )
        .await
        .unwrap();

        assert_eq!(policy.bindings.len(), 1);
        assert_eq!(output(&out), "Set policy!\n");
    }

    #[tokio::test]
    async fn test_get_registry_iam_prints_bindings() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("{}:getIamPolicy", REGISTRY)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bindings": [{"role": "roles/viewer", "members": ["user:a@example.com", "group:g@example.com"]}]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        registries::get_registry_iam(&mut out, &client, PROJECT, "us-central1", "reg1")
            .await
            .unwrap();

        assert_eq!(
            output(&out),
            "Policy:\nRole: roles/viewer\n\tMember: user:a@example.com\n\tMember: group:g@example.com\n"
        );
    }
}

mod device_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_es_device_reads_key_file() {
        let server = MockServer::start().await;
        let mut key = NamedTempFile::new().unwrap();
        write!(key, "-----BEGIN PUBLIC KEY-----\nabc\n-----END PUBLIC KEY-----\n").unwrap();

        Mock::given(method("POST"))
            .and(path(format!("{}/devices", REGISTRY)))
            .and(body_partial_json(json!({
                "id": "dev1",
                "credentials": [{"publicKey": {
                    "format": "ES256_PEM",
                    "key": "-----BEGIN PUBLIC KEY-----\nabc\n-----END PUBLIC KEY-----\n"
                }}]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "dev1", "numId": "42"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        let device = devices::create_es_device(
            &mut out,
            &client,
            PROJECT,
            "us-central1",
            "reg1",
            "dev1",
            key.path(),
        )
        .await
        .unwrap();

        assert_eq!(device.num_id.as_deref(), Some("42"));
        assert_eq!(output(&out), "Successfully created device.\n");
    }

    #[tokio::test]
    async fn test_missing_key_file_sends_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        let err = devices::patch_device_rsa(
            &mut out,
            &client,
            PROJECT,
            "us-central1",
            "reg1",
            "dev1",
            std::path::Path::new("/nonexistent/rsa_cert.pem"),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("error reading key file"));
    }

    #[tokio::test]
    async fn test_patch_device_masks_credentials() {
        let server = MockServer::start().await;
        let mut cert = NamedTempFile::new().unwrap();
        write!(cert, "CERT").unwrap();

        Mock::given(method("PATCH"))
            .and(path(format!("{}/devices/dev1", REGISTRY)))
            .and(query_param("updateMask", "credentials"))
            .and(body_partial_json(json!({
                "credentials": [{"publicKey": {"format": "RSA_X509_PEM", "key": "CERT"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "dev1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        devices::patch_device_rsa(
            &mut out,
            &client,
            PROJECT,
            "us-central1",
            "reg1",
            "dev1",
            cert.path(),
        )
        .await
        .unwrap();

        assert_eq!(output(&out), "Successfully patched device.\n");
    }

    #[tokio::test]
    async fn test_set_config_encodes_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("{}/devices/dev1:modifyCloudToDeviceConfig", REGISTRY)))
            .and(body_json(json!({"binaryData": "aGVsbG8="})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "version": "3",
                "binaryData": "aGVsbG8="
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        let config = devices::set_config(
            &mut out,
            &client,
            PROJECT,
            "us-central1",
            "reg1",
            "dev1",
            "hello",
        )
        .await
        .unwrap();

        assert_eq!(config.version, 3);
        assert_eq!(output(&out), "Config set!\nVersion now: 3\n");
    }

    #[tokio::test]
    async fn test_device_states_without_history() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{}/devices/dev1/states", REGISTRY)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        let states = devices::get_device_states(
            &mut out,
            &client,
            PROJECT,
            "us-central1",
            "reg1",
            "dev1",
        )
        .await
        .unwrap();

        assert!(states.is_empty());
        assert_eq!(output(&out), "Successfully retrieved device states!\n");
    }
}

mod manager_tests {
    use super::*;

    #[tokio::test]
    async fn test_no_command_prints_usage() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        let mut out = Vec::new();

        let err = manager::run(&mut out, &client, PROJECT, &[]).await.unwrap_err();

        assert_eq!(err.to_string(), "no command given");
        assert!(output(&out).starts_with("Usage:\n\tRegistry Management\n"));
    }

    #[tokio::test]
    async fn test_unknown_command_prints_usage() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        let mut out = Vec::new();

        let err = manager::run(&mut out, &client, PROJECT, &args(&["rebootDevice"]))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Unknown command: rebootDevice");
        assert!(output(&out).contains("Device Management"));
    }

    #[tokio::test]
    async fn test_wrong_arity_reports_command_usage() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        let mut out = Vec::new();

        let err = manager::run(&mut out, &client, PROJECT, &args(&["getDevice", "us-central1"]))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Wrong number of arguments. Usage:\n\tgetDevice <cloud-region> <registry-id> <device-id>"
        );
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_dispatches_list_devices() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{}/devices", REGISTRY)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "devices": [{"id": "dev1"}, {"id": "dev2"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        manager::run(
            &mut out,
            &client,
            PROJECT,
            &args(&["listDevices", "us-central1", "reg1"]),
        )
        .await
        .unwrap();

        assert_eq!(output(&out), "Devices:\n\tdev1\n\tdev2\n");
    }

    #[tokio::test]
    async fn test_dispatches_delete_device() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path(format!("{}/devices/dev1", REGISTRY)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        manager::run(
            &mut out,
            &client,
            PROJECT,
            &args(&["deleteDevice", "us-central1", "reg1", "dev1"]),
        )
        .await
        .unwrap();

        assert_eq!(output(&out), "Deleted device!\n");
    }
}
