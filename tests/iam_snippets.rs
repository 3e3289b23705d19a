//! IAM snippets against a mocked IAM / Resource Manager API

mod common;

use common::{output, test_client, PROJECT};
use gcp_snippets::gcp::iam_policy::{Policy, EDITOR, VIEWER};
use gcp_snippets::snippets::iam;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DENY_ROOT: &str =
    "/v2/policies/cloudresourcemanager.googleapis.com%2Fprojects%2Ftest-project/denypolicies";

mod roles {
    use super::*;

    #[tokio::test]
    async fn test_create_role_posts_role_id_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/test-project/roles"))
            .and(body_partial_json(json!({
                "roleId": "myRole",
                "role": {
                    "title": "My Role",
                    "includedPermissions": ["pubsub.topics.get"],
                    "stage": "GA"
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/test-project/roles/myRole",
                "title": "My Role",
                "includedPermissions": ["pubsub.topics.get"],
                "stage": "GA",
                "etag": "BwW="
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        let role = iam::create_role(
            &mut out,
            &client,
            "myRole",
            PROJECT,
            "My Role",
            "A custom role",
            &["pubsub.topics.get".to_string()],
            "GA",
        )
        .await
        .unwrap();

        assert_eq!(role.name, "projects/test-project/roles/myRole");
        assert_eq!(output(&out), "Created role: projects/test-project/roles/myRole\n");
    }

    #[tokio::test]
    async fn test_disable_role_patches_stage() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/projects/test-project/roles/myRole"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/test-project/roles/myRole",
                "title": "My Role",
                "stage": "GA"
            })))
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/v1/projects/test-project/roles/myRole"))
            .and(body_partial_json(json!({"stage": "DISABLED", "title": "My Role"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/test-project/roles/myRole",
                "title": "My Role",
                "stage": "DISABLED"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        let role = iam::disable_role(&mut out, &client, "myRole", PROJECT).await.unwrap();

        assert_eq!(role.stage.as_deref(), Some("DISABLED"));
        assert_eq!(output(&out), "Disabled role: projects/test-project/roles/myRole\n");
    }

    #[tokio::test]
    async fn test_delete_and_undelete_role() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/v1/projects/test-project/roles/myRole"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/test-project/roles/myRole",
                "deleted": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/test-project/roles/myRole:undelete"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/test-project/roles/myRole"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        iam::delete_role(&mut out, &client, "myRole", PROJECT).await.unwrap();
        let role = iam::undelete_role(&mut out, &client, "myRole", PROJECT).await.unwrap();

        assert!(!role.deleted);
        assert_eq!(
            output(&out),
            "Deleted role: myRole\nUndeleted role: projects/test-project/roles/myRole\n"
        );
    }

    #[tokio::test]
    async fn test_grantable_roles_follow_body_page_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/roles:queryGrantableRoles"))
            .and(body_partial_json(json!({"pageToken": "p2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "roles": [{"name": "roles/editor", "title": "Editor", "description": "Edit"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/roles:queryGrantableRoles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "roles": [{"name": "roles/viewer", "title": "Viewer", "description": "View"}],
                "nextPageToken": "p2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        let roles = iam::view_grantable_roles(
            &mut out,
            &client,
            "//cloudresourcemanager.googleapis.com/projects/test-project",
        )
        .await
        .unwrap();

        let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["roles/viewer", "roles/editor"]);
        assert!(output(&out).starts_with("Title: Viewer\nName: roles/viewer\n"));
    }
}

mod service_accounts {
    use super::*;

    const EMAIL: &str = "sa-1@test-project.iam.gserviceaccount.com";

    #[tokio::test]
    async fn test_create_and_rename_service_account() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/test-project/serviceAccounts"))
            .and(body_partial_json(json!({
                "accountId": "sa-1",
                "serviceAccount": {"displayName": "First"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": format!("projects/test-project/serviceAccounts/{}", EMAIL),
                "email": EMAIL,
                "displayName": "First"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/v1/projects/-/serviceAccounts/{}", EMAIL)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "email": EMAIL,
                "displayName": "First"
            })))
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path(format!("/v1/projects/-/serviceAccounts/{}", EMAIL)))
            .and(body_partial_json(json!({
                "serviceAccount": {"displayName": "Second"},
                "updateMask": "displayName"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "email": EMAIL,
                "displayName": "Second"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        iam::create_service_account(&mut out, &client, PROJECT, "sa-1", "First")
            .await
            .unwrap();
        let renamed = iam::rename_service_account(&mut out, &client, EMAIL, "Second")
            .await
            .unwrap();

        assert_eq!(renamed.display_name, "Second");
        assert_eq!(
            output(&out),
            format!(
                "Created service account: {}\nUpdated service account: {}\n",
                EMAIL, EMAIL
            )
        );
    }

    #[tokio::test]
    async fn test_disable_enable_delete() {
        let server = MockServer::start().await;

        for action in [":disable", ":enable"] {
            Mock::given(method("POST"))
                .and(path(format!("/v1/projects/-/serviceAccounts/{}{}", EMAIL, action)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("DELETE"))
            .and(path(format!("/v1/projects/-/serviceAccounts/{}", EMAIL)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        iam::disable_service_account(&mut out, &client, EMAIL).await.unwrap();
        iam::enable_service_account(&mut out, &client, EMAIL).await.unwrap();
        iam::delete_service_account(&mut out, &client, EMAIL).await.unwrap();

        let text = output(&out);
        assert!(text.contains("Disabled service account"));
        assert!(text.contains("Enabled service account"));
        assert!(text.contains("Deleted service account"));
    }

    #[tokio::test]
    async fn test_create_and_list_keys() {
        let server = MockServer::start().await;
        let key_name = format!("projects/test-project/serviceAccounts/{}/keys/abc123", EMAIL);

        Mock::given(method("POST"))
            .and(path(format!("/v1/projects/-/serviceAccounts/{}/keys", EMAIL)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": key_name,
                "privateKeyData": "e30="
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/v1/projects/-/serviceAccounts/{}/keys", EMAIL)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keys": [{"name": key_name}]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        let key = iam::create_key(&mut out, &client, EMAIL).await.unwrap();
        let keys = iam::list_keys(&mut out, &client, EMAIL).await.unwrap();

        assert_eq!(key.private_key_data.as_deref(), Some("e30="));
        assert_eq!(keys.len(), 1);
        assert!(output(&out).contains(&format!("Created key: {}", key_name)));
    }
}

mod project_policy {
    use super::*;

    fn current_policy() -> serde_json::Value {
        json!({
            "version": 1,
            "etag": "BwX=",
            "bindings": [
                {"role": VIEWER, "members": ["user:a@example.com"]},
                {"role": EDITOR, "members": ["user:b@example.com"]}
            ]
        })
    }

    #[tokio::test]
    async fn test_add_member_read_modify_write() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/test-project:getIamPolicy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_policy()))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/test-project:setIamPolicy"))
            .and(body_partial_json(json!({
                "policy": {
                    "etag": "BwX=",
                    "bindings": [
                        {"role": VIEWER, "members": ["user:a@example.com", "user:c@example.com"]},
                        {"role": EDITOR, "members": ["user:b@example.com"]}
                    ]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_policy()))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        iam::add_member(&mut out, &client, PROJECT, "user:c@example.com", VIEWER)
            .await
            .unwrap();

        assert_eq!(output(&out), "Added member user:c@example.com to roles/viewer\n");
    }

    #[tokio::test]
    async fn test_add_member_requires_bound_role() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/test-project:getIamPolicy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_policy()))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = iam::add_member(
            &mut std::io::sink(),
            &client,
            PROJECT,
            "user:c@example.com",
            "roles/owner",
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("roles/owner is not bound"));
    }

    #[tokio::test]
    async fn test_remove_member_drops_empty_binding() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/test-project:getIamPolicy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_policy()))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/test-project:setIamPolicy"))
            .and(body_partial_json(json!({
                "policy": {"bindings": [{"role": VIEWER, "members": ["user:a@example.com"]}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bindings": [{"role": VIEWER, "members": ["user:a@example.com"]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        let policy: Policy =
            iam::remove_member(&mut out, &client, PROJECT, "user:b@example.com", EDITOR)
                .await
                .unwrap();

        assert_eq!(policy.roles(), vec![VIEWER]);
        assert_eq!(output(&out), "Removed member user:b@example.com from roles/editor\n");
    }
}

mod deny_policies {
    use super::*;

    fn policy_name() -> String {
        "policies/cloudresourcemanager.googleapis.com%2Fprojects%2Ftest-project/denypolicies/deny-1"
            .to_string()
    }

    #[tokio::test]
    async fn test_create_deny_policy_waits_for_operation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(DENY_ROOT))
            .and(query_param("policyId", "deny-1"))
            .and(body_partial_json(json!({"displayName": "Restrict project deletion access"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "policies/x/operations/op-1",
                "done": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2/policies/x/operations/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "policies/x/operations/op-1",
                "done": true,
                "response": {"name": policy_name(), "etag": "abc"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        let policy = iam::create_deny_policy(&mut out, &client, PROJECT, "deny-1")
            .await
            .unwrap();

        assert_eq!(policy.etag.as_deref(), Some("abc"));
        assert_eq!(output(&out), format!("Policy {} created\n", policy_name()));
    }

    #[tokio::test]
    async fn test_update_deny_policy_requires_etag() {
        let server = MockServer::start().await;
        let client = test_client(&server);

        let err = iam::update_deny_policy(&mut std::io::sink(), &client, PROJECT, "deny-1", "")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("etag is required"));
    }

    #[tokio::test]
    async fn test_update_deny_policy_puts_with_etag() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(format!("{}/deny-1", DENY_ROOT)))
            .and(body_partial_json(json!({"etag": "abc"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "policies/x/operations/op-2",
                "done": true,
                "response": {"name": policy_name(), "etag": "def"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        let policy = iam::update_deny_policy(&mut out, &client, PROJECT, "deny-1", "abc")
            .await
            .unwrap();

        assert_eq!(policy.etag.as_deref(), Some("def"));
        assert_eq!(output(&out), format!("Policy {} updated\n", policy_name()));
    }

    #[tokio::test]
    async fn test_list_and_delete_deny_policies() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(DENY_ROOT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "policies": [{"name": policy_name()}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path(format!("{}/deny-1", DENY_ROOT)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "policies/x/operations/op-3",
                "done": true,
                "response": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut out = Vec::new();
        let policies = iam::list_deny_policies(&mut out, &client, PROJECT).await.unwrap();
        iam::delete_deny_policy(&mut out, &client, PROJECT, "deny-1").await.unwrap();

        assert_eq!(policies.len(), 1);
        assert_eq!(
            output(&out),
            format!("- Policy {} found\nPolicy {} deleted\n", policy_name(), policy_name())
        );
    }
}
