//! Lifecycle tests against a mock ARM endpoint.
//!
//! These drive the real handlers through the real HTTP client, with
//! wiremock standing in for both the AAD token endpoint and Resource
//! Manager. The polling interval is dialled down to milliseconds so
//! long-running-operation paths finish instantly.

use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hemmer_provider_azure::resources::{
    dns_zone::DnsZoneResource, public_ip::PublicIpResource, resource_group::ResourceGroupResource,
    storage_account::StorageAccountResource, ResourceHandler,
};
use hemmer_provider_azure::{ArmClient, AzureEnvironment, ClientOptions, Credentials, ProviderError};

const RG_PATH: &str = "/subscriptions/sub/resourceGroups/rg";

fn credentials() -> Credentials {
    Credentials {
        subscription_id: "sub".to_string(),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        tenant_id: "test-tenant".to_string(),
    }
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/test-tenant/oauth2/token"))
        .and(body_string_contains("client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

/// Connect an [`ArmClient`] to the mock server. The returned sender keeps
/// the cancellation channel alive for the test's duration.
async fn connect(server: &MockServer) -> (ArmClient, watch::Sender<bool>) {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let client = ArmClient::connect(
        credentials(),
        AzureEnvironment::custom(server.uri(), server.uri()),
        ClientOptions {
            poll_interval: Duration::from_millis(5),
            poll_attempts: 10,
        },
        cancel_rx,
    )
    .await
    .expect("connect against mock");
    (client, cancel_tx)
}

#[tokio::test]
async fn resource_group_create_and_read() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    let body = json!({
        "id": RG_PATH,
        "name": "rg",
        "location": "westus",
        "tags": {"environment": "test"},
        "properties": {"provisioningState": "Succeeded"}
    });
    Mock::given(method("PUT"))
        .and(path(RG_PATH))
        .and(query_param("api-version", "2021-04-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let (client, _cancel) = connect(&server).await;
    let handler = ResourceGroupResource;

    let state = handler
        .create(
            &client,
            &json!({"name": "rg", "location": "West US", "tags": {"environment": "test"}}),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], RG_PATH);
    assert_eq!(state["location"], "westus");

    let read = handler.read(&client, &state).await.unwrap().unwrap();
    assert_eq!(read["tags"]["environment"], "test");
}

#[tokio::test]
async fn read_of_deleted_resource_clears_state() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "ResourceGroupNotFound", "message": "Resource group 'rg' could not be found."}
        })))
        .mount(&server)
        .await;

    let (client, _cancel) = connect(&server).await;
    let state = ResourceGroupResource
        .read(&client, &json!({"name": "rg"}))
        .await
        .unwrap();
    // 404 is the drift signal, never an error.
    assert!(state.is_none());
}

#[tokio::test]
async fn delete_is_idempotent() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    // First delete succeeds; every later one finds nothing.
    Mock::given(method("DELETE"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (client, _cancel) = connect(&server).await;
    let handler = ResourceGroupResource;
    let state = json!({"name": "rg"});

    handler.delete(&client, &state).await.unwrap();
    handler.delete(&client, &state).await.unwrap();
}

#[tokio::test]
async fn create_polls_until_provisioning_succeeds() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    let pip_path = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/pip1";
    // The PUT is accepted but not done yet.
    Mock::given(method("PUT"))
        .and(path(pip_path))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "name": "pip1",
            "properties": {"provisioningState": "Updating", "publicIPAllocationMethod": "Static"}
        })))
        .mount(&server)
        .await;
    // The poll sees the finished resource with its computed address.
    Mock::given(method("GET"))
        .and(path(pip_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": pip_path,
            "name": "pip1",
            "location": "westus",
            "properties": {
                "provisioningState": "Succeeded",
                "publicIPAllocationMethod": "Static",
                "ipAddress": "52.1.2.3"
            }
        })))
        .mount(&server)
        .await;

    let (client, _cancel) = connect(&server).await;
    let state = PublicIpResource
        .create(
            &client,
            &json!({
                "name": "pip1",
                "resource_group_name": "rg",
                "location": "westus",
                "allocation_method": "Static"
            }),
        )
        .await
        .unwrap();
    assert_eq!(state["ip_address"], "52.1.2.3");
    assert_eq!(state["id"], pip_path);
}

#[tokio::test]
async fn create_surfaces_failed_provisioning() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    let zone_path =
        "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com";
    Mock::given(method("PUT"))
        .and(path(zone_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "example.com",
            "properties": {"provisioningState": "Failed"}
        })))
        .mount(&server)
        .await;

    let (client, _cancel) = connect(&server).await;
    let err = DnsZoneResource
        .create(
            &client,
            &json!({"name": "example.com", "resource_group_name": "rg"}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::OperationFailed { .. }));
}

#[tokio::test]
async fn api_error_carries_operation_and_message() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("PUT"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {"code": "AnotherOperationInProgress", "message": "Another operation is in progress."}
        })))
        .mount(&server)
        .await;

    let (client, _cancel) = connect(&server).await;
    let err = ResourceGroupResource
        .create(&client, &json!({"name": "rg", "location": "westus"}))
        .await
        .unwrap_err();
    match err {
        ProviderError::Api {
            operation,
            status,
            message,
            ..
        } => {
            assert_eq!(operation, "resourceGroups.CreateOrUpdate");
            assert_eq!(status, 409);
            assert_eq!(message, "Another operation is in progress.");
        },
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn storage_account_create_fetches_access_keys() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    let account_path =
        "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/prodlogs01";
    Mock::given(method("PUT"))
        .and(path(account_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": account_path,
            "name": "prodlogs01",
            "location": "westus",
            "sku": {"name": "Standard_LRS"},
            "kind": "StorageV2",
            "properties": {
                "provisioningState": "Succeeded",
                "primaryEndpoints": {"blob": "https://prodlogs01.blob.core.windows.net/"}
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/listKeys", account_path)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [
                {"keyName": "key1", "value": "primary-secret", "permissions": "FULL"},
                {"keyName": "key2", "value": "secondary-secret", "permissions": "FULL"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _cancel) = connect(&server).await;
    let state = StorageAccountResource
        .create(
            &client,
            &json!({
                "name": "prodlogs01",
                "resource_group_name": "rg",
                "location": "westus",
                "account_tier": "Standard",
                "account_replication_type": "LRS"
            }),
        )
        .await
        .unwrap();
    assert_eq!(state["primary_access_key"], "primary-secret");
    assert_eq!(state["secondary_access_key"], "secondary-secret");
    assert_eq!(
        state["primary_blob_endpoint"],
        "https://prodlogs01.blob.core.windows.net/"
    );
}

#[tokio::test]
async fn bearer_token_is_cached_across_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/test-tenant/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": RG_PATH, "name": "rg", "location": "westus"
        })))
        .mount(&server)
        .await;

    let (client, _cancel) = connect(&server).await;
    let handler = ResourceGroupResource;
    for _ in 0..3 {
        handler
            .read(&client, &json!({"name": "rg"}))
            .await
            .unwrap()
            .unwrap();
    }
    // The expect(1) on the token mock verifies the cache on drop.
}

#[tokio::test]
async fn bad_credentials_fail_connect() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/test-tenant/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .mount(&server)
        .await;

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let err = ArmClient::connect(
        credentials(),
        AzureEnvironment::custom(server.uri(), server.uri()),
        ClientOptions::default(),
        cancel_rx,
    )
    .await
    .unwrap_err();
    match err {
        ProviderError::Auth(message) => assert!(message.contains("AADSTS7000215")),
        other => panic!("expected Auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn stop_cancels_polling() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    // Provisioning never finishes; only cancellation ends the wait.
    Mock::given(method("PUT"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "rg",
            "properties": {"provisioningState": "Updating"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "rg",
            "properties": {"provisioningState": "Updating"}
        })))
        .mount(&server)
        .await;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let client = ArmClient::connect(
        credentials(),
        AzureEnvironment::custom(server.uri(), server.uri()),
        ClientOptions {
            poll_interval: Duration::from_secs(30),
            poll_attempts: 10,
        },
        cancel_rx,
    )
    .await
    .unwrap();

    let create = tokio::spawn(async move {
        ResourceGroupResource
            .create(&client, &json!({"name": "rg", "location": "westus"}))
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel_tx.send_replace(true);

    let err = create.await.unwrap().unwrap_err();
    assert!(matches!(err, ProviderError::Cancelled(_)));
}
