//! Microsoft.ContainerRegistry: container registries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Tags;
use crate::client::ArmConnection;
use crate::error::ProviderError;
use crate::resource_id::ResourceId;

const API_VERSION: &str = "2023-07-01";
const NAMESPACE: &str = "Microsoft.ContainerRegistry";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<RegistrySku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<RegistryProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySku {
    /// "Basic", "Standard", or "Premium".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistryProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_user_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistryCredentials {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub passwords: Vec<RegistryPassword>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistryPassword {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Client for container registry operations.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    conn: Arc<ArmConnection>,
}

impl RegistryClient {
    pub(crate) fn new(conn: Arc<ArmConnection>) -> Self {
        Self { conn }
    }

    fn path(&self, resource_group: &str, name: &str) -> String {
        ResourceId::new(
            self.conn.subscription_id(),
            resource_group,
            NAMESPACE,
            "registries",
            name,
        )
        .path()
    }

    pub async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        registry: &Registry,
    ) -> Result<Registry, ProviderError> {
        self.conn
            .put(
                "registries.Create",
                &self.path(resource_group, name),
                API_VERSION,
                registry,
            )
            .await
    }

    pub async fn get(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<Registry>, ProviderError> {
        self.conn
            .get(
                "registries.Get",
                &self.path(resource_group, name),
                API_VERSION,
            )
            .await
    }

    pub async fn delete(&self, resource_group: &str, name: &str) -> Result<(), ProviderError> {
        self.conn
            .delete(
                "registries.Delete",
                &self.path(resource_group, name),
                API_VERSION,
            )
            .await
    }

    /// Fetch the admin user credentials; only meaningful when the admin
    /// user is enabled.
    pub async fn list_credentials(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<RegistryCredentials, ProviderError> {
        let path = format!("{}/listCredentials", self.path(resource_group, name));
        self.conn
            .post("registries.ListCredentials", &path, API_VERSION)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_request_shape() {
        let registry = Registry {
            location: Some("westus".to_string()),
            sku: Some(RegistrySku {
                name: Some("Basic".to_string()),
            }),
            properties: Some(RegistryProperties {
                admin_user_enabled: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let body = serde_json::to_value(&registry).unwrap();
        assert_eq!(body["sku"]["name"], "Basic");
        assert_eq!(body["properties"]["adminUserEnabled"], true);
        // Computed fields never serialize when unset.
        assert!(body["properties"].get("loginServer").is_none());
    }

    #[test]
    fn test_credentials_deserialize_without_passwords() {
        let credentials: RegistryCredentials =
            serde_json::from_value(json!({"username": "admin"})).unwrap();
        assert_eq!(credentials.username.as_deref(), Some("admin"));
        assert!(credentials.passwords.is_empty());
    }
}
