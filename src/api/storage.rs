//! Microsoft.Storage: storage accounts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Tags;
use crate::client::ArmConnection;
use crate::error::ProviderError;
use crate::resource_id::ResourceId;

const API_VERSION: &str = "2023-01-01";
const NAMESPACE: &str = "Microsoft.Storage";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<StorageSku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<StorageAccountProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StorageSku {
    /// Combined tier and replication, e.g. "Standard_LRS".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_https_traffic_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_endpoints: Option<StorageEndpoints>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StorageEndpoints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct StorageAccountKeys {
    #[serde(default)]
    pub keys: Vec<StorageAccountKey>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountKey {
    #[serde(default)]
    pub key_name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub permissions: Option<String>,
}

/// Client for storage account operations.
#[derive(Debug, Clone)]
pub struct StorageClient {
    conn: Arc<ArmConnection>,
}

impl StorageClient {
    pub(crate) fn new(conn: Arc<ArmConnection>) -> Self {
        Self { conn }
    }

    fn path(&self, resource_group: &str, name: &str) -> String {
        ResourceId::new(
            self.conn.subscription_id(),
            resource_group,
            NAMESPACE,
            "storageAccounts",
            name,
        )
        .path()
    }

    pub async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        account: &StorageAccount,
    ) -> Result<StorageAccount, ProviderError> {
        self.conn
            .put(
                "storageAccounts.Create",
                &self.path(resource_group, name),
                API_VERSION,
                account,
            )
            .await
    }

    pub async fn get(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<StorageAccount>, ProviderError> {
        self.conn
            .get(
                "storageAccounts.GetProperties",
                &self.path(resource_group, name),
                API_VERSION,
            )
            .await
    }

    pub async fn delete(&self, resource_group: &str, name: &str) -> Result<(), ProviderError> {
        self.conn
            .delete(
                "storageAccounts.Delete",
                &self.path(resource_group, name),
                API_VERSION,
            )
            .await
    }

    /// List the account's access keys (a POST action; the keys never
    /// appear in GET responses).
    pub async fn list_keys(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<StorageAccountKeys, ProviderError> {
        let path = format!("{}/listKeys", self.path(resource_group, name));
        self.conn
            .post("storageAccounts.ListKeys", &path, API_VERSION)
            .await
    }
}
