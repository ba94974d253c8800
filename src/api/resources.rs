//! Microsoft.Resources: resource groups.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Tags;
use crate::client::ArmConnection;
use crate::error::ProviderError;
use crate::resource_id::ResourceId;

const API_VERSION: &str = "2021-04-01";

/// A resource group as returned by ARM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceGroupProperties>,
}

/// Resource group properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// Client for resource group operations.
#[derive(Debug, Clone)]
pub struct ResourceGroupsClient {
    conn: Arc<ArmConnection>,
}

impl ResourceGroupsClient {
    pub(crate) fn new(conn: Arc<ArmConnection>) -> Self {
        Self { conn }
    }

    fn path(&self, name: &str) -> String {
        ResourceId::resource_group(self.conn.subscription_id(), name).path()
    }

    /// Create or update a resource group.
    pub async fn create_or_update(
        &self,
        name: &str,
        group: &ResourceGroup,
    ) -> Result<ResourceGroup, ProviderError> {
        self.conn
            .put(
                "resourceGroups.CreateOrUpdate",
                &self.path(name),
                API_VERSION,
                group,
            )
            .await
    }

    /// Fetch a resource group; `None` when it does not exist.
    pub async fn get(&self, name: &str) -> Result<Option<ResourceGroup>, ProviderError> {
        self.conn
            .get("resourceGroups.Get", &self.path(name), API_VERSION)
            .await
    }

    /// Delete a resource group; succeeds when it is already gone.
    pub async fn delete(&self, name: &str) -> Result<(), ProviderError> {
        self.conn
            .delete("resourceGroups.Delete", &self.path(name), API_VERSION)
            .await
    }
}
