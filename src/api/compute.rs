//! Microsoft.Compute: availability sets.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Tags;
use crate::client::ArmConnection;
use crate::error::ProviderError;
use crate::resource_id::ResourceId;

const API_VERSION: &str = "2023-03-01";
const NAMESPACE: &str = "Microsoft.Compute";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    /// "Aligned" for managed disks, "Classic" otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<AvailabilitySetSku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<AvailabilitySetProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySetSku {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySetProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_fault_domain_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_update_domain_count: Option<i64>,
}

/// Client for availability set operations.
#[derive(Debug, Clone)]
pub struct ComputeClient {
    conn: Arc<ArmConnection>,
}

impl ComputeClient {
    pub(crate) fn new(conn: Arc<ArmConnection>) -> Self {
        Self { conn }
    }

    fn path(&self, resource_group: &str, name: &str) -> String {
        ResourceId::new(
            self.conn.subscription_id(),
            resource_group,
            NAMESPACE,
            "availabilitySets",
            name,
        )
        .path()
    }

    pub async fn create_or_update_availability_set(
        &self,
        resource_group: &str,
        name: &str,
        availability_set: &AvailabilitySet,
    ) -> Result<AvailabilitySet, ProviderError> {
        self.conn
            .put(
                "availabilitySets.CreateOrUpdate",
                &self.path(resource_group, name),
                API_VERSION,
                availability_set,
            )
            .await
    }

    pub async fn get_availability_set(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<AvailabilitySet>, ProviderError> {
        self.conn
            .get(
                "availabilitySets.Get",
                &self.path(resource_group, name),
                API_VERSION,
            )
            .await
    }

    pub async fn delete_availability_set(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), ProviderError> {
        self.conn
            .delete(
                "availabilitySets.Delete",
                &self.path(resource_group, name),
                API_VERSION,
            )
            .await
    }
}
