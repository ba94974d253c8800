//! Microsoft.Network DNS: zones and record sets.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Tags;
use crate::client::ArmConnection;
use crate::error::ProviderError;
use crate::resource_id::ResourceId;

const API_VERSION: &str = "2018-05-01";
const NAMESPACE: &str = "Microsoft.Network";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DnsZone {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// DNS zones are global; ARM still wants a location of "global".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<DnsZoneProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DnsZoneProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_number_of_record_sets: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_record_sets: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_servers: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<RecordSetProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RecordSetProperties {
    #[serde(rename = "TTL", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(rename = "ARecords", skip_serializing_if = "Option::is_none")]
    pub a_records: Option<Vec<ARecord>>,
    #[serde(rename = "fqdn", skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ARecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,
}

/// Client for DNS zones and record sets.
#[derive(Debug, Clone)]
pub struct DnsClient {
    conn: Arc<ArmConnection>,
}

impl DnsClient {
    pub(crate) fn new(conn: Arc<ArmConnection>) -> Self {
        Self { conn }
    }

    fn zone_path(&self, resource_group: &str, zone: &str) -> String {
        ResourceId::new(
            self.conn.subscription_id(),
            resource_group,
            NAMESPACE,
            "dnsZones",
            zone,
        )
        .path()
    }

    fn record_set_path(
        &self,
        resource_group: &str,
        zone: &str,
        record_type: &str,
        name: &str,
    ) -> String {
        ResourceId::new(
            self.conn.subscription_id(),
            resource_group,
            NAMESPACE,
            "dnsZones",
            zone,
        )
        .with_child(record_type, name)
        .path()
    }

    pub async fn create_or_update_zone(
        &self,
        resource_group: &str,
        name: &str,
        zone: &DnsZone,
    ) -> Result<DnsZone, ProviderError> {
        self.conn
            .put(
                "dnsZones.CreateOrUpdate",
                &self.zone_path(resource_group, name),
                API_VERSION,
                zone,
            )
            .await
    }

    pub async fn get_zone(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<DnsZone>, ProviderError> {
        self.conn
            .get(
                "dnsZones.Get",
                &self.zone_path(resource_group, name),
                API_VERSION,
            )
            .await
    }

    pub async fn delete_zone(&self, resource_group: &str, name: &str) -> Result<(), ProviderError> {
        self.conn
            .delete(
                "dnsZones.Delete",
                &self.zone_path(resource_group, name),
                API_VERSION,
            )
            .await
    }

    pub async fn create_or_update_record_set(
        &self,
        resource_group: &str,
        zone: &str,
        record_type: &str,
        name: &str,
        record_set: &RecordSet,
    ) -> Result<RecordSet, ProviderError> {
        self.conn
            .put(
                "recordSets.CreateOrUpdate",
                &self.record_set_path(resource_group, zone, record_type, name),
                API_VERSION,
                record_set,
            )
            .await
    }

    pub async fn get_record_set(
        &self,
        resource_group: &str,
        zone: &str,
        record_type: &str,
        name: &str,
    ) -> Result<Option<RecordSet>, ProviderError> {
        self.conn
            .get(
                "recordSets.Get",
                &self.record_set_path(resource_group, zone, record_type, name),
                API_VERSION,
            )
            .await
    }

    pub async fn delete_record_set(
        &self,
        resource_group: &str,
        zone: &str,
        record_type: &str,
        name: &str,
    ) -> Result<(), ProviderError> {
        self.conn
            .delete(
                "recordSets.Delete",
                &self.record_set_path(resource_group, zone, record_type, name),
                API_VERSION,
            )
            .await
    }
}
