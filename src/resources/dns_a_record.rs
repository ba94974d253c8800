//! The `azure_dns_a_record` resource: an A record set inside a DNS zone.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::{resource_group_name_attribute, state_resource_group, ResourceHandler};
use crate::api::dns::{ARecord, RecordSet, RecordSetProperties};
use crate::client::ArmClient;
use crate::error::ProviderError;
use crate::resource_id::ResourceId;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::validators;
use crate::values::{opt_i64, opt_str, req_str, str_list, string_array, StateMap};

/// The record-type segment in ARM record set ids ( `.../dnsZones/z/A/www` ).
const RECORD_TYPE: &str = "A";

pub struct DnsARecordResource;

fn expand(planned: &Value) -> Result<RecordSet, ProviderError> {
    let records = str_list(planned, "records");
    if records.is_empty() {
        return Err(ProviderError::Validation(
            "records must contain at least one address".to_string(),
        ));
    }

    Ok(RecordSet {
        properties: Some(RecordSetProperties {
            ttl: opt_i64(planned, "ttl"),
            a_records: Some(
                records
                    .into_iter()
                    .map(|address| ARecord {
                        ipv4_address: Some(address),
                    })
                    .collect(),
            ),
            fqdn: None,
        }),
        ..Default::default()
    })
}

fn flatten(name: &str, resource_group: &str, zone: &str, record_set: RecordSet) -> Value {
    let properties = record_set.properties.unwrap_or_default();

    StateMap::new()
        .set_opt("id", record_set.id)
        .set("name", record_set.name.unwrap_or_else(|| name.to_string()))
        .set("resource_group_name", resource_group)
        .set("zone_name", zone)
        .set_opt("ttl", properties.ttl)
        .set_list(
            "records",
            string_array(
                properties
                    .a_records
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|r| r.ipv4_address),
            ),
        )
        .set_opt("fqdn", properties.fqdn)
        .finish()
}

/// The zone a record set's state belongs to, from the attribute or the
/// parent segment of the id.
fn state_zone(state: &Value) -> Result<String, ProviderError> {
    if let Some(zone) = opt_str(state, "zone_name") {
        return Ok(zone.to_string());
    }
    let id = req_str(state, "id")?;
    let parsed = ResourceId::parse(id)?;
    parsed
        .provider
        .filter(|p| p.child.is_some())
        .map(|p| p.name)
        .ok_or_else(|| ProviderError::Validation(format!("{:?} is not a record set id", id)))
}

fn record_state_name(state: &Value) -> Result<String, ProviderError> {
    if let Some(name) = opt_str(state, "name") {
        return Ok(name.to_string());
    }
    let id = req_str(state, "id")?;
    Ok(ResourceId::parse(id)?.leaf_name().to_string())
}

#[async_trait]
impl ResourceHandler for DnsARecordResource {
    fn type_name(&self) -> &'static str {
        "azure_dns_a_record"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("resource_group_name", resource_group_name_attribute())
            .with_attribute("zone_name", Attribute::required_string().with_force_new())
            .with_attribute(
                "ttl",
                Attribute::optional_int64()
                    .with_default(json!(300))
                    .with_validator(validators::dns_ttl),
            )
            .with_attribute(
                "records",
                Attribute::new(
                    AttributeType::set(AttributeType::String),
                    AttributeFlags::required(),
                ),
            )
            .with_attribute("fqdn", Attribute::computed_string())
    }

    async fn create(&self, client: &ArmClient, planned: &Value) -> Result<Value, ProviderError> {
        let name = req_str(planned, "name")?;
        let resource_group = req_str(planned, "resource_group_name")?;
        let zone = req_str(planned, "zone_name")?;
        info!(name, resource_group, zone, "creating dns a record");
        let record_set = client
            .dns()
            .create_or_update_record_set(resource_group, zone, RECORD_TYPE, name, &expand(planned)?)
            .await?;
        Ok(flatten(name, resource_group, zone, record_set))
    }

    async fn read(
        &self,
        client: &ArmClient,
        state: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let name = record_state_name(state)?;
        let resource_group = state_resource_group(state)?;
        let zone = state_zone(state)?;
        Ok(client
            .dns()
            .get_record_set(&resource_group, &zone, RECORD_TYPE, &name)
            .await?
            .map(|record_set| flatten(&name, &resource_group, &zone, record_set)))
    }

    async fn delete(&self, client: &ArmClient, state: &Value) -> Result<(), ProviderError> {
        let name = record_state_name(state)?;
        let resource_group = state_resource_group(state)?;
        let zone = state_zone(state)?;
        info!(name, resource_group, zone, "deleting dns a record");
        client
            .dns()
            .delete_record_set(&resource_group, &zone, RECORD_TYPE, &name)
            .await
    }

    async fn import(&self, client: &ArmClient, id: &str) -> Result<Value, ProviderError> {
        let seed = StateMap::new().set("id", id).finish();
        self.read(client, &seed)
            .await?
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    fn config() -> Value {
        json!({
            "name": "www",
            "resource_group_name": "rg",
            "zone_name": "example.com",
            "ttl": 300,
            "records": ["10.0.0.4", "10.0.0.5"]
        })
    }

    #[test]
    fn test_expand() {
        let record_set = expand(&config()).unwrap();
        let properties = record_set.properties.unwrap();
        assert_eq!(properties.ttl, Some(300));
        let records = properties.a_records.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ipv4_address.as_deref(), Some("10.0.0.4"));
    }

    #[test]
    fn test_expand_requires_records() {
        let mut config = config();
        config["records"] = json!([]);
        let err = expand(&config).unwrap_err();
        assert!(err.to_string().contains("records"));
    }

    #[test]
    fn test_flatten() {
        let record_set: RecordSet = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com/A/www",
            "name": "www",
            "properties": {
                "TTL": 300,
                "ARecords": [{"ipv4Address": "10.0.0.4"}],
                "fqdn": "www.example.com."
            }
        }))
        .unwrap();
        let state = flatten("www", "rg", "example.com", record_set);
        assert_eq!(state["zone_name"], "example.com");
        assert_eq!(state["records"], json!(["10.0.0.4"]));
        assert_eq!(state["fqdn"], "www.example.com.");
    }

    #[test]
    fn test_flatten_sparse_response() {
        let state = flatten("www", "rg", "example.com", RecordSet::default());
        assert_eq!(state["name"], "www");
        assert!(state.get("ttl").is_none());
        assert!(state.get("records").is_none());
        assert!(state.get("fqdn").is_none());
    }

    #[test]
    fn test_state_lookup_from_child_id() {
        let state = json!({
            "id": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com/A/www"
        });
        assert_eq!(state_zone(&state).unwrap(), "example.com");
        assert_eq!(record_state_name(&state).unwrap(), "www");

        // A zone id is not a record set.
        let state = json!({
            "id": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com"
        });
        assert!(state_zone(&state).is_err());
    }

    #[test]
    fn test_schema_rejects_bad_ttl() {
        let schema = DnsARecordResource.schema();
        let mut config = config();
        config["ttl"] = json!(0);
        let diagnostics = validate(&schema, &config);
        assert_eq!(diagnostics.len(), 1);
    }
}
