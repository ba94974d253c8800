//! Data source handlers.
//!
//! Data sources read existing infrastructure without managing it. Unlike
//! resource Read, a missing target here is an error: the user asked for
//! something that must exist.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::ArmClient;
use crate::error::ProviderError;
use crate::resources::{flatten_tags, DataSourceHandler};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::validators::normalize_location;
use crate::values::{req_str, string_array, StateMap};

/// All data source handlers this provider serves.
pub fn all() -> Vec<Arc<dyn DataSourceHandler>> {
    vec![
        Arc::new(ResourceGroupDataSource),
        Arc::new(DnsZoneDataSource),
        Arc::new(ClientConfigDataSource),
    ]
}

/// Looks up an existing resource group by name.
pub struct ResourceGroupDataSource;

#[async_trait]
impl DataSourceHandler for ResourceGroupDataSource {
    fn type_name(&self) -> &'static str {
        "azure_resource_group"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("location", Attribute::computed_string())
            .with_attribute(
                "tags",
                Attribute::new(
                    AttributeType::map(AttributeType::String),
                    AttributeFlags::computed(),
                ),
            )
    }

    async fn read(&self, client: &ArmClient, config: &Value) -> Result<Value, ProviderError> {
        let name = req_str(config, "name")?;
        let group = client
            .resource_groups()
            .get(name)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("resource group {:?}", name)))?;

        Ok(StateMap::new()
            .set_opt("id", group.id)
            .set("name", group.name.unwrap_or_else(|| name.to_string()))
            .set_opt("location", group.location.as_deref().map(normalize_location))
            .set_value("tags", flatten_tags(group.tags))
            .finish())
    }
}

/// Looks up an existing DNS zone, exposing its delegated name servers.
pub struct DnsZoneDataSource;

#[async_trait]
impl DataSourceHandler for DnsZoneDataSource {
    fn type_name(&self) -> &'static str {
        "azure_dns_zone"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("resource_group_name", Attribute::required_string())
            .with_attribute(
                "name_servers",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::computed(),
                ),
            )
            .with_attribute("number_of_record_sets", Attribute::computed_int64())
            .with_attribute("max_number_of_record_sets", Attribute::computed_int64())
            .with_attribute(
                "tags",
                Attribute::new(
                    AttributeType::map(AttributeType::String),
                    AttributeFlags::computed(),
                ),
            )
    }

    async fn read(&self, client: &ArmClient, config: &Value) -> Result<Value, ProviderError> {
        let name = req_str(config, "name")?;
        let resource_group = req_str(config, "resource_group_name")?;
        let zone = client
            .dns()
            .get_zone(resource_group, name)
            .await?
            .ok_or_else(|| {
                ProviderError::NotFound(format!("dns zone {:?} in {:?}", name, resource_group))
            })?;
        let properties = zone.properties.unwrap_or_default();

        Ok(StateMap::new()
            .set_opt("id", zone.id)
            .set("name", zone.name.unwrap_or_else(|| name.to_string()))
            .set("resource_group_name", resource_group)
            .set_list(
                "name_servers",
                string_array(properties.name_servers.unwrap_or_default()),
            )
            .set_opt("number_of_record_sets", properties.number_of_record_sets)
            .set_opt(
                "max_number_of_record_sets",
                properties.max_number_of_record_sets,
            )
            .set_value("tags", flatten_tags(zone.tags))
            .finish())
    }
}

/// Returns the identity the provider is configured with. Never calls the
/// service: everything comes from the Configure step.
pub struct ClientConfigDataSource;

#[async_trait]
impl DataSourceHandler for ClientConfigDataSource {
    fn type_name(&self) -> &'static str {
        "azure_client_config"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("subscription_id", Attribute::computed_string())
            .with_attribute("client_id", Attribute::computed_string())
            .with_attribute("tenant_id", Attribute::computed_string())
    }

    async fn read(&self, client: &ArmClient, _config: &Value) -> Result<Value, ProviderError> {
        Ok(StateMap::new()
            .set("subscription_id", client.subscription_id())
            .set("client_id", client.client_id())
            .set("tenant_id", client.tenant_id())
            .finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_unique_type_names() {
        let handlers = all();
        let mut names: Vec<&str> = handlers.iter().map(|h| h.type_name()).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(names.contains(&"azure_client_config"));
    }

    #[test]
    fn test_lookup_schemas_require_the_lookup_keys() {
        let schema = ResourceGroupDataSource.schema();
        assert!(schema.block.attributes["name"].flags.required);
        assert!(schema.block.attributes["location"].flags.computed);

        let schema = DnsZoneDataSource.schema();
        assert!(schema.block.attributes["resource_group_name"].flags.required);
        assert!(schema.block.attributes["name_servers"].flags.computed);
    }

    #[test]
    fn test_client_config_schema_is_all_computed() {
        let schema = ClientConfigDataSource.schema();
        for attr in schema.block.attributes.values() {
            assert!(attr.flags.computed);
            assert!(!attr.flags.required);
        }
    }
}
