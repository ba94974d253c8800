//! The `azure_virtual_network` resource.
//!
//! Subnets declared inline through the `subnet` block are managed as part
//! of the virtual network; standalone subnets use `azure_subnet` instead.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{
    expand_tags, flatten_tags, location_attribute, resource_group_name_attribute,
    state_resource_group, state_name, tags_attribute, ResourceHandler,
};
use crate::api::network::{
    AddressSpace, DhcpOptions, Subnet, SubnetProperties, VirtualNetwork, VirtualNetworkProperties,
};
use crate::client::ArmClient;
use crate::error::ProviderError;
use crate::migrate::comma_string_to_list;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};
use crate::validators;
use crate::values::{opt_str, req_str, str_list, string_array, StateMap};

pub struct VirtualNetworkResource;

fn address_space_validator(path: &str, value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return vec![];
    };
    let mut errors = Vec::new();
    if items.is_empty() {
        errors.push(format!("{} must contain at least one prefix", path));
    }
    for (i, item) in items.iter().enumerate() {
        errors.extend(validators::cidr(&format!("{}.{}", path, i), item));
    }
    errors
}

fn expand(planned: &Value) -> Result<VirtualNetwork, ProviderError> {
    let address_prefixes = str_list(planned, "address_space");
    if address_prefixes.is_empty() {
        return Err(ProviderError::Validation(
            "address_space must contain at least one prefix".to_string(),
        ));
    }

    let dns_servers = str_list(planned, "dns_servers");
    let dhcp_options = if dns_servers.is_empty() {
        None
    } else {
        Some(DhcpOptions {
            dns_servers: Some(dns_servers),
        })
    };

    let mut subnets = Vec::new();
    for block in crate::values::block_list(planned, "subnet") {
        subnets.push(Subnet {
            name: Some(req_str(block, "name")?.to_string()),
            properties: Some(SubnetProperties {
                address_prefix: Some(req_str(block, "address_prefix")?.to_string()),
                network_security_group: opt_str(block, "security_group_id")
                    .map(crate::api::SubResource::new),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    Ok(VirtualNetwork {
        location: Some(validators::normalize_location(req_str(
            planned, "location",
        )?)),
        tags: expand_tags(planned),
        properties: Some(VirtualNetworkProperties {
            address_space: Some(AddressSpace {
                address_prefixes: Some(address_prefixes),
            }),
            dhcp_options,
            subnets: if subnets.is_empty() {
                None
            } else {
                Some(subnets)
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn flatten(name: &str, resource_group: &str, vnet: VirtualNetwork) -> Value {
    let properties = vnet.properties.unwrap_or_default();

    // ARM hands subnets back in arbitrary order; sort by name so the set
    // compares stably against configuration.
    let mut subnets: Vec<(String, Value)> = properties
        .subnets
        .unwrap_or_default()
        .into_iter()
        .filter_map(|subnet| {
            let name = subnet.name?;
            let subnet_properties = subnet.properties.unwrap_or_default();
            let value = StateMap::new()
                .set("name", name.clone())
                .set_opt("address_prefix", subnet_properties.address_prefix)
                .set_opt(
                    "security_group_id",
                    subnet_properties.network_security_group.and_then(|r| r.id),
                )
                .finish();
            Some((name, value))
        })
        .collect();
    subnets.sort_by(|a, b| a.0.cmp(&b.0));
    let subnets: Vec<Value> = subnets.into_iter().map(|(_, v)| v).collect();

    StateMap::new()
        .set_opt("id", vnet.id)
        .set("name", vnet.name.unwrap_or_else(|| name.to_string()))
        .set("resource_group_name", resource_group)
        .set_opt(
            "location",
            vnet.location.as_deref().map(validators::normalize_location),
        )
        .set_list(
            "address_space",
            string_array(
                properties
                    .address_space
                    .and_then(|a| a.address_prefixes)
                    .unwrap_or_default(),
            ),
        )
        .set_list(
            "dns_servers",
            string_array(
                properties
                    .dhcp_options
                    .and_then(|d| d.dns_servers)
                    .unwrap_or_default(),
            ),
        )
        .set_list("subnet", subnets)
        .set_value("tags", flatten_tags(vnet.tags))
        .finish()
}

#[async_trait]
impl ResourceHandler for VirtualNetworkResource {
    fn type_name(&self) -> &'static str {
        "azure_virtual_network"
    }

    fn schema(&self) -> Schema {
        Schema::v1()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("resource_group_name", resource_group_name_attribute())
            .with_attribute("location", location_attribute())
            .with_attribute(
                "address_space",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::required(),
                )
                .with_validator(address_space_validator),
            )
            .with_attribute(
                "dns_servers",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::optional(),
                ),
            )
            .with_block(
                "subnet",
                NestedBlock::set(
                    Block::new()
                        .with_attribute("name", Attribute::required_string())
                        .with_attribute(
                            "address_prefix",
                            Attribute::required_string().with_validator(validators::cidr),
                        )
                        .with_attribute("security_group_id", Attribute::optional_string()),
                ),
            )
            .with_attribute("tags", tags_attribute())
    }

    async fn create(&self, client: &ArmClient, planned: &Value) -> Result<Value, ProviderError> {
        let name = req_str(planned, "name")?;
        let resource_group = req_str(planned, "resource_group_name")?;
        info!(name, resource_group, "creating virtual network");
        let vnet = client
            .network()
            .create_or_update_virtual_network(resource_group, name, &expand(planned)?)
            .await?;
        Ok(flatten(name, resource_group, vnet))
    }

    async fn read(
        &self,
        client: &ArmClient,
        state: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let name = state_name(state)?;
        let resource_group = state_resource_group(state)?;
        Ok(client
            .network()
            .get_virtual_network(&resource_group, &name)
            .await?
            .map(|vnet| flatten(&name, &resource_group, vnet)))
    }

    async fn delete(&self, client: &ArmClient, state: &Value) -> Result<(), ProviderError> {
        let name = state_name(state)?;
        let resource_group = state_resource_group(state)?;
        info!(name, resource_group, "deleting virtual network");
        client
            .network()
            .delete_virtual_network(&resource_group, &name)
            .await
    }

    async fn import(&self, client: &ArmClient, id: &str) -> Result<Value, ProviderError> {
        let parsed = crate::resource_id::ResourceId::parse(id)?;
        let seed = StateMap::new()
            .set("id", id)
            .set("name", parsed.leaf_name())
            .set("resource_group_name", parsed.resource_group.clone())
            .finish();
        self.read(client, &seed)
            .await?
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }

    fn upgrade_state(&self, version: i64, mut state: Value) -> Result<Value, ProviderError> {
        match version {
            1 => Ok(state),
            // v0 persisted dns_servers as a comma-joined string.
            0 => {
                comma_string_to_list(&mut state, "dns_servers");
                Ok(state)
            },
            _ => Err(ProviderError::Validation(format!(
                "no state upgrade path for {} from schema version {}",
                self.type_name(),
                version
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    fn config() -> Value {
        json!({
            "name": "vnet1",
            "resource_group_name": "rg",
            "location": "West US",
            "address_space": ["10.0.0.0/16"],
            "dns_servers": ["10.0.0.4"],
            "subnet": [
                {"name": "frontend", "address_prefix": "10.0.1.0/24"},
                {"name": "backend", "address_prefix": "10.0.2.0/24"}
            ],
            "tags": {"environment": "production"}
        })
    }

    #[test]
    fn test_expand() {
        let vnet = expand(&config()).unwrap();
        assert_eq!(vnet.location.as_deref(), Some("westus"));
        let properties = vnet.properties.unwrap();
        assert_eq!(
            properties.address_space.unwrap().address_prefixes.unwrap(),
            vec!["10.0.0.0/16"]
        );
        assert_eq!(
            properties.dhcp_options.unwrap().dns_servers.unwrap(),
            vec!["10.0.0.4"]
        );
        assert_eq!(properties.subnets.unwrap().len(), 2);
    }

    #[test]
    fn test_expand_minimal() {
        let vnet = expand(&json!({
            "name": "vnet1",
            "resource_group_name": "rg",
            "location": "westus",
            "address_space": ["10.0.0.0/16"]
        }))
        .unwrap();
        let properties = vnet.properties.unwrap();
        assert!(properties.dhcp_options.is_none());
        assert!(properties.subnets.is_none());
        assert!(vnet.tags.is_none());
    }

    #[test]
    fn test_expand_requires_address_space() {
        let err = expand(&json!({
            "name": "vnet1",
            "resource_group_name": "rg",
            "location": "westus",
            "address_space": []
        }))
        .unwrap_err();
        assert!(err.to_string().contains("address_space"));
    }

    #[test]
    fn test_flatten_sorts_subnets() {
        let vnet: VirtualNetwork = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1",
            "name": "vnet1",
            "location": "westus",
            "properties": {
                "addressSpace": {"addressPrefixes": ["10.0.0.0/16"]},
                "subnets": [
                    {"name": "frontend", "properties": {"addressPrefix": "10.0.1.0/24"}},
                    {"name": "backend", "properties": {"addressPrefix": "10.0.2.0/24"}}
                ]
            }
        }))
        .unwrap();
        let state = flatten("vnet1", "rg", vnet);
        let subnets = state["subnet"].as_array().unwrap();
        assert_eq!(subnets[0]["name"], "backend");
        assert_eq!(subnets[1]["name"], "frontend");
    }

    #[test]
    fn test_flatten_sparse_response() {
        // No dhcpOptions, no subnets, a subnet missing its properties:
        // flatten must not panic on any of it.
        let vnet: VirtualNetwork = serde_json::from_value(json!({
            "name": "vnet1",
            "properties": {
                "subnets": [{"name": "frontend"}]
            }
        }))
        .unwrap();
        let state = flatten("vnet1", "rg", vnet);
        assert!(state.get("dns_servers").is_none());
        assert!(state.get("address_space").is_none());
        let subnets = state["subnet"].as_array().unwrap();
        assert_eq!(subnets[0]["name"], "frontend");
        assert!(subnets[0].get("address_prefix").is_none());
    }

    #[test]
    fn test_schema_rejects_bad_cidr() {
        let schema = VirtualNetworkResource.schema();
        let mut config = config();
        config["address_space"] = json!(["10.0.0.0"]);
        let diagnostics = validate(&schema, &config);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("CIDR"));
    }

    #[test]
    fn test_upgrade_state_v0_dns_servers() {
        let handler = VirtualNetworkResource;
        let upgraded = handler
            .upgrade_state(0, json!({"name": "vnet1", "dns_servers": "10.0.0.4,10.0.0.5"}))
            .unwrap();
        assert_eq!(upgraded["dns_servers"], json!(["10.0.0.4", "10.0.0.5"]));

        // Current version passes through.
        let state = json!({"name": "vnet1", "dns_servers": ["10.0.0.4"]});
        assert_eq!(handler.upgrade_state(1, state.clone()).unwrap(), state);

        // Future versions are rejected.
        assert!(handler.upgrade_state(2, json!({})).is_err());
    }
}
