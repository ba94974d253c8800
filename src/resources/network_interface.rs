//! The `azure_network_interface` resource.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::{
    expand_tags, flatten_tags, location_attribute, resource_group_name_attribute,
    state_resource_group, state_name, tags_attribute, ResourceHandler,
};
use crate::api::network::{
    InterfaceDnsSettings, IpConfiguration, IpConfigurationProperties, NetworkInterface,
    NetworkInterfaceProperties,
};
use crate::api::SubResource;
use crate::client::ArmClient;
use crate::error::ProviderError;
use crate::migrate::capitalize;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};
use crate::validators;
use crate::values::{opt_bool, opt_str, req_str, single_block, str_list, string_array, StateMap};

pub struct NetworkInterfaceResource;

fn expand(planned: &Value) -> Result<NetworkInterface, ProviderError> {
    // NICs carry exactly one ip_configuration in this provider; the
    // schema enforces cardinality, expand enforces presence.
    let ip_config = single_block(planned, "ip_configuration")?;

    let allocation = capitalize(req_str(ip_config, "private_ip_address_allocation")?);
    if allocation == "Static" && opt_str(ip_config, "private_ip_address").is_none() {
        return Err(ProviderError::Validation(
            "a private_ip_address must be provided when the allocation is Static".to_string(),
        ));
    }

    let ip_configuration = IpConfiguration {
        name: Some(req_str(ip_config, "name")?.to_string()),
        properties: Some(IpConfigurationProperties {
            subnet: Some(SubResource::new(req_str(ip_config, "subnet_id")?)),
            private_ip_address: opt_str(ip_config, "private_ip_address").map(str::to_string),
            private_ip_allocation_method: Some(allocation),
            public_ip_address: opt_str(ip_config, "public_ip_address_id").map(SubResource::new),
        }),
    };

    let dns_servers = str_list(planned, "dns_servers");
    let internal_dns_name_label = opt_str(planned, "internal_dns_name_label");
    let dns_settings = if dns_servers.is_empty() && internal_dns_name_label.is_none() {
        None
    } else {
        Some(InterfaceDnsSettings {
            dns_servers: if dns_servers.is_empty() {
                None
            } else {
                Some(dns_servers)
            },
            internal_dns_name_label: internal_dns_name_label.map(str::to_string),
        })
    };

    Ok(NetworkInterface {
        location: Some(validators::normalize_location(req_str(
            planned, "location",
        )?)),
        tags: expand_tags(planned),
        properties: Some(NetworkInterfaceProperties {
            ip_configurations: Some(vec![ip_configuration]),
            dns_settings,
            enable_ip_forwarding: opt_bool(planned, "enable_ip_forwarding"),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn flatten(name: &str, resource_group: &str, nic: NetworkInterface) -> Value {
    let properties = nic.properties.unwrap_or_default();

    let ip_configuration: Vec<Value> = properties
        .ip_configurations
        .unwrap_or_default()
        .into_iter()
        .map(|config| {
            let config_properties = config.properties.unwrap_or_default();
            StateMap::new()
                .set_opt("name", config.name)
                .set_opt("subnet_id", config_properties.subnet.and_then(|s| s.id))
                .set_opt("private_ip_address", config_properties.private_ip_address)
                .set_opt(
                    "private_ip_address_allocation",
                    config_properties
                        .private_ip_allocation_method
                        .as_deref()
                        .map(capitalize),
                )
                .set_opt(
                    "public_ip_address_id",
                    config_properties.public_ip_address.and_then(|p| p.id),
                )
                .finish()
        })
        .collect();

    let (dns_servers, internal_dns_name_label) = match properties.dns_settings {
        Some(dns) => (
            dns.dns_servers.unwrap_or_default(),
            dns.internal_dns_name_label,
        ),
        None => (Vec::new(), None),
    };

    StateMap::new()
        .set_opt("id", nic.id)
        .set("name", nic.name.unwrap_or_else(|| name.to_string()))
        .set("resource_group_name", resource_group)
        .set_opt(
            "location",
            nic.location.as_deref().map(validators::normalize_location),
        )
        .set_list("ip_configuration", ip_configuration)
        .set_list("dns_servers", string_array(dns_servers))
        .set_opt("internal_dns_name_label", internal_dns_name_label)
        .set_opt("enable_ip_forwarding", properties.enable_ip_forwarding)
        .set_opt("mac_address", properties.mac_address)
        .set_value("tags", flatten_tags(nic.tags))
        .finish()
}

#[async_trait]
impl ResourceHandler for NetworkInterfaceResource {
    fn type_name(&self) -> &'static str {
        "azure_network_interface"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("resource_group_name", resource_group_name_attribute())
            .with_attribute("location", location_attribute())
            .with_block(
                "ip_configuration",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("name", Attribute::required_string())
                        .with_attribute("subnet_id", Attribute::required_string())
                        .with_attribute(
                            "private_ip_address",
                            Attribute::new(
                                AttributeType::String,
                                AttributeFlags::optional_computed(),
                            ),
                        )
                        .with_attribute(
                            "private_ip_address_allocation",
                            Attribute::required_string()
                                .with_validator(validators::allocation_method),
                        )
                        .with_attribute("public_ip_address_id", Attribute::optional_string()),
                )
                .with_min_items(1)
                .with_max_items(1),
            )
            .with_attribute(
                "dns_servers",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::optional(),
                ),
            )
            .with_attribute("internal_dns_name_label", Attribute::optional_string())
            .with_attribute(
                "enable_ip_forwarding",
                Attribute::optional_bool().with_default(json!(false)),
            )
            .with_attribute("mac_address", Attribute::computed_string())
            .with_attribute("tags", tags_attribute())
    }

    async fn create(&self, client: &ArmClient, planned: &Value) -> Result<Value, ProviderError> {
        let name = req_str(planned, "name")?;
        let resource_group = req_str(planned, "resource_group_name")?;
        info!(name, resource_group, "creating network interface");
        let nic = client
            .network()
            .create_or_update_network_interface(resource_group, name, &expand(planned)?)
            .await?;
        Ok(flatten(name, resource_group, nic))
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
            .get_network_interface(&resource_group, &name)
            .await?
            .map(|nic| flatten(&name, &resource_group, nic)))
    }

    async fn delete(&self, client: &ArmClient, state: &Value) -> Result<(), ProviderError> {
        let name = state_name(state)?;
        let resource_group = state_resource_group(state)?;
        info!(name, resource_group, "deleting network interface");
        client
            .network()
            .delete_network_interface(&resource_group, &name)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    fn config() -> Value {
        json!({
            "name": "nic1",
            "resource_group_name": "rg",
            "location": "westus",
            "ip_configuration": [{
                "name": "primary",
                "subnet_id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v/subnets/frontend",
                "private_ip_address_allocation": "dynamic"
            }]
        })
    }

    #[test]
    fn test_expand() {
        let nic = expand(&config()).unwrap();
        let configs = nic.properties.unwrap().ip_configurations.unwrap();
        assert_eq!(configs.len(), 1);
        let properties = configs[0].properties.as_ref().unwrap();
        assert_eq!(
            properties.private_ip_allocation_method.as_deref(),
            Some("Dynamic")
        );
        assert!(properties.public_ip_address.is_none());
    }

    #[test]
    fn test_expand_missing_block() {
        let err = expand(&json!({
            "name": "nic1", "resource_group_name": "rg", "location": "westus"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("exactly one"));
    }

    #[test]
    fn test_expand_static_requires_address() {
        let mut config = config();
        config["ip_configuration"][0]["private_ip_address_allocation"] = json!("Static");
        let err = expand(&config).unwrap_err();
        assert!(err.to_string().contains("private_ip_address"));

        config["ip_configuration"][0]["private_ip_address"] = json!("10.0.1.5");
        assert!(expand(&config).is_ok());
    }

    #[test]
    fn test_flatten_sparse_response() {
        // No dnsSettings, no macAddress, ip configuration without its
        // optional parts.
        let nic: NetworkInterface = serde_json::from_value(json!({
            "name": "nic1",
            "properties": {
                "ipConfigurations": [{"name": "primary", "properties": {}}]
            }
        }))
        .unwrap();
        let state = flatten("nic1", "rg", nic);
        assert!(state.get("mac_address").is_none());
        assert!(state.get("dns_servers").is_none());
        let config = &state["ip_configuration"][0];
        assert_eq!(config["name"], "primary");
        assert!(config.get("subnet_id").is_none());
    }

    #[test]
    fn test_flatten_computed_mac() {
        let nic: NetworkInterface = serde_json::from_value(json!({
            "name": "nic1",
            "properties": {
                "ipConfigurations": [],
                "macAddress": "00-0D-3A-11-22-33"
            }
        }))
        .unwrap();
        let state = flatten("nic1", "rg", nic);
        assert_eq!(state["mac_address"], "00-0D-3A-11-22-33");
    }

    #[test]
    fn test_schema_enforces_single_ip_configuration() {
        let schema = NetworkInterfaceResource.schema();
        let mut config = config();
        assert!(validate(&schema, &config).is_empty());

        let extra = config["ip_configuration"][0].clone();
        config["ip_configuration"].as_array_mut().unwrap().push(extra);
        let diagnostics = validate(&schema, &config);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 1"));
    }
}
