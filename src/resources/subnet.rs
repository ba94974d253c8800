//! The `azure_subnet` resource: a standalone subnet under an existing
//! virtual network.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{resource_group_name_attribute, state_resource_group, ResourceHandler};
use crate::api::network::{Subnet, SubnetProperties};
use crate::api::SubResource;
use crate::client::ArmClient;
use crate::error::ProviderError;
use crate::resource_id::ResourceId;
use crate::schema::{Attribute, Schema};
use crate::validators;
use crate::values::{opt_str, req_str, StateMap};

pub struct SubnetResource;

fn expand(planned: &Value) -> Result<Subnet, ProviderError> {
    Ok(Subnet {
        properties: Some(SubnetProperties {
            address_prefix: Some(req_str(planned, "address_prefix")?.to_string()),
            network_security_group: opt_str(planned, "security_group_id").map(SubResource::new),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn flatten(name: &str, resource_group: &str, vnet: &str, subnet: Subnet) -> Value {
    let properties = subnet.properties.unwrap_or_default();
    StateMap::new()
        .set_opt("id", subnet.id)
        .set("name", subnet.name.unwrap_or_else(|| name.to_string()))
        .set("resource_group_name", resource_group)
        .set("virtual_network_name", vnet)
        .set_opt("address_prefix", properties.address_prefix)
        .set_opt(
            "security_group_id",
            properties.network_security_group.and_then(|r| r.id),
        )
        .finish()
}

/// The virtual network a subnet's state belongs to, from the attribute or
/// the parent segment of the id.
fn state_virtual_network(state: &Value) -> Result<String, ProviderError> {
    if let Some(vnet) = opt_str(state, "virtual_network_name") {
        return Ok(vnet.to_string());
    }
    let id = req_str(state, "id")?;
    let parsed = ResourceId::parse(id)?;
    parsed
        .provider
        .filter(|p| p.child.is_some())
        .map(|p| p.name)
        .ok_or_else(|| ProviderError::Validation(format!("{:?} is not a subnet id", id)))
}

fn subnet_state_name(state: &Value) -> Result<String, ProviderError> {
    if let Some(name) = opt_str(state, "name") {
        return Ok(name.to_string());
    }
    let id = req_str(state, "id")?;
    Ok(ResourceId::parse(id)?.leaf_name().to_string())
}

#[async_trait]
impl ResourceHandler for SubnetResource {
    fn type_name(&self) -> &'static str {
        "azure_subnet"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("resource_group_name", resource_group_name_attribute())
            .with_attribute(
                "virtual_network_name",
                Attribute::required_string().with_force_new(),
            )
            .with_attribute(
                "address_prefix",
                Attribute::required_string().with_validator(validators::cidr),
            )
            .with_attribute("security_group_id", Attribute::optional_string())
    }

    async fn create(&self, client: &ArmClient, planned: &Value) -> Result<Value, ProviderError> {
        let name = req_str(planned, "name")?;
        let resource_group = req_str(planned, "resource_group_name")?;
        let vnet = req_str(planned, "virtual_network_name")?;
        info!(name, resource_group, vnet, "creating subnet");
        let subnet = client
            .network()
            .create_or_update_subnet(resource_group, vnet, name, &expand(planned)?)
            .await?;
        Ok(flatten(name, resource_group, vnet, subnet))
    }

    async fn read(
        &self,
        client: &ArmClient,
        state: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let name = subnet_state_name(state)?;
        let resource_group = state_resource_group(state)?;
        let vnet = state_virtual_network(state)?;
        Ok(client
            .network()
            .get_subnet(&resource_group, &vnet, &name)
            .await?
            .map(|subnet| flatten(&name, &resource_group, &vnet, subnet)))
    }

    async fn delete(&self, client: &ArmClient, state: &Value) -> Result<(), ProviderError> {
        let name = subnet_state_name(state)?;
        let resource_group = state_resource_group(state)?;
        let vnet = state_virtual_network(state)?;
        info!(name, resource_group, vnet, "deleting subnet");
        client
            .network()
            .delete_subnet(&resource_group, &vnet, &name)
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
    use serde_json::json;

    #[test]
    fn test_expand() {
        let subnet = expand(&json!({
            "name": "frontend",
            "resource_group_name": "rg",
            "virtual_network_name": "vnet1",
            "address_prefix": "10.0.1.0/24"
        }))
        .unwrap();
        let properties = subnet.properties.unwrap();
        assert_eq!(properties.address_prefix.as_deref(), Some("10.0.1.0/24"));
        assert!(properties.network_security_group.is_none());
    }

    #[test]
    fn test_expand_with_security_group() {
        let subnet = expand(&json!({
            "address_prefix": "10.0.1.0/24",
            "security_group_id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkSecurityGroups/nsg"
        }))
        .unwrap();
        let nsg = subnet
            .properties
            .unwrap()
            .network_security_group
            .unwrap();
        assert!(nsg.id.unwrap().ends_with("/nsg"));
    }

    #[test]
    fn test_state_lookup_from_child_id() {
        let state = json!({
            "id": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/frontend"
        });
        assert_eq!(state_virtual_network(&state).unwrap(), "vnet1");
        assert_eq!(subnet_state_name(&state).unwrap(), "frontend");

        // A top-level id is not a subnet.
        let state = json!({
            "id": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1"
        });
        assert!(state_virtual_network(&state).is_err());
    }

    #[test]
    fn test_flatten_sparse_response() {
        let state = flatten("frontend", "rg", "vnet1", Subnet::default());
        assert_eq!(state["name"], "frontend");
        assert_eq!(state["virtual_network_name"], "vnet1");
        assert!(state.get("address_prefix").is_none());
    }
}
