//! The `azure_resource_group` resource.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{
    expand_tags, flatten_tags, location_attribute, state_name, tags_attribute, ResourceHandler,
};
use crate::api::resources::ResourceGroup;
use crate::client::ArmClient;
use crate::error::ProviderError;
use crate::resource_id::ResourceId;
use crate::schema::{Attribute, Schema};
use crate::validators::normalize_location;
use crate::values::{req_str, StateMap};

pub struct ResourceGroupResource;

fn expand(planned: &Value) -> Result<ResourceGroup, ProviderError> {
    Ok(ResourceGroup {
        location: Some(normalize_location(req_str(planned, "location")?)),
        tags: expand_tags(planned),
        ..Default::default()
    })
}

fn flatten(name: &str, group: ResourceGroup) -> Value {
    StateMap::new()
        .set_opt("id", group.id)
        .set("name", group.name.unwrap_or_else(|| name.to_string()))
        .set_opt("location", group.location.as_deref().map(normalize_location))
        .set_value("tags", flatten_tags(group.tags))
        .finish()
}

#[async_trait]
impl ResourceHandler for ResourceGroupResource {
    fn type_name(&self) -> &'static str {
        "azure_resource_group"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("location", location_attribute())
            .with_attribute("tags", tags_attribute())
    }

    async fn create(&self, client: &ArmClient, planned: &Value) -> Result<Value, ProviderError> {
        let name = req_str(planned, "name")?;
        info!(name, "creating resource group");
        let group = client
            .resource_groups()
            .create_or_update(name, &expand(planned)?)
            .await?;
        Ok(flatten(name, group))
    }

    async fn read(
        &self,
        client: &ArmClient,
        state: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let name = state_name(state)?;
        Ok(client
            .resource_groups()
            .get(&name)
            .await?
            .map(|group| flatten(&name, group)))
    }

    async fn delete(&self, client: &ArmClient, state: &Value) -> Result<(), ProviderError> {
        let name = state_name(state)?;
        info!(name, "deleting resource group");
        client.resource_groups().delete(&name).await
    }

    async fn import(&self, client: &ArmClient, id: &str) -> Result<Value, ProviderError> {
        let parsed = ResourceId::parse(id)?;
        if parsed.provider.is_some() {
            return Err(ProviderError::Validation(format!(
                "{:?} is not a resource group id",
                id
            )));
        }
        let seed = StateMap::new()
            .set("id", id)
            .set("name", parsed.resource_group.clone())
            .finish();
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

    #[test]
    fn test_expand() {
        let planned = json!({
            "name": "production",
            "location": "West US",
            "tags": {"team": "platform"}
        });
        let group = expand(&planned).unwrap();
        assert_eq!(group.location.as_deref(), Some("westus"));
        assert_eq!(group.tags.unwrap().len(), 1);

        // Missing location is the only expand failure.
        assert!(expand(&json!({"name": "x"})).is_err());
    }

    #[test]
    fn test_expand_without_optional_tags() {
        let group = expand(&json!({"name": "x", "location": "westus"})).unwrap();
        assert!(group.tags.is_none());
    }

    #[test]
    fn test_flatten_sparse_response() {
        // The service may omit everything but the name.
        let state = flatten("production", ResourceGroup::default());
        assert_eq!(state["name"], "production");
        assert!(state.get("id").is_none());
        assert!(state.get("location").is_none());
        assert!(state.get("tags").is_none());
    }

    #[test]
    fn test_flatten_full_response() {
        let group: ResourceGroup = serde_json::from_value(json!({
            "id": "/subscriptions/sub/resourceGroups/production",
            "name": "production",
            "location": "westus",
            "tags": {"team": "platform"},
            "properties": {"provisioningState": "Succeeded"}
        }))
        .unwrap();
        let state = flatten("production", group);
        assert_eq!(state["id"], "/subscriptions/sub/resourceGroups/production");
        assert_eq!(state["location"], "westus");
        assert_eq!(state["tags"]["team"], "platform");
    }

    #[test]
    fn test_schema_validates_config() {
        let schema = ResourceGroupResource.schema();
        assert!(validate(&schema, &json!({"name": "rg", "location": "westus"})).is_empty());
        assert_eq!(validate(&schema, &json!({"location": "westus"})).len(), 1);
    }
}
