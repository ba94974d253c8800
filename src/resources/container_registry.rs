//! The `azure_container_registry` resource.
//!
//! Admin credentials come from a listCredentials POST action and are only
//! fetched when the admin user is enabled.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::{
    expand_tags, flatten_tags, location_attribute, resource_group_name_attribute,
    state_resource_group, state_name, tags_attribute, ResourceHandler,
};
use crate::api::containerregistry::{Registry, RegistryProperties, RegistrySku};
use crate::client::ArmClient;
use crate::error::ProviderError;
use crate::migrate::capitalize;
use crate::schema::{Attribute, Schema};
use crate::validators;
use crate::values::{opt_bool, req_str, StateMap};

pub struct ContainerRegistryResource;

fn sku_validator(path: &str, value: &Value) -> Vec<String> {
    let Some(sku) = value.as_str() else {
        return vec![];
    };
    match sku.to_lowercase().as_str() {
        "basic" | "standard" | "premium" => vec![],
        _ => vec![format!(
            "{} can only be Basic, Standard, or Premium, got {:?}",
            path, sku
        )],
    }
}

fn expand(planned: &Value) -> Result<Registry, ProviderError> {
    Ok(Registry {
        location: Some(validators::normalize_location(req_str(
            planned, "location",
        )?)),
        tags: expand_tags(planned),
        sku: Some(RegistrySku {
            name: Some(capitalize(req_str(planned, "sku")?)),
        }),
        properties: Some(RegistryProperties {
            admin_user_enabled: opt_bool(planned, "admin_enabled"),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn flatten(name: &str, resource_group: &str, registry: Registry) -> Value {
    let properties = registry.properties.unwrap_or_default();

    StateMap::new()
        .set_opt("id", registry.id)
        .set("name", registry.name.unwrap_or_else(|| name.to_string()))
        .set("resource_group_name", resource_group)
        .set_opt(
            "location",
            registry
                .location
                .as_deref()
                .map(validators::normalize_location),
        )
        .set_opt("sku", registry.sku.and_then(|sku| sku.name))
        .set_opt("admin_enabled", properties.admin_user_enabled)
        .set_opt("login_server", properties.login_server)
        .set_value("tags", flatten_tags(registry.tags))
        .finish()
}

#[async_trait]
impl ResourceHandler for ContainerRegistryResource {
    fn type_name(&self) -> &'static str {
        "azure_container_registry"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_force_new()
                    .with_validator(validators::container_registry_name),
            )
            .with_attribute("resource_group_name", resource_group_name_attribute())
            .with_attribute("location", location_attribute())
            .with_attribute(
                "sku",
                Attribute::optional_string()
                    .with_default(json!("Basic"))
                    .with_validator(sku_validator)
                    .with_state_func(capitalize),
            )
            .with_attribute(
                "admin_enabled",
                Attribute::optional_bool().with_default(json!(false)),
            )
            .with_attribute("login_server", Attribute::computed_string())
            .with_attribute("admin_username", Attribute::computed_string())
            .with_attribute("admin_password", Attribute::computed_string().sensitive())
            .with_attribute("tags", tags_attribute())
    }

    async fn create(&self, client: &ArmClient, planned: &Value) -> Result<Value, ProviderError> {
        let name = req_str(planned, "name")?;
        let resource_group = req_str(planned, "resource_group_name")?;
        info!(name, resource_group, "creating container registry");
        let registry = client
            .container_registry()
            .create_or_update(resource_group, name, &expand(planned)?)
            .await?;
        let mut state = flatten(name, resource_group, registry);
        self.attach_credentials(client, resource_group, name, &mut state)
            .await?;
        Ok(state)
    }

    async fn read(
        &self,
        client: &ArmClient,
        state: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let name = state_name(state)?;
        let resource_group = state_resource_group(state)?;
        let Some(registry) = client
            .container_registry()
            .get(&resource_group, &name)
            .await?
        else {
            return Ok(None);
        };
        let mut state = flatten(&name, &resource_group, registry);
        self.attach_credentials(client, &resource_group, &name, &mut state)
            .await?;
        Ok(Some(state))
    }

    async fn delete(&self, client: &ArmClient, state: &Value) -> Result<(), ProviderError> {
        let name = state_name(state)?;
        let resource_group = state_resource_group(state)?;
        info!(name, resource_group, "deleting container registry");
        client
            .container_registry()
            .delete(&resource_group, &name)
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
}

impl ContainerRegistryResource {
    async fn attach_credentials(
        &self,
        client: &ArmClient,
        resource_group: &str,
        name: &str,
        state: &mut Value,
    ) -> Result<(), ProviderError> {
        if state.get("admin_enabled") != Some(&Value::Bool(true)) {
            return Ok(());
        }
        let credentials = client
            .container_registry()
            .list_credentials(resource_group, name)
            .await?;
        let Some(obj) = state.as_object_mut() else {
            return Ok(());
        };
        if let Some(username) = credentials.username {
            obj.insert("admin_username".to_string(), Value::String(username));
        }
        if let Some(password) = credentials.passwords.into_iter().find_map(|p| p.value) {
            obj.insert("admin_password".to_string(), Value::String(password));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    fn config() -> Value {
        json!({
            "name": "helloWorld",
            "resource_group_name": "rg",
            "location": "West US",
            "sku": "basic",
            "admin_enabled": true
        })
    }

    #[test]
    fn test_expand_folds_sku_casing() {
        let registry = expand(&config()).unwrap();
        assert_eq!(registry.sku.unwrap().name.as_deref(), Some("Basic"));
        assert_eq!(
            registry.properties.unwrap().admin_user_enabled,
            Some(true)
        );
    }

    #[test]
    fn test_flatten_computed_login_server() {
        let registry: Registry = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.ContainerRegistry/registries/helloWorld",
            "name": "helloWorld",
            "location": "westus",
            "sku": {"name": "Basic"},
            "properties": {"adminUserEnabled": true, "loginServer": "helloworld.azurecr.io"}
        }))
        .unwrap();
        let state = flatten("helloWorld", "rg", registry);
        assert_eq!(state["login_server"], "helloworld.azurecr.io");
        assert_eq!(state["admin_enabled"], true);
    }

    #[test]
    fn test_flatten_sparse_response() {
        let state = flatten("helloWorld", "rg", Registry::default());
        assert_eq!(state["name"], "helloWorld");
        assert!(state.get("sku").is_none());
        assert!(state.get("login_server").is_none());
    }

    #[test]
    fn test_name_validation_counts() {
        let schema = ContainerRegistryResource.schema();

        // Too short: exactly one diagnostic.
        let mut bad = config();
        bad["name"] = json!("four");
        assert_eq!(validate(&schema, &bad).len(), 1);

        // Valid mixed-case name: none.
        assert!(validate(&schema, &config()).is_empty());
    }

    #[test]
    fn test_schema_rejects_bad_sku() {
        let schema = ContainerRegistryResource.schema();
        let mut bad = config();
        bad["sku"] = json!("Gigantic");
        assert_eq!(validate(&schema, &bad).len(), 1);
    }
}
