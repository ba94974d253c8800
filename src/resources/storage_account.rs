//! The `azure_storage_account` resource.
//!
//! Access keys never appear in GET responses; Create and Read issue the
//! listKeys POST action separately and merge the result into state as
//! sensitive attributes.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::{
    expand_tags, flatten_tags, location_attribute, resource_group_name_attribute,
    state_resource_group, state_name, tags_attribute, ResourceHandler,
};
use crate::api::storage::{StorageAccount, StorageAccountKeys, StorageAccountProperties, StorageSku};
use crate::client::ArmClient;
use crate::error::ProviderError;
use crate::migrate::{capitalize, split_account_type};
use crate::schema::{Attribute, Schema};
use crate::validators;
use crate::values::{opt_bool, opt_str, req_str, StateMap};

pub struct StorageAccountResource;

fn account_tier_validator(path: &str, value: &Value) -> Vec<String> {
    let Some(tier) = value.as_str() else {
        return vec![];
    };
    match tier.to_lowercase().as_str() {
        "standard" | "premium" => vec![],
        _ => vec![format!(
            "{} can only be Standard or Premium, got {:?}",
            path, tier
        )],
    }
}

fn replication_type_validator(path: &str, value: &Value) -> Vec<String> {
    let Some(replication) = value.as_str() else {
        return vec![];
    };
    match replication.to_uppercase().as_str() {
        "LRS" | "GRS" | "RAGRS" | "ZRS" => vec![],
        _ => vec![format!(
            "{} can only be LRS, GRS, RAGRS, or ZRS, got {:?}",
            path, replication
        )],
    }
}

fn access_tier_validator(path: &str, value: &Value) -> Vec<String> {
    let Some(tier) = value.as_str() else {
        return vec![];
    };
    match tier.to_lowercase().as_str() {
        "hot" | "cool" => vec![],
        _ => vec![format!("{} can only be Hot or Cool, got {:?}", path, tier)],
    }
}

fn fold_replication(value: &str) -> String {
    value.to_uppercase()
}

/// The combined SKU name the service wants, e.g. "Standard_LRS".
fn sku_name(planned: &Value) -> Result<String, ProviderError> {
    let tier = capitalize(req_str(planned, "account_tier")?);
    let replication = req_str(planned, "account_replication_type")?.to_uppercase();
    Ok(format!("{}_{}", tier, replication))
}

fn expand(planned: &Value) -> Result<StorageAccount, ProviderError> {
    Ok(StorageAccount {
        location: Some(validators::normalize_location(req_str(
            planned, "location",
        )?)),
        tags: expand_tags(planned),
        sku: Some(StorageSku {
            name: Some(sku_name(planned)?),
            tier: None,
        }),
        kind: Some(
            opt_str(planned, "account_kind")
                .unwrap_or("StorageV2")
                .to_string(),
        ),
        properties: Some(StorageAccountProperties {
            access_tier: opt_str(planned, "access_tier").map(capitalize),
            supports_https_traffic_only: opt_bool(planned, "enable_https_traffic_only"),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn flatten(name: &str, resource_group: &str, account: StorageAccount) -> Value {
    let properties = account.properties.unwrap_or_default();
    let endpoints = properties.primary_endpoints.unwrap_or_default();

    // Split the combined SKU back into the two configuration attributes.
    let (account_tier, account_replication_type) = account
        .sku
        .and_then(|sku| sku.name)
        .and_then(|name| {
            name.split_once('_')
                .map(|(tier, replication)| (tier.to_string(), replication.to_string()))
        })
        .map_or((None, None), |(t, r)| (Some(t), Some(r)));

    StateMap::new()
        .set_opt("id", account.id)
        .set("name", account.name.unwrap_or_else(|| name.to_string()))
        .set("resource_group_name", resource_group)
        .set_opt(
            "location",
            account
                .location
                .as_deref()
                .map(validators::normalize_location),
        )
        .set_opt("account_tier", account_tier)
        .set_opt("account_replication_type", account_replication_type)
        .set_opt("account_kind", account.kind)
        .set_opt("access_tier", properties.access_tier)
        .set_opt(
            "enable_https_traffic_only",
            properties.supports_https_traffic_only,
        )
        .set_opt("primary_blob_endpoint", endpoints.blob)
        .set_opt("primary_queue_endpoint", endpoints.queue)
        .set_opt("primary_table_endpoint", endpoints.table)
        .set_opt("primary_file_endpoint", endpoints.file)
        .set_value("tags", flatten_tags(account.tags))
        .finish()
}

/// Merge the listKeys result into state. Responses with fewer than two
/// keys leave the corresponding attributes absent.
fn attach_keys(state: &mut Value, keys: StorageAccountKeys) {
    let Some(obj) = state.as_object_mut() else {
        return;
    };
    let mut values = keys.keys.into_iter().filter_map(|k| k.value);
    if let Some(primary) = values.next() {
        obj.insert("primary_access_key".to_string(), Value::String(primary));
    }
    if let Some(secondary) = values.next() {
        obj.insert("secondary_access_key".to_string(), Value::String(secondary));
    }
}

#[async_trait]
impl ResourceHandler for StorageAccountResource {
    fn type_name(&self) -> &'static str {
        "azure_storage_account"
    }

    fn schema(&self) -> Schema {
        Schema::v1()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_force_new()
                    .with_validator(validators::storage_account_name),
            )
            .with_attribute("resource_group_name", resource_group_name_attribute())
            .with_attribute("location", location_attribute())
            .with_attribute(
                "account_tier",
                Attribute::required_string()
                    .with_force_new()
                    .with_validator(account_tier_validator)
                    .with_state_func(capitalize),
            )
            .with_attribute(
                "account_replication_type",
                Attribute::required_string()
                    .with_validator(replication_type_validator)
                    .with_state_func(fold_replication),
            )
            .with_attribute(
                "account_kind",
                Attribute::optional_string()
                    .with_force_new()
                    .with_default(json!("StorageV2")),
            )
            .with_attribute(
                "access_tier",
                Attribute::optional_string().with_validator(access_tier_validator),
            )
            .with_attribute(
                "enable_https_traffic_only",
                Attribute::optional_bool().with_default(json!(true)),
            )
            .with_attribute("primary_blob_endpoint", Attribute::computed_string())
            .with_attribute("primary_queue_endpoint", Attribute::computed_string())
            .with_attribute("primary_table_endpoint", Attribute::computed_string())
            .with_attribute("primary_file_endpoint", Attribute::computed_string())
            .with_attribute(
                "primary_access_key",
                Attribute::computed_string().sensitive(),
            )
            .with_attribute(
                "secondary_access_key",
                Attribute::computed_string().sensitive(),
            )
            .with_attribute("tags", tags_attribute())
    }

    async fn create(&self, client: &ArmClient, planned: &Value) -> Result<Value, ProviderError> {
        let name = req_str(planned, "name")?;
        let resource_group = req_str(planned, "resource_group_name")?;
        info!(name, resource_group, "creating storage account");
        let account = client
            .storage()
            .create_or_update(resource_group, name, &expand(planned)?)
            .await?;
        let mut state = flatten(name, resource_group, account);
        let keys = client.storage().list_keys(resource_group, name).await?;
        attach_keys(&mut state, keys);
        Ok(state)
    }

    async fn read(
        &self,
        client: &ArmClient,
        state: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let name = state_name(state)?;
        let resource_group = state_resource_group(state)?;
        let Some(account) = client.storage().get(&resource_group, &name).await? else {
            return Ok(None);
        };
        let mut state = flatten(&name, &resource_group, account);
        let keys = client.storage().list_keys(&resource_group, &name).await?;
        attach_keys(&mut state, keys);
        Ok(Some(state))
    }

    async fn delete(&self, client: &ArmClient, state: &Value) -> Result<(), ProviderError> {
        let name = state_name(state)?;
        let resource_group = state_resource_group(state)?;
        info!(name, resource_group, "deleting storage account");
        client.storage().delete(&resource_group, &name).await
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
            // v0 persisted the combined account_type ("Standard_LRS").
            0 => {
                split_account_type(&mut state);
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
            "name": "prodlogs01",
            "resource_group_name": "rg",
            "location": "West US",
            "account_tier": "standard",
            "account_replication_type": "lrs"
        })
    }

    #[test]
    fn test_expand_builds_combined_sku() {
        let account = expand(&config()).unwrap();
        assert_eq!(account.sku.unwrap().name.as_deref(), Some("Standard_LRS"));
        assert_eq!(account.kind.as_deref(), Some("StorageV2"));
        assert_eq!(account.location.as_deref(), Some("westus"));
    }

    #[test]
    fn test_expand_optional_properties() {
        let mut config = config();
        config["access_tier"] = json!("cool");
        config["enable_https_traffic_only"] = json!(true);
        let properties = expand(&config).unwrap().properties.unwrap();
        assert_eq!(properties.access_tier.as_deref(), Some("Cool"));
        assert_eq!(properties.supports_https_traffic_only, Some(true));
    }

    #[test]
    fn test_flatten_splits_sku() {
        let account: StorageAccount = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/prodlogs01",
            "name": "prodlogs01",
            "location": "westus",
            "sku": {"name": "Standard_GRS"},
            "kind": "StorageV2",
            "properties": {
                "primaryEndpoints": {"blob": "https://prodlogs01.blob.core.windows.net/"}
            }
        }))
        .unwrap();
        let state = flatten("prodlogs01", "rg", account);
        assert_eq!(state["account_tier"], "Standard");
        assert_eq!(state["account_replication_type"], "GRS");
        assert_eq!(
            state["primary_blob_endpoint"],
            "https://prodlogs01.blob.core.windows.net/"
        );
        assert!(state.get("primary_queue_endpoint").is_none());
    }

    #[test]
    fn test_flatten_sparse_response() {
        // No sku, no endpoints: nothing to split, nothing to crash on.
        let state = flatten("prodlogs01", "rg", StorageAccount::default());
        assert_eq!(state["name"], "prodlogs01");
        assert!(state.get("account_tier").is_none());
        assert!(state.get("primary_blob_endpoint").is_none());
    }

    #[test]
    fn test_attach_keys() {
        let keys: StorageAccountKeys = serde_json::from_value(json!({
            "keys": [
                {"keyName": "key1", "value": "secret1", "permissions": "FULL"},
                {"keyName": "key2", "value": "secret2", "permissions": "FULL"}
            ]
        }))
        .unwrap();
        let mut state = json!({"name": "prodlogs01"});
        attach_keys(&mut state, keys);
        assert_eq!(state["primary_access_key"], "secret1");
        assert_eq!(state["secondary_access_key"], "secret2");

        // An empty keys response leaves the attributes absent.
        let mut state = json!({"name": "prodlogs01"});
        attach_keys(&mut state, StorageAccountKeys::default());
        assert!(state.get("primary_access_key").is_none());
    }

    #[test]
    fn test_schema_validation() {
        let schema = StorageAccountResource.schema();
        assert!(validate(&schema, &config()).is_empty());

        let mut bad = config();
        bad["name"] = json!("ProdLogs");
        bad["account_replication_type"] = json!("QUADRUPLE");
        assert_eq!(validate(&schema, &bad).len(), 2);
    }

    #[test]
    fn test_upgrade_state_v0_account_type() {
        let handler = StorageAccountResource;
        let upgraded = handler
            .upgrade_state(0, json!({"name": "prodlogs01", "account_type": "Standard_LRS"}))
            .unwrap();
        assert_eq!(upgraded["account_tier"], "Standard");
        assert_eq!(upgraded["account_replication_type"], "LRS");
        assert!(upgraded.get("account_type").is_none());

        let state = json!({"name": "prodlogs01", "account_tier": "Standard"});
        assert_eq!(handler.upgrade_state(1, state.clone()).unwrap(), state);
        assert!(handler.upgrade_state(5, json!({})).is_err());
    }
}
