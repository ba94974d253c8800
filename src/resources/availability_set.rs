//! The `azure_availability_set` resource.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::{
    expand_tags, flatten_tags, location_attribute, resource_group_name_attribute,
    state_resource_group, state_name, tags_attribute, ResourceHandler,
};
use crate::api::compute::{AvailabilitySet, AvailabilitySetProperties, AvailabilitySetSku};
use crate::client::ArmClient;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::validators;
use crate::values::{opt_bool, opt_i64, req_str, StateMap};

pub struct AvailabilitySetResource;

fn expand(planned: &Value) -> Result<AvailabilitySet, ProviderError> {
    // "Aligned" is the managed-disk SKU; everything else is classic.
    let managed = opt_bool(planned, "managed").unwrap_or(true);

    Ok(AvailabilitySet {
        location: Some(validators::normalize_location(req_str(
            planned, "location",
        )?)),
        tags: expand_tags(planned),
        sku: Some(AvailabilitySetSku {
            name: Some(if managed { "Aligned" } else { "Classic" }.to_string()),
        }),
        properties: Some(AvailabilitySetProperties {
            platform_fault_domain_count: opt_i64(planned, "platform_fault_domain_count"),
            platform_update_domain_count: opt_i64(planned, "platform_update_domain_count"),
        }),
        ..Default::default()
    })
}

fn flatten(name: &str, resource_group: &str, availability_set: AvailabilitySet) -> Value {
    let properties = availability_set.properties.unwrap_or_default();
    let managed = availability_set
        .sku
        .and_then(|sku| sku.name)
        .map(|name| name == "Aligned");

    StateMap::new()
        .set_opt("id", availability_set.id)
        .set(
            "name",
            availability_set.name.unwrap_or_else(|| name.to_string()),
        )
        .set("resource_group_name", resource_group)
        .set_opt(
            "location",
            availability_set
                .location
                .as_deref()
                .map(validators::normalize_location),
        )
        .set_opt(
            "platform_fault_domain_count",
            properties.platform_fault_domain_count,
        )
        .set_opt(
            "platform_update_domain_count",
            properties.platform_update_domain_count,
        )
        .set_opt("managed", managed)
        .set_value("tags", flatten_tags(availability_set.tags))
        .finish()
}

#[async_trait]
impl ResourceHandler for AvailabilitySetResource {
    fn type_name(&self) -> &'static str {
        "azure_availability_set"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("resource_group_name", resource_group_name_attribute())
            .with_attribute("location", location_attribute())
            .with_attribute(
                "platform_fault_domain_count",
                Attribute::optional_int64()
                    .with_force_new()
                    .with_default(json!(3))
                    .with_validator(validators::fault_domain_count),
            )
            .with_attribute(
                "platform_update_domain_count",
                Attribute::optional_int64()
                    .with_force_new()
                    .with_default(json!(5))
                    .with_validator(validators::update_domain_count),
            )
            .with_attribute(
                "managed",
                Attribute::optional_bool()
                    .with_force_new()
                    .with_default(json!(true)),
            )
            .with_attribute("tags", tags_attribute())
    }

    async fn create(&self, client: &ArmClient, planned: &Value) -> Result<Value, ProviderError> {
        let name = req_str(planned, "name")?;
        let resource_group = req_str(planned, "resource_group_name")?;
        info!(name, resource_group, "creating availability set");
        let availability_set = client
            .compute()
            .create_or_update_availability_set(resource_group, name, &expand(planned)?)
            .await?;
        Ok(flatten(name, resource_group, availability_set))
    }

    async fn read(
        &self,
        client: &ArmClient,
        state: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let name = state_name(state)?;
        let resource_group = state_resource_group(state)?;
        Ok(client
            .compute()
            .get_availability_set(&resource_group, &name)
            .await?
            .map(|availability_set| flatten(&name, &resource_group, availability_set)))
    }

    async fn delete(&self, client: &ArmClient, state: &Value) -> Result<(), ProviderError> {
        let name = state_name(state)?;
        let resource_group = state_resource_group(state)?;
        info!(name, resource_group, "deleting availability set");
        client
            .compute()
            .delete_availability_set(&resource_group, &name)
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
