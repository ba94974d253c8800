//! The `azure_dns_zone` resource.
//!
//! Zones are global: ARM requires `location` to be the literal "global",
//! so the schema does not expose a location attribute at all.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{
    expand_tags, flatten_tags, resource_group_name_attribute, state_resource_group, state_name,
    tags_attribute, ResourceHandler,
};
use crate::api::dns::DnsZone;
use crate::client::ArmClient;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::values::{req_str, string_array, StateMap};

pub struct DnsZoneResource;

fn expand(planned: &Value) -> DnsZone {
    DnsZone {
        location: Some("global".to_string()),
        tags: expand_tags(planned),
        ..Default::default()
    }
}

fn flatten(name: &str, resource_group: &str, zone: DnsZone) -> Value {
    let properties = zone.properties.unwrap_or_default();

    StateMap::new()
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
        .finish()
}

#[async_trait]
impl ResourceHandler for DnsZoneResource {
    fn type_name(&self) -> &'static str {
        "azure_dns_zone"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("resource_group_name", resource_group_name_attribute())
            .with_attribute(
                "name_servers",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::computed(),
                ),
            )
            .with_attribute("number_of_record_sets", Attribute::computed_int64())
            .with_attribute("max_number_of_record_sets", Attribute::computed_int64())
            .with_attribute("tags", tags_attribute())
    }

    async fn create(&self, client: &ArmClient, planned: &Value) -> Result<Value, ProviderError> {
        let name = req_str(planned, "name")?;
        let resource_group = req_str(planned, "resource_group_name")?;
        info!(name, resource_group, "creating dns zone");
        let zone = client
            .dns()
            .create_or_update_zone(resource_group, name, &expand(planned))
            .await?;
        Ok(flatten(name, resource_group, zone))
    }

    async fn read(
        &self,
        client: &ArmClient,
        state: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let name = state_name(state)?;
        let resource_group = state_resource_group(state)?;
        Ok(client
            .dns()
            .get_zone(&resource_group, &name)
            .await?
            .map(|zone| flatten(&name, &resource_group, zone)))
    }

    async fn delete(&self, client: &ArmClient, state: &Value) -> Result<(), ProviderError> {
        let name = state_name(state)?;
        let resource_group = state_resource_group(state)?;
        info!(name, resource_group, "deleting dns zone");
        client.dns().delete_zone(&resource_group, &name).await
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
