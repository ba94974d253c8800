//! The `azure_public_ip` resource.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::{
    expand_tags, flatten_tags, location_attribute, resource_group_name_attribute,
    state_resource_group, state_name, tags_attribute, ResourceHandler,
};
use crate::api::network::{PublicIpAddress, PublicIpAddressProperties, PublicIpDnsSettings};
use crate::client::ArmClient;
use crate::error::ProviderError;
use crate::migrate::{capitalize, fold_attribute, rename_attribute};
use crate::schema::{Attribute, Schema};
use crate::validators;
use crate::values::{opt_i64, opt_str, req_str, StateMap};

pub struct PublicIpResource;

fn idle_timeout_validator(path: &str, value: &Value) -> Vec<String> {
    let Some(minutes) = value.as_i64() else {
        return vec![];
    };
    if (4..=30).contains(&minutes) {
        vec![]
    } else {
        vec![format!(
            "{} must be between 4 and 30 minutes, got {}",
            path, minutes
        )]
    }
}

fn expand(planned: &Value) -> Result<PublicIpAddress, ProviderError> {
    let dns_settings = opt_str(planned, "domain_name_label").map(|label| PublicIpDnsSettings {
        domain_name_label: Some(label.to_string()),
        fqdn: None,
    });

    Ok(PublicIpAddress {
        location: Some(validators::normalize_location(req_str(
            planned, "location",
        )?)),
        tags: expand_tags(planned),
        properties: Some(PublicIpAddressProperties {
            // The service is case-sensitive here even though user input
            // is not; send canonical casing.
            public_ip_allocation_method: Some(capitalize(req_str(
                planned,
                "allocation_method",
            )?)),
            idle_timeout_in_minutes: opt_i64(planned, "idle_timeout_in_minutes"),
            dns_settings,
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn flatten(name: &str, resource_group: &str, public_ip: PublicIpAddress) -> Value {
    let properties = public_ip.properties.unwrap_or_default();
    let (domain_name_label, fqdn) = match properties.dns_settings {
        Some(dns) => (dns.domain_name_label, dns.fqdn),
        None => (None, None),
    };

    StateMap::new()
        .set_opt("id", public_ip.id)
        .set("name", public_ip.name.unwrap_or_else(|| name.to_string()))
        .set("resource_group_name", resource_group)
        .set_opt(
            "location",
            public_ip
                .location
                .as_deref()
                .map(validators::normalize_location),
        )
        .set_opt(
            "allocation_method",
            properties
                .public_ip_allocation_method
                .as_deref()
                .map(capitalize),
        )
        .set_opt("idle_timeout_in_minutes", properties.idle_timeout_in_minutes)
        .set_opt("domain_name_label", domain_name_label)
        .set_opt("fqdn", fqdn)
        .set_opt("ip_address", properties.ip_address)
        .set_value("tags", flatten_tags(public_ip.tags))
        .finish()
}

#[async_trait]
impl ResourceHandler for PublicIpResource {
    fn type_name(&self) -> &'static str {
        "azure_public_ip"
    }

    fn schema(&self) -> Schema {
        Schema::v1()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("resource_group_name", resource_group_name_attribute())
            .with_attribute("location", location_attribute())
            .with_attribute(
                "allocation_method",
                Attribute::required_string()
                    .with_validator(validators::allocation_method)
                    .with_state_func(capitalize),
            )
            .with_attribute(
                "idle_timeout_in_minutes",
                Attribute::optional_int64()
                    .with_default(json!(4))
                    .with_validator(idle_timeout_validator),
            )
            .with_attribute("domain_name_label", Attribute::optional_string())
            .with_attribute("ip_address", Attribute::computed_string())
            .with_attribute("fqdn", Attribute::computed_string())
            .with_attribute("tags", tags_attribute())
    }

    async fn create(&self, client: &ArmClient, planned: &Value) -> Result<Value, ProviderError> {
        let name = req_str(planned, "name")?;
        let resource_group = req_str(planned, "resource_group_name")?;
        info!(name, resource_group, "creating public ip");
        let public_ip = client
            .network()
            .create_or_update_public_ip(resource_group, name, &expand(planned)?)
            .await?;
        Ok(flatten(name, resource_group, public_ip))
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
            .get_public_ip(&resource_group, &name)
            .await?
            .map(|public_ip| flatten(&name, &resource_group, public_ip)))
    }

    async fn delete(&self, client: &ArmClient, state: &Value) -> Result<(), ProviderError> {
        let name = state_name(state)?;
        let resource_group = state_resource_group(state)?;
        info!(name, resource_group, "deleting public ip");
        client
            .network()
            .delete_public_ip(&resource_group, &name)
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
            // v0 called the attribute public_ip_address_allocation and
            // stored whatever casing the user wrote.
            0 => {
                rename_attribute(&mut state, "public_ip_address_allocation", "allocation_method");
                fold_attribute(&mut state, "allocation_method", capitalize);
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
