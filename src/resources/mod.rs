//! Resource lifecycle handlers.
//!
//! One module per resource type, each owning its schema, its expand and
//! flatten adapters, and the Create/Read/Update/Delete calls against the
//! matching service client. The provider dispatches to these through the
//! [`ResourceHandler`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::Tags;
use crate::client::ArmClient;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::validators;
use crate::values;

pub mod availability_set;
pub mod container_registry;
pub mod dns_a_record;
pub mod dns_zone;
pub mod load_balancer;
pub mod network_interface;
pub mod public_ip;
pub mod resource_group;
pub mod storage_account;
pub mod subnet;
pub mod virtual_network;

/// Lifecycle operations for one resource type.
///
/// Handlers are stateless: everything they need arrives as the generic
/// state/configuration value plus the shared [`ArmClient`]. The host
/// serializes calls per resource instance; concurrent calls only ever
/// happen for distinct instances.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// The resource type name, e.g. `azure_virtual_network`.
    fn type_name(&self) -> &'static str;

    /// The declarative schema for this resource type.
    fn schema(&self) -> Schema;

    /// Create the resource from its planned state and return the full
    /// state including server-computed fields.
    async fn create(&self, client: &ArmClient, planned: &Value) -> Result<Value, ProviderError>;

    /// Read current state; `Ok(None)` means the resource is gone and the
    /// host must drop it from state (out-of-band deletion).
    async fn read(&self, client: &ArmClient, state: &Value)
        -> Result<Option<Value>, ProviderError>;

    /// Update in place. ARM resources are modelled with CreateOrUpdate
    /// PUTs, so the default re-submits the full representation; handlers
    /// with multi-step writes override this.
    async fn update(
        &self,
        client: &ArmClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let _ = prior;
        self.create(client, planned).await
    }

    /// Delete the resource. Absence is success; calling this twice must
    /// not fail the second time.
    async fn delete(&self, client: &ArmClient, state: &Value) -> Result<(), ProviderError>;

    /// Import an existing resource by its full ARM id.
    async fn import(&self, client: &ArmClient, id: &str) -> Result<Value, ProviderError> {
        let _ = (client, id);
        Err(ProviderError::UnknownResource(format!(
            "import not supported for {}",
            self.type_name()
        )))
    }

    /// Upgrade state persisted under an older schema version.
    ///
    /// The default accepts current-version state unchanged and rejects
    /// anything else; resources with schema history override this.
    fn upgrade_state(&self, version: i64, state: Value) -> Result<Value, ProviderError> {
        let current = self.schema().version as i64;
        if version == current {
            Ok(state)
        } else if version > current {
            Err(ProviderError::Validation(format!(
                "state for {} is at schema version {}, newer than this provider supports ({})",
                self.type_name(),
                version,
                current
            )))
        } else {
            Err(ProviderError::Validation(format!(
                "no state upgrade path for {} from schema version {}",
                self.type_name(),
                version
            )))
        }
    }
}

/// Read operations for one data source type.
#[async_trait]
pub trait DataSourceHandler: Send + Sync {
    /// The data source type name, e.g. `azure_resource_group`.
    fn type_name(&self) -> &'static str;

    /// The declarative schema for this data source.
    fn schema(&self) -> Schema;

    /// Read the data source. Unlike resource Read, a missing target is an
    /// error here: the user asked for something that must exist.
    async fn read(&self, client: &ArmClient, config: &Value) -> Result<Value, ProviderError>;
}

/// All resource handlers this provider serves.
pub fn all() -> Vec<Arc<dyn ResourceHandler>> {
    vec![
        Arc::new(resource_group::ResourceGroupResource),
        Arc::new(virtual_network::VirtualNetworkResource),
        Arc::new(subnet::SubnetResource),
        Arc::new(public_ip::PublicIpResource),
        Arc::new(network_interface::NetworkInterfaceResource),
        Arc::new(load_balancer::LoadBalancerResource),
        Arc::new(dns_zone::DnsZoneResource),
        Arc::new(dns_a_record::DnsARecordResource),
        Arc::new(storage_account::StorageAccountResource),
        Arc::new(container_registry::ContainerRegistryResource),
        Arc::new(availability_set::AvailabilitySetResource),
    ]
}

// ---------------------------------------------------------------------------
// Schema and adapter helpers shared by every resource module.

/// The `location` attribute: required, replacement on change, folded to
/// ARM's canonical lowercase form.
pub(crate) fn location_attribute() -> Attribute {
    Attribute::required_string()
        .with_force_new()
        .with_state_func(validators::normalize_location)
}

/// The `resource_group_name` attribute.
pub(crate) fn resource_group_name_attribute() -> Attribute {
    Attribute::required_string().with_force_new()
}

/// The `tags` attribute: an optional string map.
pub(crate) fn tags_attribute() -> Attribute {
    Attribute::new(
        AttributeType::map(AttributeType::String),
        AttributeFlags::optional(),
    )
}

/// Expand the `tags` attribute into the ARM tags object.
pub(crate) fn expand_tags(config: &Value) -> Option<Tags> {
    values::str_map(config, "tags")
}

/// Flatten ARM tags into state; empty and absent collapse to nothing.
pub(crate) fn flatten_tags(tags: Option<Tags>) -> Option<Value> {
    tags.filter(|t| !t.is_empty()).map(Value::Object)
}

/// Resolve the resource group for a Read: prefer the recorded attribute,
/// fall back to parsing the id (covers freshly imported state).
pub(crate) fn state_resource_group(state: &Value) -> Result<String, ProviderError> {
    if let Some(rg) = values::opt_str(state, "resource_group_name") {
        return Ok(rg.to_string());
    }
    let id = values::req_str(state, "id")?;
    Ok(crate::resource_id::ResourceId::parse(id)?.resource_group)
}

/// Resolve the resource name for a Read, like [`state_resource_group`].
pub(crate) fn state_name(state: &Value) -> Result<String, ProviderError> {
    if let Some(name) = values::opt_str(state, "name") {
        return Ok(name.to_string());
    }
    let id = values::req_str(state, "id")?;
    Ok(crate::resource_id::ResourceId::parse(id)?
        .leaf_name()
        .to_string())
}
