//! Microsoft.Network: virtual networks, subnets, public IPs, network
//! interfaces, and load balancers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{SubResource, Tags};
use crate::client::ArmConnection;
use crate::error::ProviderError;
use crate::resource_id::ResourceId;

const API_VERSION: &str = "2022-07-01";
const NAMESPACE: &str = "Microsoft.Network";

// ---------------------------------------------------------------------------
// Virtual networks and subnets

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetwork {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<VirtualNetworkProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_space: Option<AddressSpace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp_options: Option<DhcpOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnets: Option<Vec<Subnet>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DhcpOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_servers: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<SubnetProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_security_group: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

// ---------------------------------------------------------------------------
// Public IP addresses

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PublicIpAddressProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddressProperties {
    #[serde(
        rename = "publicIPAllocationMethod",
        skip_serializing_if = "Option::is_none"
    )]
    pub public_ip_allocation_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_in_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_settings: Option<PublicIpDnsSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpDnsSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_name_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

// ---------------------------------------------------------------------------
// Network interfaces

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<NetworkInterfaceProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_configurations: Option<Vec<IpConfiguration>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_settings: Option<InterfaceDnsSettings>,
    #[serde(
        rename = "enableIPForwarding",
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_ip_forwarding: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDnsSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_servers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_dns_name_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IpConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IpConfigurationProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IpConfigurationProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<SubResource>,
    #[serde(
        rename = "privateIPAddress",
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_address: Option<String>,
    #[serde(
        rename = "privateIPAllocationMethod",
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_allocation_method: Option<String>,
    #[serde(
        rename = "publicIPAddress",
        skip_serializing_if = "Option::is_none"
    )]
    pub public_ip_address: Option<SubResource>,
}

// ---------------------------------------------------------------------------
// Load balancers

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<LoadBalancerProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerProperties {
    #[serde(
        rename = "frontendIPConfigurations",
        skip_serializing_if = "Option::is_none"
    )]
    pub frontend_ip_configurations: Option<Vec<FrontendIpConfiguration>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_address_pools: Option<Vec<BackendAddressPool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probes: Option<Vec<Probe>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancing_rules: Option<Vec<LoadBalancingRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FrontendIpConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<FrontendIpConfigurationProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FrontendIpConfigurationProperties {
    #[serde(
        rename = "privateIPAllocationMethod",
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_allocation_method: Option<String>,
    #[serde(
        rename = "privateIPAddress",
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<SubResource>,
    #[serde(
        rename = "publicIPAddress",
        skip_serializing_if = "Option::is_none"
    )]
    pub public_ip_address: Option<SubResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BackendAddressPool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ProbeProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProbeProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_in_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_probes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancingRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<LoadBalancingRuleProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancingRuleProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_distribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontend_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_address_pool: Option<SubResource>,
    #[serde(
        rename = "frontendIPConfiguration",
        skip_serializing_if = "Option::is_none"
    )]
    pub frontend_ip_configuration: Option<SubResource>,
}

// ---------------------------------------------------------------------------
// Client

/// Client for Microsoft.Network resources.
#[derive(Debug, Clone)]
pub struct NetworkClient {
    conn: Arc<ArmConnection>,
}

impl NetworkClient {
    pub(crate) fn new(conn: Arc<ArmConnection>) -> Self {
        Self { conn }
    }

    fn path(&self, resource_group: &str, resource_type: &str, name: &str) -> String {
        ResourceId::new(
            self.conn.subscription_id(),
            resource_group,
            NAMESPACE,
            resource_type,
            name,
        )
        .path()
    }

    fn subnet_path(&self, resource_group: &str, vnet: &str, name: &str) -> String {
        ResourceId::new(
            self.conn.subscription_id(),
            resource_group,
            NAMESPACE,
            "virtualNetworks",
            vnet,
        )
        .with_child("subnets", name)
        .path()
    }

    pub async fn create_or_update_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        vnet: &VirtualNetwork,
    ) -> Result<VirtualNetwork, ProviderError> {
        self.conn
            .put(
                "virtualNetworks.CreateOrUpdate",
                &self.path(resource_group, "virtualNetworks", name),
                API_VERSION,
                vnet,
            )
            .await
    }

    pub async fn get_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<VirtualNetwork>, ProviderError> {
        self.conn
            .get(
                "virtualNetworks.Get",
                &self.path(resource_group, "virtualNetworks", name),
                API_VERSION,
            )
            .await
    }

    pub async fn delete_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), ProviderError> {
        self.conn
            .delete(
                "virtualNetworks.Delete",
                &self.path(resource_group, "virtualNetworks", name),
                API_VERSION,
            )
            .await
    }

    pub async fn create_or_update_subnet(
        &self,
        resource_group: &str,
        vnet: &str,
        name: &str,
        subnet: &Subnet,
    ) -> Result<Subnet, ProviderError> {
        self.conn
            .put(
                "subnets.CreateOrUpdate",
                &self.subnet_path(resource_group, vnet, name),
                API_VERSION,
                subnet,
            )
            .await
    }

    pub async fn get_subnet(
        &self,
        resource_group: &str,
        vnet: &str,
        name: &str,
    ) -> Result<Option<Subnet>, ProviderError> {
        self.conn
            .get(
                "subnets.Get",
                &self.subnet_path(resource_group, vnet, name),
                API_VERSION,
            )
            .await
    }

    pub async fn delete_subnet(
        &self,
        resource_group: &str,
        vnet: &str,
        name: &str,
    ) -> Result<(), ProviderError> {
        self.conn
            .delete(
                "subnets.Delete",
                &self.subnet_path(resource_group, vnet, name),
                API_VERSION,
            )
            .await
    }

    pub async fn create_or_update_public_ip(
        &self,
        resource_group: &str,
        name: &str,
        public_ip: &PublicIpAddress,
    ) -> Result<PublicIpAddress, ProviderError> {
        self.conn
            .put(
                "publicIPAddresses.CreateOrUpdate",
                &self.path(resource_group, "publicIPAddresses", name),
                API_VERSION,
                public_ip,
            )
            .await
    }

    pub async fn get_public_ip(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<PublicIpAddress>, ProviderError> {
        self.conn
            .get(
                "publicIPAddresses.Get",
                &self.path(resource_group, "publicIPAddresses", name),
                API_VERSION,
            )
            .await
    }

    pub async fn delete_public_ip(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), ProviderError> {
        self.conn
            .delete(
                "publicIPAddresses.Delete",
                &self.path(resource_group, "publicIPAddresses", name),
                API_VERSION,
            )
            .await
    }

    pub async fn create_or_update_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        nic: &NetworkInterface,
    ) -> Result<NetworkInterface, ProviderError> {
        self.conn
            .put(
                "networkInterfaces.CreateOrUpdate",
                &self.path(resource_group, "networkInterfaces", name),
                API_VERSION,
                nic,
            )
            .await
    }

    pub async fn get_network_interface(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<NetworkInterface>, ProviderError> {
        self.conn
            .get(
                "networkInterfaces.Get",
                &self.path(resource_group, "networkInterfaces", name),
                API_VERSION,
            )
            .await
    }

    pub async fn delete_network_interface(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), ProviderError> {
        self.conn
            .delete(
                "networkInterfaces.Delete",
                &self.path(resource_group, "networkInterfaces", name),
                API_VERSION,
            )
            .await
    }

    pub async fn create_or_update_load_balancer(
        &self,
        resource_group: &str,
        name: &str,
        lb: &LoadBalancer,
    ) -> Result<LoadBalancer, ProviderError> {
        self.conn
            .put(
                "loadBalancers.CreateOrUpdate",
                &self.path(resource_group, "loadBalancers", name),
                API_VERSION,
                lb,
            )
            .await
    }

    pub async fn get_load_balancer(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<LoadBalancer>, ProviderError> {
        self.conn
            .get(
                "loadBalancers.Get",
                &self.path(resource_group, "loadBalancers", name),
                API_VERSION,
            )
            .await
    }

    pub async fn delete_load_balancer(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), ProviderError> {
        self.conn
            .delete(
                "loadBalancers.Delete",
                &self.path(resource_group, "loadBalancers", name),
                API_VERSION,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vnet_serialization_skips_unset() {
        let vnet = VirtualNetwork {
            location: Some("westus".to_string()),
            properties: Some(VirtualNetworkProperties {
                address_space: Some(AddressSpace {
                    address_prefixes: Some(vec!["10.0.0.0/16".to_string()]),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let body = serde_json::to_value(&vnet).unwrap();
        assert_eq!(
            body,
            json!({
                "location": "westus",
                "properties": {
                    "addressSpace": {"addressPrefixes": ["10.0.0.0/16"]}
                }
            })
        );
    }

    #[test]
    fn test_public_ip_wire_casing() {
        let pip = PublicIpAddress {
            properties: Some(PublicIpAddressProperties {
                public_ip_allocation_method: Some("Static".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let body = serde_json::to_value(&pip).unwrap();
        // ARM capitalizes IP in this field name.
        assert!(body["properties"]
            .as_object()
            .unwrap()
            .contains_key("publicIPAllocationMethod"));
    }

    #[test]
    fn test_nic_deserializes_sparse_response() {
        // A NIC the service returns before any optional settings exist.
        let body = json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkInterfaces/nic1",
            "name": "nic1",
            "properties": {
                "ipConfigurations": [
                    {"name": "primary", "properties": {"subnet": {"id": "/sub/x"}}}
                ]
            }
        });
        let nic: NetworkInterface = serde_json::from_value(body).unwrap();
        let props = nic.properties.unwrap();
        assert!(props.mac_address.is_none());
        assert!(props.dns_settings.is_none());
        let configs = props.ip_configurations.unwrap();
        assert_eq!(configs.len(), 1);
        assert!(configs[0].properties.as_ref().unwrap().public_ip_address.is_none());
    }

    #[test]
    fn test_load_balancer_round_trip() {
        let lb = LoadBalancer {
            properties: Some(LoadBalancerProperties {
                probes: Some(vec![Probe {
                    name: Some("http".to_string()),
                    properties: Some(ProbeProperties {
                        protocol: Some("Tcp".to_string()),
                        port: Some(80),
                        interval_in_seconds: Some(5),
                        number_of_probes: Some(2),
                        request_path: None,
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let body = serde_json::to_value(&lb).unwrap();
        let back: LoadBalancer = serde_json::from_value(body).unwrap();
        assert_eq!(back, lb);
    }
}
