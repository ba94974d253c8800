//! The `azure_load_balancer` resource.
//!
//! Load balancing rules reference the frontend configuration, the backend
//! pool, and their health probe by ARM id, and those ids only exist once
//! the parent resource does. Create therefore runs in two phases: a first
//! PUT with frontends, the backend pool, and probes, then a second PUT
//! that adds the rules wired up against the now-known child ids.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::{
    expand_tags, flatten_tags, location_attribute, resource_group_name_attribute,
    state_resource_group, state_name, tags_attribute, ResourceHandler,
};
use crate::api::network::{
    BackendAddressPool, FrontendIpConfiguration, FrontendIpConfigurationProperties, LoadBalancer,
    LoadBalancerProperties, LoadBalancingRule, LoadBalancingRuleProperties, Probe, ProbeProperties,
};
use crate::api::SubResource;
use crate::client::ArmClient;
use crate::error::ProviderError;
use crate::migrate::capitalize;
use crate::resource_id::ResourceId;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::validators;
use crate::values::{block_list, opt_i64, opt_str, req_str, single_block, StateMap};

pub struct LoadBalancerResource;

fn req_i64(block: &Value, key: &str) -> Result<i64, ProviderError> {
    opt_i64(block, key)
        .ok_or_else(|| ProviderError::Validation(format!("missing required attribute {:?}", key)))
}

/// Names of all probes declared in configuration, for cross-reference
/// checks before anything is sent to the service.
fn probe_names(planned: &Value) -> Vec<String> {
    block_list(planned, "probe")
        .into_iter()
        .filter_map(|block| opt_str(block, "name"))
        .map(str::to_string)
        .collect()
}

fn expand_frontend(planned: &Value) -> Result<FrontendIpConfiguration, ProviderError> {
    let block = single_block(planned, "frontend_ip_configuration")?;
    let allocation = capitalize(
        opt_str(block, "private_ip_address_allocation").unwrap_or("Dynamic"),
    );

    Ok(FrontendIpConfiguration {
        name: Some(req_str(block, "name")?.to_string()),
        properties: Some(FrontendIpConfigurationProperties {
            private_ip_allocation_method: Some(allocation),
            private_ip_address: opt_str(block, "private_ip_address").map(str::to_string),
            subnet: opt_str(block, "subnet_id").map(SubResource::new),
            public_ip_address: opt_str(block, "public_ip_address_id").map(SubResource::new),
        }),
        ..Default::default()
    })
}

fn expand_probes(planned: &Value) -> Vec<Probe> {
    block_list(planned, "probe")
        .into_iter()
        .map(|block| Probe {
            name: opt_str(block, "name").map(str::to_string),
            properties: Some(ProbeProperties {
                protocol: Some(capitalize(opt_str(block, "protocol").unwrap_or("Tcp"))),
                port: opt_i64(block, "port"),
                interval_in_seconds: Some(opt_i64(block, "interval_in_seconds").unwrap_or(15)),
                number_of_probes: Some(opt_i64(block, "number_of_probes").unwrap_or(2)),
                request_path: opt_str(block, "request_path").map(str::to_string),
            }),
            ..Default::default()
        })
        .collect()
}

/// Phase one: everything except the rules.
fn expand_base(planned: &Value) -> Result<LoadBalancer, ProviderError> {
    let probes = expand_probes(planned);

    Ok(LoadBalancer {
        location: Some(validators::normalize_location(req_str(
            planned, "location",
        )?)),
        tags: expand_tags(planned),
        properties: Some(LoadBalancerProperties {
            frontend_ip_configurations: Some(vec![expand_frontend(planned)?]),
            backend_address_pools: Some(vec![BackendAddressPool {
                name: Some(
                    opt_str(planned, "backend_pool_name")
                        .unwrap_or("default")
                        .to_string(),
                ),
                ..Default::default()
            }]),
            probes: if probes.is_empty() {
                None
            } else {
                Some(probes)
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Phase two: the rules, wired against the child ids under `lb_id`.
fn expand_rules(planned: &Value, lb_id: &str) -> Result<Vec<LoadBalancingRule>, ProviderError> {
    let frontend = single_block(planned, "frontend_ip_configuration")?;
    let frontend_name = req_str(frontend, "name")?;
    let backend_pool = opt_str(planned, "backend_pool_name").unwrap_or("default");
    let known_probes = probe_names(planned);

    let mut rules = Vec::new();
    for block in block_list(planned, "rule") {
        let name = req_str(block, "name")?;

        let probe = match opt_str(block, "probe_name") {
            Some(probe_name) => {
                if !known_probes.iter().any(|p| p == probe_name) {
                    return Err(ProviderError::Validation(format!(
                        "rule {:?} references unknown probe {:?}",
                        name, probe_name
                    )));
                }
                Some(SubResource::new(format!("{}/probes/{}", lb_id, probe_name)))
            },
            None => None,
        };

        rules.push(LoadBalancingRule {
            name: Some(name.to_string()),
            properties: Some(LoadBalancingRuleProperties {
                protocol: Some(capitalize(req_str(block, "protocol")?)),
                load_distribution: opt_str(block, "load_distribution").map(str::to_string),
                frontend_port: Some(req_i64(block, "frontend_port")?),
                backend_port: Some(req_i64(block, "backend_port")?),
                probe,
                backend_address_pool: Some(SubResource::new(format!(
                    "{}/backendAddressPools/{}",
                    lb_id, backend_pool
                ))),
                frontend_ip_configuration: Some(SubResource::new(format!(
                    "{}/frontendIPConfigurations/{}",
                    lb_id, frontend_name
                ))),
            }),
            ..Default::default()
        });
    }
    Ok(rules)
}

/// The last path segment of a child resource id, e.g. the probe name out
/// of `.../probes/http`.
fn id_leaf(id: Option<SubResource>) -> Option<String> {
    id.and_then(|r| r.id)
        .and_then(|id| id.rsplit('/').next().map(str::to_string))
}

fn flatten(name: &str, resource_group: &str, lb: LoadBalancer) -> Value {
    let properties = lb.properties.unwrap_or_default();

    let frontend: Vec<Value> = properties
        .frontend_ip_configurations
        .unwrap_or_default()
        .into_iter()
        .map(|config| {
            let config_properties = config.properties.unwrap_or_default();
            StateMap::new()
                .set_opt("name", config.name)
                .set_opt(
                    "subnet_id",
                    config_properties.subnet.and_then(|s| s.id),
                )
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

    let mut probes: Vec<(String, Value)> = properties
        .probes
        .unwrap_or_default()
        .into_iter()
        .filter_map(|probe| {
            let name = probe.name?;
            let probe_properties = probe.properties.unwrap_or_default();
            let value = StateMap::new()
                .set("name", name.clone())
                .set_opt("protocol", probe_properties.protocol)
                .set_opt("port", probe_properties.port)
                .set_opt("interval_in_seconds", probe_properties.interval_in_seconds)
                .set_opt("number_of_probes", probe_properties.number_of_probes)
                .set_opt("request_path", probe_properties.request_path)
                .finish();
            Some((name, value))
        })
        .collect();
    probes.sort_by(|a, b| a.0.cmp(&b.0));

    let mut rules: Vec<(String, Value)> = properties
        .load_balancing_rules
        .unwrap_or_default()
        .into_iter()
        .filter_map(|rule| {
            let name = rule.name?;
            let rule_properties = rule.properties.unwrap_or_default();
            let value = StateMap::new()
                .set("name", name.clone())
                .set_opt("protocol", rule_properties.protocol)
                .set_opt("frontend_port", rule_properties.frontend_port)
                .set_opt("backend_port", rule_properties.backend_port)
                .set_opt("probe_name", id_leaf(rule_properties.probe))
                .set_opt("load_distribution", rule_properties.load_distribution)
                .finish();
            Some((name, value))
        })
        .collect();
    rules.sort_by(|a, b| a.0.cmp(&b.0));

    let backend_pool_name = properties
        .backend_address_pools
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|pool| pool.name);

    StateMap::new()
        .set_opt("id", lb.id)
        .set("name", lb.name.unwrap_or_else(|| name.to_string()))
        .set("resource_group_name", resource_group)
        .set_opt(
            "location",
            lb.location.as_deref().map(validators::normalize_location),
        )
        .set_list("frontend_ip_configuration", frontend)
        .set_opt("backend_pool_name", backend_pool_name)
        .set_list("probe", probes.into_iter().map(|(_, v)| v).collect())
        .set_list("rule", rules.into_iter().map(|(_, v)| v).collect())
        .set_value("tags", flatten_tags(lb.tags))
        .finish()
}

#[async_trait]
impl ResourceHandler for LoadBalancerResource {
    fn type_name(&self) -> &'static str {
        "azure_load_balancer"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("resource_group_name", resource_group_name_attribute())
            .with_attribute("location", location_attribute())
            .with_block(
                "frontend_ip_configuration",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("name", Attribute::required_string())
                        .with_attribute("subnet_id", Attribute::optional_string())
                        .with_attribute(
                            "private_ip_address",
                            Attribute::new(
                                crate::schema::AttributeType::String,
                                crate::schema::AttributeFlags::optional_computed(),
                            ),
                        )
                        .with_attribute(
                            "private_ip_address_allocation",
                            Attribute::optional_string()
                                .with_validator(validators::allocation_method),
                        )
                        .with_attribute("public_ip_address_id", Attribute::optional_string()),
                )
                .with_min_items(1)
                .with_max_items(1),
            )
            .with_attribute(
                "backend_pool_name",
                Attribute::optional_string().with_default(json!("default")),
            )
            .with_block(
                "probe",
                NestedBlock::set(
                    Block::new()
                        .with_attribute("name", Attribute::required_string())
                        .with_attribute(
                            "protocol",
                            Attribute::optional_string()
                                .with_validator(validators::probe_protocol),
                        )
                        .with_attribute("port", Attribute::required_int64())
                        .with_attribute("request_path", Attribute::optional_string())
                        .with_attribute("interval_in_seconds", Attribute::optional_int64())
                        .with_attribute("number_of_probes", Attribute::optional_int64()),
                ),
            )
            .with_block(
                "rule",
                NestedBlock::set(
                    Block::new()
                        .with_attribute("name", Attribute::required_string())
                        .with_attribute(
                            "protocol",
                            Attribute::required_string()
                                .with_validator(validators::transport_protocol),
                        )
                        .with_attribute("frontend_port", Attribute::required_int64())
                        .with_attribute("backend_port", Attribute::required_int64())
                        .with_attribute("probe_name", Attribute::optional_string())
                        .with_attribute(
                            "load_distribution",
                            Attribute::optional_string()
                                .with_validator(validators::load_distribution),
                        ),
                ),
            )
            .with_attribute("tags", tags_attribute())
    }

    async fn create(&self, client: &ArmClient, planned: &Value) -> Result<Value, ProviderError> {
        let name = req_str(planned, "name")?;
        let resource_group = req_str(planned, "resource_group_name")?;
        info!(name, resource_group, "creating load balancer");

        let mut base = expand_base(planned)?;
        let lb_id = ResourceId::new(
            client.subscription_id(),
            resource_group,
            "Microsoft.Network",
            "loadBalancers",
            name,
        )
        .path();
        let rules = expand_rules(planned, &lb_id)?;

        let lb = client
            .network()
            .create_or_update_load_balancer(resource_group, name, &base)
            .await?;

        if rules.is_empty() {
            return Ok(flatten(name, resource_group, lb));
        }

        info!(name, resource_group, rules = rules.len(), "attaching load balancing rules");
        if let Some(properties) = base.properties.as_mut() {
            properties.load_balancing_rules = Some(rules);
        }
        let lb = client
            .network()
            .create_or_update_load_balancer(resource_group, name, &base)
            .await?;
        Ok(flatten(name, resource_group, lb))
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
            .get_load_balancer(&resource_group, &name)
            .await?
            .map(|lb| flatten(&name, &resource_group, lb)))
    }

    async fn delete(&self, client: &ArmClient, state: &Value) -> Result<(), ProviderError> {
        let name = state_name(state)?;
        let resource_group = state_resource_group(state)?;
        info!(name, resource_group, "deleting load balancer");
        client
            .network()
            .delete_load_balancer(&resource_group, &name)
            .await
    }

    async fn import(&self, client: &ArmClient, id: &str) -> Result<Value, ProviderError> {
        let parsed = ResourceId::parse(id)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    const LB_ID: &str =
        "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/web-lb";

    fn config() -> Value {
        json!({
            "name": "web-lb",
            "resource_group_name": "rg",
            "location": "westus",
            "frontend_ip_configuration": [{
                "name": "public",
                "public_ip_address_id": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/pip1"
            }],
            "probe": [
                {"name": "http", "protocol": "http", "port": 80, "request_path": "/healthz"}
            ],
            "rule": [
                {"name": "web", "protocol": "tcp", "frontend_port": 80, "backend_port": 8080, "probe_name": "http"}
            ]
        })
    }

    #[test]
    fn test_expand_base_has_no_rules() {
        let lb = expand_base(&config()).unwrap();
        let properties = lb.properties.unwrap();
        assert!(properties.load_balancing_rules.is_none());
        assert_eq!(properties.frontend_ip_configurations.unwrap().len(), 1);
        assert_eq!(
            properties.backend_address_pools.unwrap()[0].name.as_deref(),
            Some("default")
        );
        let probes = properties.probes.unwrap();
        assert_eq!(probes.len(), 1);
        let probe_properties = probes[0].properties.as_ref().unwrap();
        assert_eq!(probe_properties.protocol.as_deref(), Some("Http"));
        // Interval and probe count fall back to the service defaults.
        assert_eq!(probe_properties.interval_in_seconds, Some(15));
        assert_eq!(probe_properties.number_of_probes, Some(2));
    }

    #[test]
    fn test_expand_rules_wires_child_ids() {
        let rules = expand_rules(&config(), LB_ID).unwrap();
        assert_eq!(rules.len(), 1);
        let properties = rules[0].properties.as_ref().unwrap();
        assert_eq!(properties.protocol.as_deref(), Some("Tcp"));
        assert_eq!(
            properties.probe.as_ref().unwrap().id.as_deref(),
            Some(format!("{}/probes/http", LB_ID).as_str())
        );
        assert_eq!(
            properties
                .frontend_ip_configuration
                .as_ref()
                .unwrap()
                .id
                .as_deref(),
            Some(format!("{}/frontendIPConfigurations/public", LB_ID).as_str())
        );
        assert_eq!(
            properties
                .backend_address_pool
                .as_ref()
                .unwrap()
                .id
                .as_deref(),
            Some(format!("{}/backendAddressPools/default", LB_ID).as_str())
        );
    }

    #[test]
    fn test_expand_rules_rejects_unknown_probe() {
        let mut config = config();
        config["rule"][0]["probe_name"] = json!("https");
        let err = expand_rules(&config, LB_ID).unwrap_err();
        assert!(err.to_string().contains("unknown probe"));
    }

    #[test]
    fn test_expand_requires_frontend() {
        let err = expand_base(&json!({
            "name": "web-lb", "resource_group_name": "rg", "location": "westus"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("frontend_ip_configuration"));
    }

    #[test]
    fn test_flatten_sorts_and_resolves_probe_names() {
        let lb: LoadBalancer = serde_json::from_value(json!({
            "id": LB_ID,
            "name": "web-lb",
            "location": "westus",
            "properties": {
                "frontendIPConfigurations": [
                    {"name": "public", "properties": {"privateIPAllocationMethod": "Dynamic"}}
                ],
                "backendAddressPools": [{"name": "default"}],
                "probes": [
                    {"name": "https", "properties": {"protocol": "Tcp", "port": 443}},
                    {"name": "http", "properties": {"protocol": "Http", "port": 80, "requestPath": "/healthz"}}
                ],
                "loadBalancingRules": [
                    {"name": "web", "properties": {
                        "protocol": "Tcp", "frontendPort": 80, "backendPort": 8080,
                        "probe": {"id": format!("{}/probes/http", LB_ID)}
                    }}
                ]
            }
        }))
        .unwrap();
        let state = flatten("web-lb", "rg", lb);
        let probes = state["probe"].as_array().unwrap();
        assert_eq!(probes[0]["name"], "http");
        assert_eq!(probes[1]["name"], "https");
        assert_eq!(state["rule"][0]["probe_name"], "http");
        assert_eq!(state["backend_pool_name"], "default");
    }

    #[test]
    fn test_flatten_sparse_response() {
        // Rules without probes, probes the service stripped of properties.
        let lb: LoadBalancer = serde_json::from_value(json!({
            "name": "web-lb",
            "properties": {
                "probes": [{"name": "http"}],
                "loadBalancingRules": [{"name": "web", "properties": {"protocol": "Tcp"}}]
            }
        }))
        .unwrap();
        let state = flatten("web-lb", "rg", lb);
        assert!(state["probe"][0].get("port").is_none());
        assert!(state["rule"][0].get("probe_name").is_none());
        assert!(state.get("backend_pool_name").is_none());
    }

    #[test]
    fn test_schema_validates_protocols() {
        let schema = LoadBalancerResource.schema();
        assert!(validate(&schema, &config()).is_empty());

        let mut bad = config();
        bad["rule"][0]["protocol"] = json!("icmp");
        bad["probe"][0]["protocol"] = json!("udp");
        assert_eq!(validate(&schema, &bad).len(), 2);
    }
}
