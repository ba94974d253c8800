//! Azure Resource Manager resource ids.
//!
//! Every ARM resource is addressed by a structured path of the form
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}`,
//! optionally followed by one child segment pair (e.g.
//! `.../virtualNetworks/vnet1/subnets/frontend`). Resource group ids stop
//! after the group name. Ids are parsed case-insensitively on the fixed
//! segments and re-serialized without losing any component.

use crate::error::ProviderError;

/// A parsed ARM resource id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    /// The subscription the resource lives in.
    pub subscription_id: String,
    /// The resource group name.
    pub resource_group: String,
    /// Provider path; `None` for a bare resource group id.
    pub provider: Option<ProviderPath>,
}

/// The `/providers/...` tail of a resource id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPath {
    /// The resource provider namespace, e.g. `Microsoft.Network`.
    pub namespace: String,
    /// The resource type under the namespace, e.g. `virtualNetworks`.
    pub resource_type: String,
    /// The resource name.
    pub name: String,
    /// Optional child segment: (type, name), e.g. `("subnets", "frontend")`.
    pub child: Option<(String, String)>,
}

impl ResourceId {
    /// Id of a resource group.
    pub fn resource_group(subscription_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: name.into(),
            provider: None,
        }
    }

    /// Id of a top-level resource under a provider namespace.
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        namespace: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            provider: Some(ProviderPath {
                namespace: namespace.into(),
                resource_type: resource_type.into(),
                name: name.into(),
                child: None,
            }),
        }
    }

    /// Append a child segment (e.g. a subnet under a virtual network).
    ///
    /// Ignored on bare resource group ids, which cannot have children.
    pub fn with_child(mut self, child_type: impl Into<String>, name: impl Into<String>) -> Self {
        if let Some(provider) = &mut self.provider {
            provider.child = Some((child_type.into(), name.into()));
        }
        self
    }

    /// Parse an ARM id. Fixed segments match case-insensitively; value
    /// segments keep their original form.
    pub fn parse(id: &str) -> Result<Self, ProviderError> {
        let malformed = || ProviderError::Validation(format!("malformed ARM resource id: {:?}", id));

        fn fixed<'a>(
            segments: &mut std::str::Split<'a, char>,
            expected: &str,
        ) -> Option<()> {
            segments
                .next()
                .filter(|s| s.eq_ignore_ascii_case(expected))
                .map(|_| ())
        }
        fn value<'a>(segments: &mut std::str::Split<'a, char>) -> Option<&'a str> {
            segments.next().filter(|s| !s.is_empty())
        }

        let mut segments = id.strip_prefix('/').ok_or_else(malformed)?.split('/');

        fixed(&mut segments, "subscriptions").ok_or_else(malformed)?;
        let subscription_id = value(&mut segments).ok_or_else(malformed)?;
        fixed(&mut segments, "resourceGroups").ok_or_else(malformed)?;
        let resource_group = value(&mut segments).ok_or_else(malformed)?;

        let mut parsed = Self::resource_group(subscription_id, resource_group);

        match segments.next() {
            None => return Ok(parsed),
            Some(s) if s.eq_ignore_ascii_case("providers") => {},
            Some(_) => return Err(malformed()),
        }

        let namespace = value(&mut segments).ok_or_else(malformed)?;
        let resource_type = value(&mut segments).ok_or_else(malformed)?;
        let name = value(&mut segments).ok_or_else(malformed)?;
        parsed.provider = Some(ProviderPath {
            namespace: namespace.to_string(),
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            child: None,
        });

        match (segments.next(), segments.next()) {
            (None, _) => {},
            (Some(child_type), Some(child_name))
                if !child_type.is_empty() && !child_name.is_empty() =>
            {
                if segments.next().is_some() {
                    return Err(malformed());
                }
                parsed = parsed.with_child(child_type, child_name);
            },
            _ => return Err(malformed()),
        }

        Ok(parsed)
    }

    /// Re-serialize to the canonical path form.
    pub fn path(&self) -> String {
        let mut path = format!(
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        );
        if let Some(provider) = &self.provider {
            path.push_str(&format!(
                "/providers/{}/{}/{}",
                provider.namespace, provider.resource_type, provider.name
            ));
            if let Some((child_type, child_name)) = &provider.child {
                path.push_str(&format!("/{}/{}", child_type, child_name));
            }
        }
        path
    }

    /// The leaf resource name: the child name if present, otherwise the
    /// resource name, otherwise the resource group name.
    pub fn leaf_name(&self) -> &str {
        match &self.provider {
            Some(ProviderPath {
                child: Some((_, child_name)),
                ..
            }) => child_name,
            Some(provider) => &provider.name,
            None => &self.resource_group,
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_group_id_round_trip() {
        let id = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/production";
        let parsed = ResourceId::parse(id).unwrap();
        assert_eq!(
            parsed.subscription_id,
            "00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(parsed.resource_group, "production");
        assert!(parsed.provider.is_none());
        assert_eq!(parsed.path(), id);
    }

    #[test]
    fn test_resource_id_round_trip() {
        let id = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1";
        let parsed = ResourceId::parse(id).unwrap();
        let provider = parsed.provider.as_ref().unwrap();
        assert_eq!(provider.namespace, "Microsoft.Network");
        assert_eq!(provider.resource_type, "virtualNetworks");
        assert_eq!(provider.name, "vnet1");
        assert!(provider.child.is_none());
        assert_eq!(parsed.path(), id);
        assert_eq!(parsed.leaf_name(), "vnet1");
    }

    #[test]
    fn test_child_resource_id_round_trip() {
        let id = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/frontend";
        let parsed = ResourceId::parse(id).unwrap();
        let provider = parsed.provider.as_ref().unwrap();
        assert_eq!(
            provider.child,
            Some(("subnets".to_string(), "frontend".to_string()))
        );
        assert_eq!(parsed.path(), id);
        assert_eq!(parsed.leaf_name(), "frontend");
    }

    #[test]
    fn test_fixed_segments_case_insensitive() {
        // ARM occasionally returns lowercased fixed segments.
        let id = "/SUBSCRIPTIONS/sub/resourcegroups/rg/PROVIDERS/Microsoft.Dns/dnszones/example.com";
        let parsed = ResourceId::parse(id).unwrap();
        assert_eq!(parsed.resource_group, "rg");
        let provider = parsed.provider.as_ref().unwrap();
        assert_eq!(provider.name, "example.com");
        // Re-serialization canonicalizes fixed segments, keeps values.
        assert_eq!(
            parsed.path(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Dns/dnszones/example.com"
        );
    }

    #[test]
    fn test_builders() {
        let id = ResourceId::new("sub", "rg", "Microsoft.Network", "virtualNetworks", "vnet1")
            .with_child("subnets", "backend");
        assert_eq!(
            id.path(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/backend"
        );

        let id = ResourceId::resource_group("sub", "rg").with_child("subnets", "x");
        // Children don't apply to resource groups.
        assert_eq!(id.path(), "/subscriptions/sub/resourceGroups/rg");
    }

    #[test]
    fn test_malformed_ids() {
        for bad in [
            "",
            "no-leading-slash",
            "/subscriptions",
            "/subscriptions/sub",
            "/subscriptions/sub/resourceGroups",
            "/subscriptions/sub/resourceGroups/rg/notproviders/x/y/z",
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network",
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks",
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v/subnets",
            "/subscriptions/sub/resourceGroups/rg/providers/ns/t/n/ct/cn/extra",
        ] {
            assert!(ResourceId::parse(bad).is_err(), "expected error for {:?}", bad);
        }
    }
}
