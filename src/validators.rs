//! Attribute validators and normalizers shared by the resource schemas.
//!
//! Validators are pure functions from (attribute path, value) to a list of
//! error messages; they run after structural type checks, so string
//! validators can assume a string input.

use serde_json::Value;

/// Fold an Azure location into its canonical form: lowercase, no spaces.
/// ARM accepts "West US" and returns "westus"; comparing the two must not
/// produce a diff.
pub fn normalize_location(location: &str) -> String {
    location.to_lowercase().replace(' ', "")
}

/// Container registry names: alphanumeric only, 5 to 50 characters.
pub fn container_registry_name(path: &str, value: &Value) -> Vec<String> {
    let Some(name) = value.as_str() else {
        return vec![];
    };
    let mut errors = Vec::new();

    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        errors.push(format!(
            "only alphanumeric characters are allowed in {}: {:?}",
            path, name
        ));
    }
    if name.len() < 5 || name.len() > 50 {
        errors.push(format!(
            "{} must be between 5 and 50 characters: {:?}",
            path, name
        ));
    }

    errors
}

/// Storage account names: lowercase letters and digits only, 3 to 24
/// characters, globally unique on the Azure side.
pub fn storage_account_name(path: &str, value: &Value) -> Vec<String> {
    let Some(name) = value.as_str() else {
        return vec![];
    };
    let mut errors = Vec::new();

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        errors.push(format!(
            "only lowercase alphanumeric characters are allowed in {}: {:?}",
            path, name
        ));
    }
    if name.len() < 3 || name.len() > 24 {
        errors.push(format!(
            "{} must be between 3 and 24 characters: {:?}",
            path, name
        ));
    }

    errors
}

/// IP allocation method: Static or Dynamic, any casing.
pub fn allocation_method(path: &str, value: &Value) -> Vec<String> {
    let Some(method) = value.as_str() else {
        return vec![];
    };
    match method.to_lowercase().as_str() {
        "static" | "dynamic" => vec![],
        _ => vec![format!(
            "{} can only be Static or Dynamic, got {:?}",
            path, method
        )],
    }
}

/// Load balancing rule transport protocol: Tcp or Udp.
pub fn transport_protocol(path: &str, value: &Value) -> Vec<String> {
    let Some(protocol) = value.as_str() else {
        return vec![];
    };
    match protocol.to_lowercase().as_str() {
        "tcp" | "udp" => vec![],
        _ => vec![format!("{} can only be Tcp or Udp, got {:?}", path, protocol)],
    }
}

/// Health probe protocol: Tcp or Http.
pub fn probe_protocol(path: &str, value: &Value) -> Vec<String> {
    let Some(protocol) = value.as_str() else {
        return vec![];
    };
    match protocol.to_lowercase().as_str() {
        "tcp" | "http" => vec![],
        _ => vec![format!(
            "{} can only be Tcp or Http, got {:?}",
            path, protocol
        )],
    }
}

/// Load distribution: Default, SourceIP, or SourceIPProtocol.
pub fn load_distribution(path: &str, value: &Value) -> Vec<String> {
    let Some(distribution) = value.as_str() else {
        return vec![];
    };
    match distribution.to_lowercase().as_str() {
        "default" | "sourceip" | "sourceipprotocol" => vec![],
        _ => vec![format!(
            "{} can only be Default, SourceIP, or SourceIPProtocol, got {:?}",
            path, distribution
        )],
    }
}

/// IPv4 CIDR blocks like "10.0.0.0/16".
pub fn cidr(path: &str, value: &Value) -> Vec<String> {
    let Some(block) = value.as_str() else {
        return vec![];
    };

    let Some((ip, prefix)) = block.split_once('/') else {
        return vec![format!(
            "{} is not a valid CIDR, expected IP/prefix: {:?}",
            path, block
        )];
    };

    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 || octets.iter().any(|o| o.parse::<u8>().is_err()) {
        return vec![format!("{} has an invalid IP address: {:?}", path, ip)];
    }

    match prefix.parse::<u8>() {
        Ok(p) if p <= 32 => vec![],
        _ => vec![format!(
            "{} has an invalid prefix length, must be 0-32: {:?}",
            path, prefix
        )],
    }
}

/// DNS record TTLs: 1 second to 2^31-1 per RFC 2181.
pub fn dns_ttl(path: &str, value: &Value) -> Vec<String> {
    let Some(ttl) = value.as_i64() else {
        return vec![];
    };
    if ttl < 1 || ttl > i64::from(i32::MAX) {
        vec![format!("{} must be between 1 and 2147483647, got {}", path, ttl)]
    } else {
        vec![]
    }
}

/// Availability set platform fault domain count: 1 to 3.
pub fn fault_domain_count(path: &str, value: &Value) -> Vec<String> {
    let Some(count) = value.as_i64() else {
        return vec![];
    };
    if (1..=3).contains(&count) {
        vec![]
    } else {
        vec![format!("{} must be between 1 and 3, got {}", path, count)]
    }
}

/// Availability set platform update domain count: 1 to 20.
pub fn update_domain_count(path: &str, value: &Value) -> Vec<String> {
    let Some(count) = value.as_i64() else {
        return vec![];
    };
    if (1..=20).contains(&count) {
        vec![]
    } else {
        vec![format!("{} must be between 1 and 20, got {}", path, count)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_location() {
        assert_eq!(normalize_location("West US"), "westus");
        assert_eq!(normalize_location("westus"), "westus");
        assert_eq!(normalize_location("North Central US"), "northcentralus");
    }

    #[test]
    fn test_container_registry_name() {
        // Too short: exactly one error.
        assert_eq!(container_registry_name("name", &json!("four")).len(), 1);
        // Mixed case is allowed.
        assert!(container_registry_name("name", &json!("helloWorld")).is_empty());
        // Hyphens are not.
        assert_eq!(
            container_registry_name("name", &json!("hello-world")).len(),
            1
        );
        // Too short and non-alphanumeric: two distinct errors.
        assert_eq!(container_registry_name("name", &json!("a-b")).len(), 2);
        // Upper bound.
        assert_eq!(
            container_registry_name("name", &json!("a".repeat(51))).len(),
            1
        );
        assert!(container_registry_name("name", &json!("a".repeat(50))).is_empty());
    }

    #[test]
    fn test_container_registry_name_is_pure() {
        let first = container_registry_name("name", &json!("four"));
        let second = container_registry_name("name", &json!("four"));
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_storage_account_name() {
        assert!(storage_account_name("name", &json!("prodlogs01")).is_empty());
        assert_eq!(storage_account_name("name", &json!("ab")).len(), 1);
        assert_eq!(storage_account_name("name", &json!("ProdLogs")).len(), 1);
        assert_eq!(
            storage_account_name("name", &json!("a".repeat(25))).len(),
            1
        );
    }

    #[test]
    fn test_allocation_method() {
        assert!(allocation_method("m", &json!("Static")).is_empty());
        assert!(allocation_method("m", &json!("dynamic")).is_empty());
        assert!(allocation_method("m", &json!("DYNAMIC")).is_empty());
        assert_eq!(allocation_method("m", &json!("Fixed")).len(), 1);
    }

    #[test]
    fn test_lb_protocols() {
        assert!(transport_protocol("p", &json!("Tcp")).is_empty());
        assert!(transport_protocol("p", &json!("udp")).is_empty());
        assert_eq!(transport_protocol("p", &json!("icmp")).len(), 1);

        assert!(probe_protocol("p", &json!("Http")).is_empty());
        assert_eq!(probe_protocol("p", &json!("udp")).len(), 1);

        assert!(load_distribution("d", &json!("SourceIP")).is_empty());
        assert_eq!(load_distribution("d", &json!("roundrobin")).len(), 1);
    }

    #[test]
    fn test_cidr() {
        assert!(cidr("c", &json!("10.0.0.0/16")).is_empty());
        assert!(cidr("c", &json!("0.0.0.0/0")).is_empty());
        assert!(cidr("c", &json!("255.255.255.255/32")).is_empty());

        assert_eq!(cidr("c", &json!("10.0.0.0")).len(), 1);
        assert_eq!(cidr("c", &json!("10.0.0.0/33")).len(), 1);
        assert_eq!(cidr("c", &json!("10.0.0.256/16")).len(), 1);
        assert_eq!(cidr("c", &json!("10.0.0/16")).len(), 1);
    }

    #[test]
    fn test_dns_ttl() {
        assert!(dns_ttl("ttl", &json!(300)).is_empty());
        assert_eq!(dns_ttl("ttl", &json!(0)).len(), 1);
        assert_eq!(dns_ttl("ttl", &json!(2147483648i64)).len(), 1);
    }

    #[test]
    fn test_domain_counts() {
        assert!(fault_domain_count("f", &json!(3)).is_empty());
        assert_eq!(fault_domain_count("f", &json!(4)).len(), 1);
        assert!(update_domain_count("u", &json!(20)).is_empty());
        assert_eq!(update_domain_count("u", &json!(0)).len(), 1);
    }
}
