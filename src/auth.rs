//! Credentials and Azure Active Directory authentication.
//!
//! The provider authenticates once per Configure with the OAuth2
//! client-credentials grant and caches the bearer token until shortly
//! before it expires. Authentication failures are fatal for Configure;
//! nothing is retried here.

use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ProviderError;
use crate::values::opt_str;

/// Tokens are refreshed this long before their actual expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

/// Service principal credentials, from configuration or the `ARM_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// The Azure subscription to operate in.
    pub subscription_id: String,
    /// The service principal's application (client) id.
    pub client_id: String,
    /// The service principal's secret.
    pub client_secret: String,
    /// The Azure Active Directory tenant id.
    pub tenant_id: String,
}

impl Credentials {
    /// Resolve credentials from the provider configuration block, falling
    /// back to environment variables field by field. Every field is
    /// required; the error names all missing ones at once.
    pub fn from_config(config: &Value) -> Result<Self, ProviderError> {
        let mut missing = Vec::new();
        let mut resolve = |attr: &str, env: &str| -> String {
            match opt_str(config, attr)
                .map(str::to_string)
                .filter(|s| !s.is_empty())
                .or_else(|| std::env::var(env).ok().filter(|s| !s.is_empty()))
            {
                Some(value) => value,
                None => {
                    missing.push(format!("{} (or {})", attr, env));
                    String::new()
                },
            }
        };

        let credentials = Self {
            subscription_id: resolve("subscription_id", "ARM_SUBSCRIPTION_ID"),
            client_id: resolve("client_id", "ARM_CLIENT_ID"),
            client_secret: resolve("client_secret", "ARM_CLIENT_SECRET"),
            tenant_id: resolve("tenant_id", "ARM_TENANT_ID"),
        };

        if missing.is_empty() {
            Ok(credentials)
        } else {
            Err(ProviderError::Configuration(format!(
                "missing provider credentials: {}",
                missing.join(", ")
            )))
        }
    }
}

/// The Azure cloud to talk to. Selects the Resource Manager and Active
/// Directory endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureEnvironment {
    /// Environment name as configured (e.g. "public").
    pub name: String,
    /// Base URL of the Resource Manager API, no trailing slash.
    pub resource_manager: String,
    /// Base URL of the AAD login endpoint, no trailing slash.
    pub active_directory: String,
}

impl AzureEnvironment {
    /// The global Azure cloud.
    pub fn public() -> Self {
        Self {
            name: "public".to_string(),
            resource_manager: "https://management.azure.com".to_string(),
            active_directory: "https://login.microsoftonline.com".to_string(),
        }
    }

    /// Azure US Government.
    pub fn us_government() -> Self {
        Self {
            name: "usgovernment".to_string(),
            resource_manager: "https://management.usgovcloudapi.net".to_string(),
            active_directory: "https://login.microsoftonline.us".to_string(),
        }
    }

    /// Azure China (21Vianet).
    pub fn china() -> Self {
        Self {
            name: "china".to_string(),
            resource_manager: "https://management.chinacloudapi.cn".to_string(),
            active_directory: "https://login.chinacloudapi.cn".to_string(),
        }
    }

    /// Azure Germany.
    pub fn german() -> Self {
        Self {
            name: "german".to_string(),
            resource_manager: "https://management.microsoftazure.de".to_string(),
            active_directory: "https://login.microsoftonline.de".to_string(),
        }
    }

    /// Resolve a named environment ("public", "usgovernment", "china",
    /// "german"), as configured or from `ARM_ENVIRONMENT`.
    pub fn from_name(name: &str) -> Result<Self, ProviderError> {
        match name.to_lowercase().as_str() {
            "" | "public" => Ok(Self::public()),
            "usgovernment" => Ok(Self::us_government()),
            "china" => Ok(Self::china()),
            "german" => Ok(Self::german()),
            other => Err(ProviderError::Configuration(format!(
                "unknown Azure environment {:?}, expected public, usgovernment, china, or german",
                other
            ))),
        }
    }

    /// An environment with explicit endpoints. Used by tests to point the
    /// provider at a local mock server.
    pub fn custom(resource_manager: impl Into<String>, active_directory: impl Into<String>) -> Self {
        Self {
            name: "custom".to_string(),
            resource_manager: resource_manager.into(),
            active_directory: active_directory.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    // AAD's v1 endpoint returns expires_in as a JSON string.
    #[serde(default)]
    expires_in: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Acquires and caches AAD bearer tokens for the configured service
/// principal. Shared by every service client through the connection.
#[derive(Debug)]
pub struct TokenProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    resource: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Build a token provider for the given credentials and environment.
    pub fn new(http: reqwest::Client, credentials: &Credentials, environment: &AzureEnvironment) -> Self {
        Self {
            http,
            token_url: format!(
                "{}/{}/oauth2/token",
                environment.active_directory, credentials.tenant_id
            ),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            // The ARM resource URI the token is scoped to.
            resource: format!("{}/", environment.resource_manager),
            cached: Mutex::new(None),
        }
    }

    /// Return a valid bearer token, refreshing it when the cached one is
    /// absent or close to expiry.
    pub async fn bearer_token(&self) -> Result<String, ProviderError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.token.clone());
            }
        }

        debug!(token_url = %self.token_url, "requesting AAD token");
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("resource", self.resource.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| {
                    if e.error_description.is_empty() {
                        e.error
                    } else {
                        e.error_description
                    }
                })
                .unwrap_or(body);
            return Err(ProviderError::Auth(format!(
                "token request failed with status {}: {}",
                status.as_u16(),
                message
            )));
        }

        let token: TokenResponse = response.json().await?;
        let expires_in = token
            .expires_in
            .as_ref()
            .and_then(parse_expires_in)
            .unwrap_or(3600);
        let lifetime = Duration::from_secs(expires_in).saturating_sub(EXPIRY_MARGIN);

        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

fn parse_expires_in(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_credentials_from_config() {
        let config = json!({
            "subscription_id": "sub",
            "client_id": "client",
            "client_secret": "secret",
            "tenant_id": "tenant",
        });
        let credentials = Credentials::from_config(&config).unwrap();
        assert_eq!(credentials.subscription_id, "sub");
        assert_eq!(credentials.tenant_id, "tenant");
    }

    #[test]
    fn test_credentials_missing_fields_all_named() {
        let config = json!({"subscription_id": "sub"});
        let err = Credentials::from_config(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("client_id"));
        assert!(message.contains("client_secret"));
        assert!(message.contains("tenant_id"));
        assert!(message.contains("ARM_CLIENT_ID"));
    }

    #[test]
    fn test_credentials_empty_string_counts_as_missing() {
        let config = json!({
            "subscription_id": "",
            "client_id": "client",
            "client_secret": "secret",
            "tenant_id": "tenant",
        });
        // Empty strings fall through to the environment; with neither set
        // the field is reported missing.
        if std::env::var("ARM_SUBSCRIPTION_ID").is_err() {
            let err = Credentials::from_config(&config).unwrap_err();
            assert!(err.to_string().contains("subscription_id"));
        }
    }

    #[test]
    fn test_environment_from_name() {
        assert_eq!(AzureEnvironment::from_name("public").unwrap().name, "public");
        assert_eq!(AzureEnvironment::from_name("").unwrap().name, "public");
        assert_eq!(
            AzureEnvironment::from_name("USGovernment").unwrap().name,
            "usgovernment"
        );
        assert!(AzureEnvironment::from_name("sideways").is_err());
    }

    #[test]
    fn test_environment_endpoints() {
        let env = AzureEnvironment::china();
        assert_eq!(env.resource_manager, "https://management.chinacloudapi.cn");
        assert_eq!(env.active_directory, "https://login.chinacloudapi.cn");
    }

    #[test]
    fn test_parse_expires_in() {
        assert_eq!(parse_expires_in(&json!(3600)), Some(3600));
        assert_eq!(parse_expires_in(&json!("3599")), Some(3599));
        assert_eq!(parse_expires_in(&json!([])), None);
    }
}
