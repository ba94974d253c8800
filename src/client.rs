//! The ARM client: shared connection, request plumbing, and the per-service
//! client factory.
//!
//! An [`ArmClient`] is built once during Configure and then only read, so
//! handler invocations on separate tasks can share it freely. Each service
//! family (resource groups, network, DNS, storage, registry, compute) gets
//! a thin typed client over the same connection.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::{
    compute::ComputeClient, containerregistry::RegistryClient, dns::DnsClient,
    network::NetworkClient, resources::ResourceGroupsClient, storage::StorageClient,
};
use crate::auth::{AzureEnvironment, Credentials, TokenProvider};
use crate::error::ProviderError;

/// Tunables for the HTTP layer. Defaults fit the real service; tests dial
/// the polling interval down to milliseconds.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Delay between long-running-operation polls.
    pub poll_interval: Duration,
    /// Maximum number of polls before giving up.
    pub poll_attempts: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            poll_attempts: 120,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ArmErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ArmErrorEnvelope {
    #[serde(default)]
    error: Option<ArmErrorDetail>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// The shared connection: HTTP client, token cache, endpoints, and the
/// cancellation signal from Stop. Read-only after construction.
#[derive(Debug)]
pub struct ArmConnection {
    http: reqwest::Client,
    tokens: TokenProvider,
    environment: AzureEnvironment,
    subscription_id: String,
    options: ClientOptions,
    cancel: watch::Receiver<bool>,
}

impl ArmConnection {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.environment.resource_manager, path)
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        api_version: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, ProviderError> {
        let token = self.tokens.bearer_token().await?;
        let mut request = self
            .http
            .request(method, self.url(path))
            .query(&[("api-version", api_version)])
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn error_from_response(
        operation: &str,
        path: &str,
        response: reqwest::Response,
    ) -> ProviderError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ArmErrorEnvelope>(&body)
            .ok()
            .and_then(|envelope| {
                envelope
                    .error
                    .and_then(|e| e.message)
                    .or(envelope.message)
                    .or(envelope.code)
            })
            .unwrap_or(body);
        ProviderError::api(operation, path, status, message)
    }

    /// GET a resource; 404 is absence, not an error.
    pub async fn get<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        api_version: &str,
    ) -> Result<Option<T>, ProviderError> {
        debug!(operation, path, "GET");
        let response = self.send(reqwest::Method::GET, path, api_version, None).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(operation, path, response).await);
        }
        Ok(Some(response.json().await?))
    }

    /// PUT a resource and wait for its provisioning to finish, then GET
    /// the final state so server-computed fields are populated.
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T, ProviderError> {
        debug!(operation, path, "PUT");
        let body = serde_json::to_value(body)?;
        let response = self
            .send(reqwest::Method::PUT, path, api_version, Some(&body))
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from_response(operation, path, response).await);
        }
        // 200/201 carry the resource body; 202 means accepted with the
        // result only available by polling.
        let initial: Value = if status == reqwest::StatusCode::ACCEPTED {
            Value::Null
        } else {
            response.json().await.unwrap_or(Value::Null)
        };
        let body = self
            .wait_for_provisioning(operation, path, api_version, initial)
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    /// POST an action (e.g. listKeys) and return its body.
    pub async fn post<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        api_version: &str,
    ) -> Result<T, ProviderError> {
        debug!(operation, path, "POST");
        let response = self
            .send(reqwest::Method::POST, path, api_version, None)
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(operation, path, response).await);
        }
        Ok(response.json().await?)
    }

    /// DELETE a resource and wait until it is gone. 404 at any point is
    /// success: deletion is idempotent.
    pub async fn delete(
        &self,
        operation: &str,
        path: &str,
        api_version: &str,
    ) -> Result<(), ProviderError> {
        debug!(operation, path, "DELETE");
        let response = self
            .send(reqwest::Method::DELETE, path, api_version, None)
            .await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(operation, path, "already gone");
            return Ok(());
        }
        if !status.is_success() {
            return Err(Self::error_from_response(operation, path, response).await);
        }
        if status == reqwest::StatusCode::ACCEPTED {
            self.wait_for_deletion(operation, path, api_version).await?;
        }
        Ok(())
    }

    /// Poll the resource until `properties.provisioningState` reaches
    /// `Succeeded`. A body without a provisioning state is treated as
    /// already done.
    async fn wait_for_provisioning(
        &self,
        operation: &str,
        path: &str,
        api_version: &str,
        initial: Value,
    ) -> Result<Value, ProviderError> {
        let mut current = initial;
        let mut cancel = self.cancel.clone();

        for _ in 0..self.options.poll_attempts {
            // A null body means 202 Accepted with nothing to inspect yet;
            // fall through to the poll.
            if !current.is_null() {
                match provisioning_state(&current) {
                    None | Some("Succeeded") => return Ok(current),
                    Some(state @ ("Failed" | "Canceled")) => {
                        return Err(ProviderError::OperationFailed {
                            operation: operation.to_string(),
                            resource: path.to_string(),
                            state: state.to_string(),
                        });
                    },
                    Some(state) => {
                        debug!(operation, path, state, "waiting for provisioning");
                    },
                }
            }

            self.poll_delay(operation, path, &mut cancel).await?;

            current = self
                .get::<Value>(operation, path, api_version)
                .await?
                .unwrap_or(Value::Null);
        }

        Err(ProviderError::OperationTimeout {
            operation: operation.to_string(),
            resource: path.to_string(),
        })
    }

    async fn wait_for_deletion(
        &self,
        operation: &str,
        path: &str,
        api_version: &str,
    ) -> Result<(), ProviderError> {
        let mut cancel = self.cancel.clone();

        for _ in 0..self.options.poll_attempts {
            match self.get::<Value>(operation, path, api_version).await? {
                None => return Ok(()),
                Some(body) => {
                    if let Some("Failed") = provisioning_state(&body) {
                        return Err(ProviderError::OperationFailed {
                            operation: operation.to_string(),
                            resource: path.to_string(),
                            state: "Failed".to_string(),
                        });
                    }
                    debug!(operation, path, "still deleting");
                },
            }
            self.poll_delay(operation, path, &mut cancel).await?;
        }

        Err(ProviderError::OperationTimeout {
            operation: operation.to_string(),
            resource: path.to_string(),
        })
    }

    /// Sleep one poll interval, aborting early when the host asks the
    /// provider to stop.
    async fn poll_delay(
        &self,
        operation: &str,
        path: &str,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), ProviderError> {
        if *cancel.borrow() {
            warn!(operation, path, "polling cancelled by host stop");
            return Err(ProviderError::Cancelled(format!(
                "{} on {} interrupted by stop",
                operation, path
            )));
        }
        tokio::select! {
            _ = tokio::time::sleep(self.options.poll_interval) => Ok(()),
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    warn!(operation, path, "polling cancelled by host stop");
                    Err(ProviderError::Cancelled(format!(
                        "{} on {} interrupted by stop",
                        operation, path
                    )))
                } else {
                    Ok(())
                }
            },
        }
    }

    /// The subscription this connection operates in.
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }
}

fn provisioning_state(body: &Value) -> Option<&str> {
    body.get("properties")
        .and_then(|p| p.get("provisioningState"))
        .and_then(Value::as_str)
}

/// One authenticated client per Azure service family, built once per
/// provider configuration and held for the plugin process lifetime.
#[derive(Debug, Clone)]
pub struct ArmClient {
    conn: Arc<ArmConnection>,
    tenant_id: String,
    client_id: String,
}

impl ArmClient {
    /// Authenticate and build the per-service clients.
    ///
    /// The token is fetched eagerly so a bad secret fails Configure
    /// immediately instead of on the first resource operation.
    pub async fn connect(
        credentials: Credentials,
        environment: AzureEnvironment,
        options: ClientOptions,
        cancel: watch::Receiver<bool>,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(ProviderError::Http)?;
        let tokens = TokenProvider::new(http.clone(), &credentials, &environment);
        tokens.bearer_token().await?;

        let conn = ArmConnection {
            http,
            tokens,
            environment,
            subscription_id: credentials.subscription_id.clone(),
            options,
            cancel,
        };

        Ok(Self {
            conn: Arc::new(conn),
            tenant_id: credentials.tenant_id,
            client_id: credentials.client_id,
        })
    }

    /// Resource group operations (Microsoft.Resources).
    pub fn resource_groups(&self) -> ResourceGroupsClient {
        ResourceGroupsClient::new(self.conn.clone())
    }

    /// Networking operations (Microsoft.Network).
    pub fn network(&self) -> NetworkClient {
        NetworkClient::new(self.conn.clone())
    }

    /// DNS operations (Microsoft.Network/dnsZones).
    pub fn dns(&self) -> DnsClient {
        DnsClient::new(self.conn.clone())
    }

    /// Storage operations (Microsoft.Storage).
    pub fn storage(&self) -> StorageClient {
        StorageClient::new(self.conn.clone())
    }

    /// Container registry operations (Microsoft.ContainerRegistry).
    pub fn container_registry(&self) -> RegistryClient {
        RegistryClient::new(self.conn.clone())
    }

    /// Compute operations (Microsoft.Compute).
    pub fn compute(&self) -> ComputeClient {
        ComputeClient::new(self.conn.clone())
    }

    /// The configured subscription id.
    pub fn subscription_id(&self) -> &str {
        self.conn.subscription_id()
    }

    /// The configured tenant id.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// The configured client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}
