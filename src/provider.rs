//! The Azure provider: wires the resource and data source registries to
//! the plugin protocol.
//!
//! One [`AzureProvider`] is created per plugin process. Configure builds
//! the shared [`ArmClient`] exactly once; every later operation looks up
//! the handler for the requested type and dispatches to it with that
//! client. The host serializes calls per resource instance and drives any
//! cross-resource concurrency itself.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};

use crate::auth::{AzureEnvironment, Credentials};
use crate::client::{ArmClient, ClientOptions};
use crate::data_sources;
use crate::diff;
use crate::error::ProviderError;
use crate::resources::{self, DataSourceHandler, ResourceHandler};
use crate::schema::{Attribute, Diagnostic, DiagnosticSeverity, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

/// The provider served by the `hemmer-provider-azure` binary.
pub struct AzureProvider {
    resources: HashMap<&'static str, Arc<dyn ResourceHandler>>,
    data_sources: HashMap<&'static str, Arc<dyn DataSourceHandler>>,
    client: RwLock<Option<ArmClient>>,
    options: ClientOptions,
    cancel: watch::Sender<bool>,
}

impl AzureProvider {
    /// Build the provider with the full resource and data source
    /// registries and default client tuning.
    pub fn new() -> Self {
        Self::with_options(ClientOptions::default())
    }

    /// Build the provider with custom client tuning. Tests use this to
    /// drop the polling interval to milliseconds.
    pub fn with_options(options: ClientOptions) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            resources: resources::all()
                .into_iter()
                .map(|handler| (handler.type_name(), handler))
                .collect(),
            data_sources: data_sources::all()
                .into_iter()
                .map(|handler| (handler.type_name(), handler))
                .collect(),
            client: RwLock::new(None),
            options,
            cancel,
        }
    }

    /// The provider configuration block.
    ///
    /// Every credential attribute is optional here because each one falls
    /// back to its `ARM_*` environment variable; completeness is checked
    /// at Configure time where all missing fields can be named together.
    fn provider_config_schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("subscription_id", Attribute::optional_string())
            .with_attribute("client_id", Attribute::optional_string())
            .with_attribute("client_secret", Attribute::optional_string().sensitive())
            .with_attribute("tenant_id", Attribute::optional_string())
            .with_attribute(
                "environment",
                Attribute::optional_string().with_validator(environment_validator),
            )
    }

    async fn client(&self) -> Result<ArmClient, ProviderError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or_else(|| ProviderError::Configuration("provider is not configured".to_string()))
    }

    fn resource(&self, resource_type: &str) -> Result<&Arc<dyn ResourceHandler>, ProviderError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(
        &self,
        data_source_type: &str,
    ) -> Result<&Arc<dyn DataSourceHandler>, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

impl Default for AzureProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn environment_validator(path: &str, value: &Value) -> Vec<String> {
    let Some(name) = value.as_str() else {
        return vec![];
    };
    match AzureEnvironment::from_name(name) {
        Ok(_) => vec![],
        Err(err) => vec![format!("{}: {}", path, err)],
    }
}

fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error))
}

#[async_trait::async_trait]
impl ProviderService for AzureProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(self.provider_config_schema());
        for (name, handler) in &self.resources {
            schema = schema.with_resource(*name, handler.schema());
        }
        for (name, handler) in &self.data_sources {
            schema = schema.with_data_source(*name, handler.schema());
        }
        schema
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.provider_config_schema(), &config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = validate(&self.provider_config_schema(), &config);
        if has_errors(&diagnostics) {
            return Ok(diagnostics);
        }

        // Credential and authentication failures are fatal: the host may
        // retry the whole Configure step, this layer never does.
        let credentials = Credentials::from_config(&config)?;
        let environment = match crate::values::opt_str(&config, "environment") {
            Some(name) => AzureEnvironment::from_name(name)?,
            None => match std::env::var("ARM_ENVIRONMENT") {
                Ok(name) => AzureEnvironment::from_name(&name)?,
                Err(_) => AzureEnvironment::public(),
            },
        };

        info!(
            subscription_id = %credentials.subscription_id,
            environment = %environment.name,
            "configuring Azure provider"
        );
        let client = ArmClient::connect(
            credentials,
            environment,
            self.options.clone(),
            self.cancel.subscribe(),
        )
        .await?;

        *self.client.write().await = Some(client);
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        // Wakes any polling loop waiting on a long-running operation.
        self.cancel.send_replace(true);
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let handler = self.resource(resource_type)?;
        Ok(validate(&handler.schema(), &config))
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.resource(resource_type)?;
        let current = handler.schema().version as i64;
        if version != current {
            info!(resource_type, from = version, to = current, "upgrading resource state");
        }
        handler.upgrade_state(version, state)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let handler = self.resource(resource_type)?;
        Ok(diff::plan(
            &handler.schema(),
            prior_state.as_ref(),
            &proposed_state,
        ))
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.resource(resource_type)?;
        let diagnostics = validate(&handler.schema(), &planned_state);
        if has_errors(&diagnostics) {
            return Err(ProviderError::Validation(
                diagnostics
                    .into_iter()
                    .map(|d| d.summary)
                    .collect::<Vec<_>>()
                    .join("; "),
            ));
        }
        let client = self.client().await?;
        handler.create(&client, &planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.resource(resource_type)?;
        let client = self.client().await?;
        match handler.read(&client, &current_state).await? {
            Some(state) => Ok(state),
            // Deleted out of band: a null state tells the host to drop
            // the instance instead of erroring.
            None => {
                warn!(resource_type, "resource gone from Azure, clearing state");
                Ok(Value::Null)
            },
        }
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.resource(resource_type)?;
        let client = self.client().await?;
        handler.update(&client, &prior_state, &planned_state).await
    }

    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let handler = self.resource(resource_type)?;
        let client = self.client().await?;
        handler.delete(&client, &current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let handler = self.resource(resource_type)?;
        let client = self.client().await?;
        let state = handler.import(&client, id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let handler = self.data_source(data_source_type)?;
        Ok(validate(&handler.schema(), &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.data_source(data_source_type)?;
        let client = self.client().await?;
        handler.read(&client, &config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_schema_covers_all_registries() {
        let provider = AzureProvider::new();
        let schema = provider.schema();

        assert_eq!(schema.resources.len(), 11);
        assert!(schema.resources.contains_key("azure_virtual_network"));
        assert!(schema.resources.contains_key("azure_load_balancer"));
        assert_eq!(schema.data_sources.len(), 3);
        assert!(schema.data_sources.contains_key("azure_client_config"));
        assert!(schema
            .provider
            .block
            .attributes
            .get("client_secret")
            .unwrap()
            .flags
            .sensitive);
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let provider = AzureProvider::new();
        let err = provider
            .plan("azure_quantum_mainframe", None, json!({}), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_operations_require_configure() {
        let provider = AzureProvider::new();
        let err = provider
            .read("azure_resource_group", json!({"name": "rg"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_config_before_any_call() {
        // No client is configured, so reaching the API would fail with a
        // configuration error; validation must reject first.
        let provider = AzureProvider::new();
        let err = provider
            .create("azure_container_registry", json!({"name": "four"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_validate_provider_config() {
        let provider = AzureProvider::new();

        let diagnostics = provider
            .validate_provider_config(json!({"subscription_id": "sub"}))
            .await
            .unwrap();
        assert!(diagnostics.is_empty());

        let diagnostics = provider
            .validate_provider_config(json!({"environment": "sideways"}))
            .await
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_plan_marks_force_new() {
        let provider = AzureProvider::new();
        let prior = json!({
            "id": "/subscriptions/s/resourceGroups/rg",
            "name": "rg",
            "location": "westus"
        });
        let proposed = json!({"name": "rg", "location": "eastus"});

        let result = provider
            .plan("azure_resource_group", Some(prior), proposed, json!({}))
            .await
            .unwrap();
        assert!(result.requires_replace);
    }

    #[tokio::test]
    async fn test_upgrade_resource_state_dispatch() {
        let provider = AzureProvider::new();
        let upgraded = provider
            .upgrade_resource_state(
                "azure_storage_account",
                0,
                json!({"name": "prodlogs01", "account_type": "Standard_LRS"}),
            )
            .await
            .unwrap();
        assert_eq!(upgraded["account_tier"], "Standard");

        // Resources without history only accept their current version.
        let err = provider
            .upgrade_resource_state("azure_resource_group", 3, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_validate_resource_config_dispatch() {
        let provider = AzureProvider::new();
        let diagnostics = provider
            .validate_resource_config(
                "azure_storage_account",
                json!({
                    "name": "Bad Name",
                    "resource_group_name": "rg",
                    "location": "westus",
                    "account_tier": "Standard",
                    "account_replication_type": "LRS"
                }),
            )
            .await
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_stop_signals_cancellation() {
        let provider = AzureProvider::new();
        let mut cancel = provider.cancel.subscribe();
        assert!(!*cancel.borrow());
        provider.stop().await.unwrap();
        cancel.changed().await.unwrap();
        assert!(*cancel.borrow());
    }
}
