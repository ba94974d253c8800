//! Test harness for exercising a [`ProviderService`] without a gRPC
//! server.
//!
//! The tester is an explicit object created per test; there is no shared
//! provider or cached credential state between tests. Pair it with an
//! [`AzureProvider`](crate::provider::AzureProvider) built via
//! [`with_options`](crate::provider::AzureProvider::with_options) and a
//! mock ARM endpoint for full lifecycle tests.

use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// Drives a provider through the same entry points the host uses.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Configure the provider, failing the test path on any error
    /// diagnostic.
    pub async fn configure(&self, config: Value) -> Result<(), ProviderError> {
        let diagnostics = self.provider.configure(config).await?;
        let errors: Vec<&Diagnostic> = diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Configuration(
                errors
                    .iter()
                    .map(|d| d.summary.clone())
                    .collect::<Vec<_>>()
                    .join("; "),
            ))
        }
    }

    /// Validate a resource configuration.
    pub async fn validate(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.provider
            .validate_resource_config(resource_type, config)
            .await
    }

    /// Plan a change.
    pub async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, prior_state, proposed_state, Value::Null)
            .await
    }

    /// Create a resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read a resource; null means it is gone.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update a resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import a resource by id.
    pub async fn import(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Upgrade persisted state from an older schema version.
    pub async fn upgrade_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .upgrade_resource_state(resource_type, version, state)
            .await
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::AzureProvider;
    use serde_json::json;

    #[tokio::test]
    async fn test_schema_and_validate_need_no_configure() {
        let tester = ProviderTester::new(AzureProvider::new());
        assert!(!tester.schema().resources.is_empty());

        let diagnostics = tester
            .validate("azure_resource_group", json!({"location": "westus"}))
            .await
            .unwrap();
        // Missing name.
        assert_eq!(diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_plan_without_configure() {
        let tester = ProviderTester::new(AzureProvider::new());
        let result = tester
            .plan(
                "azure_resource_group",
                None,
                json!({"name": "rg", "location": "West US"}),
            )
            .await
            .unwrap();
        assert!(!result.requires_replace);
        assert_eq!(result.planned_state["location"], "westus");
    }
}
