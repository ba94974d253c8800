//! Error types for the Azure provider.
//!
//! The taxonomy follows the provider contract: configuration and
//! authentication failures abort Configure, validation problems are
//! reported as diagnostics before any API call, API failures carry the
//! operation and resource they belong to, and "not found" is its own
//! variant because Read and Delete treat it as a signal, not a failure.

use thiserror::Error;

/// Errors that can occur while serving the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The resource does not exist on the Azure side.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A configuration value failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider configuration is incomplete or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Authenticating against Azure Active Directory failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The requested resource type is not registered with this provider.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// An Azure Resource Manager call failed.
    #[error("{operation} failed for {resource}: {message} (status {status})")]
    Api {
        /// The logical operation, e.g. `virtualNetworks.CreateOrUpdate`.
        operation: String,
        /// The resource path or id the call targeted.
        resource: String,
        /// HTTP status returned by ARM.
        status: u16,
        /// The `error.message` body field, or the raw body when unparseable.
        message: String,
    },

    /// A long-running operation ended in a failed provisioning state.
    #[error("Operation {operation} on {resource} ended in state {state}")]
    OperationFailed {
        operation: String,
        resource: String,
        state: String,
    },

    /// A long-running operation did not finish within the polling budget.
    #[error("Timed out waiting for {operation} on {resource}")]
    OperationTimeout { operation: String, resource: String },

    /// The host asked the provider to stop while an operation was polling.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP transport to Azure failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

impl ProviderError {
    /// Build an API error for the given operation and resource path.
    pub fn api(
        operation: impl Into<String>,
        resource: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Api {
            operation: operation.into(),
            resource: resource.into(),
            status,
            message: message.into(),
        }
    }

    /// Whether this error means the target resource is absent.
    ///
    /// Read uses this to clear state instead of failing, and Delete uses
    /// it to treat a second deletion as success.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::Api { status: 404, .. })
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Auth(msg) => tonic::Status::unauthenticated(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            err @ ProviderError::Api { .. } => tonic::Status::internal(err.to_string()),
            err @ ProviderError::OperationFailed { .. } => tonic::Status::internal(err.to_string()),
            err @ ProviderError::OperationTimeout { .. } => {
                tonic::Status::deadline_exceeded(err.to_string())
            },
            ProviderError::Cancelled(msg) => tonic::Status::cancelled(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Http(err) => tonic::Status::unavailable(format!("HTTP error: {}", err)),
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("vnet-1".to_string());
        assert_eq!(format!("{}", err), "Resource not found: vnet-1");

        let err = ProviderError::api(
            "virtualNetworks.CreateOrUpdate",
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v",
            409,
            "AnotherOperationInProgress",
        );
        let display = format!("{}", err);
        assert!(display.contains("virtualNetworks.CreateOrUpdate"));
        assert!(display.contains("status 409"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(ProviderError::NotFound("x".to_string()).is_not_found());
        assert!(ProviderError::api("op", "res", 404, "gone").is_not_found());
        assert!(!ProviderError::api("op", "res", 500, "boom").is_not_found());
        assert!(!ProviderError::Validation("x".to_string()).is_not_found());
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::NotFound("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::Validation("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status = ProviderError::Auth("bad secret".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Unauthenticated);

        let status: tonic::Status = ProviderError::Cancelled("stopping".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Cancelled);

        let status: tonic::Status = ProviderError::OperationTimeout {
            operation: "op".to_string(),
            resource: "res".to_string(),
        }
        .into();
        assert_eq!(status.code(), tonic::Code::DeadlineExceeded);
    }
}
