//! Hemmer provider for Azure Resource Manager.
//!
//! This crate implements the callee side of the Hemmer provider plugin
//! protocol for a representative set of Azure resources: resource groups,
//! virtual networks and subnets, public IPs, network interfaces, load
//! balancers, DNS zones and A records, storage accounts, container
//! registries, and availability sets.
//!
//! # Architecture
//!
//! - [`client`]: the shared ARM connection (authentication, request
//!   plumbing, long-running-operation polling) and one thin typed client
//!   per service family, built once per Configure.
//! - [`api`]: serde models mirroring the ARM wire shapes, `Option`-heavy
//!   because the service omits what was never set.
//! - [`resources`]: one module per resource type, each owning its schema,
//!   its expand/flatten adapters, and its lifecycle calls.
//! - [`data_sources`]: read-only lookups of existing infrastructure.
//! - [`provider`]: the [`AzureProvider`] dispatching protocol calls to
//!   the registries.
//! - [`server`]: the gRPC server and stdout handshake the host connects
//!   through.
//! - [`diff`] / [`validation`] / [`migrate`]: schema-driven planning,
//!   configuration validation, and versioned state upgrades.
//!
//! # Running
//!
//! The `hemmer-provider-azure` binary is spawned by Hemmer, not run by
//! hand. It prints `HEMMER_PROVIDER|1|<addr>` to stdout and serves gRPC
//! on that address until the host disconnects. Credentials come from the
//! provider block or the `ARM_SUBSCRIPTION_ID`, `ARM_CLIENT_ID`,
//! `ARM_CLIENT_SECRET`, `ARM_TENANT_ID`, and `ARM_ENVIRONMENT`
//! environment variables.

#![warn(clippy::all)]

pub mod api;
pub mod auth;
pub mod client;
pub mod data_sources;
pub mod diff;
pub mod error;
pub mod logging;
pub mod migrate;
pub mod provider;
pub mod resource_id;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;
pub mod validators;
pub mod values;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use auth::{AzureEnvironment, Credentials};
pub use client::{ArmClient, ClientOptions};
pub use error::ProviderError;
pub use provider::AzureProvider;
pub use resource_id::ResourceId;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use schema::ProviderSchema;
pub use server::{serve, serve_on, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};
