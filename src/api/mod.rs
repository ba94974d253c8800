//! Typed models and per-service-family clients for the ARM REST surface.
//!
//! Models mirror the wire shapes: optional fields everywhere the service
//! may omit a value, camelCase names, and nothing serialized when unset.
//! Each family client is a thin handle over the shared connection with one
//! method per operation the resources need.

pub mod compute;
pub mod containerregistry;
pub mod dns;
pub mod network;
pub mod resources;
pub mod storage;

use serde::{Deserialize, Serialize};

/// A reference to another ARM resource by id, e.g. a NIC's subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SubResource {
    /// Full ARM id of the referenced resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SubResource {
    /// Reference a resource by id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }
}

/// Tags as ARM carries them: a flat string-to-string JSON object.
pub type Tags = serde_json::Map<String, serde_json::Value>;
