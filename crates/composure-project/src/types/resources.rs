//! Top-level resource definitions shared between services.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Extensions;

/// Networks keyed by project-local name.
pub type Networks = BTreeMap<String, NetworkConfig>;
/// Volumes keyed by project-local name.
pub type Volumes = BTreeMap<String, VolumeConfig>;
/// Secrets keyed by project-local name.
pub type Secrets = BTreeMap<String, SecretConfig>;
/// Configs keyed by project-local name.
pub type Configs = BTreeMap<String, ConfigObjConfig>;

/// A network definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Engine-level name, when different from the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Network driver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// Driver options.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub driver_opts: BTreeMap<String, String>,
    /// Managed outside the project.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub external: bool,
    /// Isolated from external connectivity.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub internal: bool,
    /// Labels.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Vendor extension fields.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A named volume definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Engine-level name, when different from the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Volume driver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// Driver options.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub driver_opts: BTreeMap<String, String>,
    /// Managed outside the project.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub external: bool,
    /// Labels.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Vendor extension fields.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A secret or config definition: content sourced from a file, an
/// environment variable, inline text, or an external store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileObjectConfig {
    /// Engine-level name, when different from the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source file path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Source environment variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Inline content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Managed outside the project.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub external: bool,
    /// Labels.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Vendor extension fields.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A secret definition.
pub type SecretConfig = FileObjectConfig;
/// A config definition.
pub type ConfigObjConfig = FileObjectConfig;
