//! Service definitions and the references they hold into project resources.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::build::BuildConfig;
use super::mapping::MappingWithEquals;
use super::Extensions;

/// Enabled or disabled services, keyed by name.
pub type Services = BTreeMap<String, ServiceConfig>;

/// One named runtime unit of the project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name under which the service appears in its owning mapping.
    #[serde(skip)]
    pub name: String,
    /// Image reference, possibly unqualified, tagged, or digest-pinned.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
    /// Optional build specification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,
    /// Command override.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Dependencies keyed by the name of the service depended upon.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, ServiceDependency>,
    /// Environment, possibly with unset entries.
    #[serde(skip_serializing_if = "MappingWithEquals::is_empty")]
    pub environment: MappingWithEquals,
    /// Environment files, merged in order.
    #[serde(rename = "env_file", skip_serializing_if = "Vec::is_empty")]
    pub env_files: Vec<EnvFile>,
    /// Networks the service attaches to.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, Option<ServiceNetworkConfig>>,
    /// Mounts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<ServiceVolumeConfig>,
    /// Secrets granted to the service.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<FileReference>,
    /// Configs granted to the service.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub configs: Vec<FileReference>,
    /// Profiles; empty means always enabled.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,
    /// Vendor extension fields.
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl ServiceConfig {
    /// Creates a service with the given name and nothing else set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a required dependency that waits for the target to start.
    #[must_use]
    pub fn depends_on(mut self, service: impl Into<String>) -> Self {
        let _ = self
            .depends_on
            .insert(service.into(), ServiceDependency::default());
        self
    }

    /// Adds a dependency the project may lack without error.
    #[must_use]
    pub fn depends_on_optional(mut self, service: impl Into<String>) -> Self {
        let _ = self.depends_on.insert(
            service.into(),
            ServiceDependency {
                required: false,
                ..ServiceDependency::default()
            },
        );
        self
    }

    /// Replaces the service profiles.
    #[must_use]
    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the image reference.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }
}

/// Readiness condition a dependency must reach before the dependent starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyCondition {
    /// The dependency has been started.
    #[default]
    ServiceStarted,
    /// The dependency reports healthy.
    ServiceHealthy,
    /// The dependency ran to completion with exit code zero.
    ServiceCompletedSuccessfully,
}

impl fmt::Display for DependencyCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceStarted => write!(f, "service_started"),
            Self::ServiceHealthy => write!(f, "service_healthy"),
            Self::ServiceCompletedSuccessfully => write!(f, "service_completed_successfully"),
        }
    }
}

/// One `depends_on` edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDependency {
    /// Condition to wait for.
    pub condition: DependencyCondition,
    /// Restart the dependent when the dependency is restarted.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub restart: bool,
    /// When false, the dependency may be missing from the project.
    pub required: bool,
}

impl Default for ServiceDependency {
    fn default() -> Self {
        Self {
            condition: DependencyCondition::default(),
            restart: false,
            required: true,
        }
    }
}

/// An environment file reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvFile {
    /// Path to the file.
    pub path: String,
    /// Fail when the file does not exist.
    #[serde(default = "default_true")]
    pub required: bool,
}

impl EnvFile {
    /// Creates a required env file reference.
    #[must_use]
    pub fn required(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            required: true,
        }
    }

    /// Creates an env file reference that may be absent.
    #[must_use]
    pub fn optional(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            required: false,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Per-network attachment options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceNetworkConfig {
    /// Extra DNS aliases on this network.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Static IPv4 address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,
    /// Connection priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

/// Kind of mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeType {
    /// Named or anonymous volume.
    #[default]
    Volume,
    /// Host path bind mount.
    Bind,
    /// In-memory filesystem.
    Tmpfs,
    /// Windows named pipe.
    Npipe,
    /// Cluster volume.
    Cluster,
    /// Image contents mounted read-only.
    Image,
}

impl fmt::Display for VolumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volume => write!(f, "volume"),
            Self::Bind => write!(f, "bind"),
            Self::Tmpfs => write!(f, "tmpfs"),
            Self::Npipe => write!(f, "npipe"),
            Self::Cluster => write!(f, "cluster"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// One mount declared by a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceVolumeConfig {
    /// Mount kind.
    #[serde(rename = "type")]
    pub kind: VolumeType,
    /// Volume name or host path; empty for anonymous volumes.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    /// Path inside the container.
    pub target: String,
    /// Mount read-only.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

impl ServiceVolumeConfig {
    /// Creates a named-volume mount.
    #[must_use]
    pub fn volume(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: VolumeType::Volume,
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    /// Creates a bind mount.
    #[must_use]
    pub fn bind(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: VolumeType::Bind,
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    /// Returns true for a mount of a named project volume.
    #[must_use]
    pub fn is_named_volume(&self) -> bool {
        self.kind == VolumeType::Volume && !self.source.is_empty()
    }
}

/// A grant of a secret or config to a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReference {
    /// Name of the secret or config in the project.
    pub source: String,
    /// Path or name inside the container.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Owner user id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Owner group id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<String>,
    /// File permission bits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
}

impl FileReference {
    /// References a secret or config by source name.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }
}
