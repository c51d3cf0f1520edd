//! Typed model of a resolved project's entities.

pub mod build;
pub mod mapping;
pub mod resources;
pub mod service;

use std::collections::BTreeMap;

pub use self::build::BuildConfig;
pub use self::mapping::{Mapping, MappingWithEquals};
pub use self::resources::{
    ConfigObjConfig, Configs, FileObjectConfig, NetworkConfig, Networks, SecretConfig, Secrets,
    VolumeConfig, Volumes,
};
pub use self::service::{
    DependencyCondition, EnvFile, FileReference, ServiceConfig, ServiceDependency,
    ServiceNetworkConfig, ServiceVolumeConfig, Services, VolumeType,
};

/// Vendor extension fields (conventionally `x-` prefixed), kept verbatim.
pub type Extensions = BTreeMap<String, serde_json::Value>;
