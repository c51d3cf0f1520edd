//! The project aggregate and its read-only queries.
//!
//! A [`Project`] is immutable from the outside: every transformation in
//! this crate clones the whole aggregate, changes the clone, and returns
//! it, leaving the receiver as it was.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use composure_common::constants::home_dir;
use composure_common::error::{ComposeError, Result};
use serde::{Deserialize, Serialize};

use crate::types::{
    Configs, Extensions, Mapping, Networks, Secrets, ServiceConfig, Services, Volumes,
};

/// Configuration of one `include` entry that triggered loading other files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeConfig {
    /// Included project files.
    pub path: Vec<String>,
    /// Directory relative paths of the included files resolve against.
    pub project_directory: String,
    /// Env files used while loading the included files.
    pub env_file: Vec<String>,
}

/// The resolved model of all services and shared resources of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Project name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Base directory for relative paths.
    #[serde(skip)]
    pub working_dir: PathBuf,
    /// Enabled services.
    pub services: Services,
    /// Networks.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: Networks,
    /// Named volumes.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: Volumes,
    /// Secrets.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: Secrets,
    /// Configs.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub configs: Configs,
    /// Vendor extension fields, spliced into the top level when serialized.
    #[serde(flatten)]
    pub extensions: Extensions,
    /// Files loaded through `include`, keyed by the including file.
    #[serde(skip)]
    pub include_references: BTreeMap<String, Vec<IncludeConfig>>,
    /// Files this project was loaded from.
    #[serde(skip)]
    pub compose_files: Vec<String>,
    /// Resolved project-level environment.
    #[serde(skip)]
    pub environment: Mapping,
    /// Services excluded by profiles or selection.
    #[serde(skip)]
    pub disabled_services: Services,
    /// Active profiles.
    #[serde(skip)]
    pub profiles: Vec<String>,
}

impl Project {
    /// Creates an empty project.
    #[must_use]
    pub fn new(name: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            working_dir: working_dir.into(),
            ..Self::default()
        }
    }

    /// Adds an enabled service, keyed by its name.
    #[must_use]
    pub fn with_service(mut self, service: ServiceConfig) -> Self {
        let _ = self.services.insert(service.name.clone(), service);
        self
    }

    /// Returns sorted names of enabled services.
    #[must_use]
    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    /// Returns sorted names of disabled services.
    #[must_use]
    pub fn disabled_service_names(&self) -> Vec<String> {
        self.disabled_services.keys().cloned().collect()
    }

    /// Returns sorted network names.
    #[must_use]
    pub fn network_names(&self) -> Vec<String> {
        self.networks.keys().cloned().collect()
    }

    /// Returns sorted volume names.
    #[must_use]
    pub fn volume_names(&self) -> Vec<String> {
        self.volumes.keys().cloned().collect()
    }

    /// Returns sorted secret names.
    #[must_use]
    pub fn secret_names(&self) -> Vec<String> {
        self.secrets.keys().cloned().collect()
    }

    /// Returns sorted config names.
    #[must_use]
    pub fn config_names(&self) -> Vec<String> {
        self.configs.keys().cloned().collect()
    }

    /// Returns an enabled service by name.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::ServiceDisabled` if the service exists but is
    /// disabled, and `ComposeError::NotFound` if it does not exist at all.
    pub fn get_service(&self, name: &str) -> Result<&ServiceConfig> {
        if let Some(service) = self.services.get(name) {
            return Ok(service);
        }
        if self.disabled_services.contains_key(name) {
            return Err(ComposeError::ServiceDisabled {
                name: name.to_owned(),
            });
        }
        Err(ComposeError::no_such_service(name))
    }

    /// Returns a disabled service by name.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::NotFound` if no disabled service has this name.
    pub fn get_disabled_service(&self, name: &str) -> Result<&ServiceConfig> {
        self.disabled_services
            .get(name)
            .ok_or_else(|| ComposeError::no_such_service(name))
    }

    /// Returns the named enabled services, or all of them when `names` is empty.
    ///
    /// # Errors
    ///
    /// Fails on the first name [`Project::get_service`] rejects.
    pub fn get_services<S: AsRef<str>>(&self, names: &[S]) -> Result<Services> {
        if names.is_empty() {
            return Ok(self.services.clone());
        }
        let mut services = Services::new();
        for name in names {
            let name = name.as_ref();
            let service = self.get_service(name)?;
            let _ = services.insert(name.to_owned(), service.clone());
        }
        Ok(services)
    }

    /// Returns enabled and disabled services together.
    #[must_use]
    pub fn all_services(&self) -> Services {
        let mut all = self.services.clone();
        all.extend(
            self.disabled_services
                .iter()
                .map(|(name, service)| (name.clone(), service.clone())),
        );
        all
    }

    /// Resolves a path against the working directory.
    ///
    /// A leading `~` is replaced by the user's home directory; absolute
    /// paths are returned unchanged.
    #[must_use]
    pub fn relative_path(&self, path: &str) -> PathBuf {
        let expanded = match path.strip_prefix('~') {
            Some(rest) => {
                let rest = rest.trim_start_matches(['/', '\\']);
                let home = home_dir().unwrap_or_default();
                if rest.is_empty() { home } else { home.join(rest) }
            }
            None => PathBuf::from(path),
        };
        if expanded.is_absolute() {
            return expanded;
        }
        join_clean(&self.working_dir, &expanded)
    }
}

/// Joins `base` and `path` lexically.
///
/// `.` components are dropped. `..` removes the previous name, is dropped
/// at the root, and is kept when there is no name left to remove.
fn join_clean(base: &Path, path: &Path) -> PathBuf {
    let mut joined = PathBuf::new();
    for component in base.components().chain(path.components()) {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match joined.components().next_back() {
                Some(Component::Normal(_)) => {
                    let _ = joined.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                Some(Component::ParentDir | Component::CurDir) | None => joined.push(".."),
            },
            other => joined.push(other),
        }
    }
    if joined.as_os_str().is_empty() {
        joined.push(".");
    }
    joined
}
