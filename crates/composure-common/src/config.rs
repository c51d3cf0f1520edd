//! Settings that drive how a project is loaded and transformed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Options describing which project to load and how to shape it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Explicit project name; derived from the working directory when unset.
    pub project_name: Option<String>,
    /// Base directory for relative paths.
    pub working_dir: PathBuf,
    /// Project files to load, in order.
    pub files: Vec<PathBuf>,
    /// Active profiles.
    pub profiles: Vec<String>,
    /// Resolve `env_file` entries into each service's environment.
    pub resolve_environment: bool,
    /// Drop networks, volumes, secrets, and configs no service uses.
    pub drop_unused_resources: bool,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            project_name: None,
            working_dir: PathBuf::from("."),
            files: Vec::new(),
            profiles: Vec::new(),
            resolve_environment: false,
            drop_unused_resources: false,
        }
    }
}

impl ProjectSettings {
    /// Parses a comma-separated profile list, ignoring blank entries.
    #[must_use]
    pub fn parse_profiles(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Returns the effective project name.
    ///
    /// Falls back to the lower-cased working directory name with every
    /// character outside `[a-z0-9_-]` removed.
    #[must_use]
    pub fn effective_project_name(&self) -> Option<String> {
        if let Some(name) = self.project_name.as_ref().filter(|n| !n.is_empty()) {
            return Some(name.clone());
        }
        let dir = std::path::absolute(&self.working_dir).ok()?;
        let base = dir.file_name()?.to_string_lossy().to_lowercase();
        let normalized: String = base
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-'))
            .collect();
        (!normalized.is_empty()).then_some(normalized)
    }
}
