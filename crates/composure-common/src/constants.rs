//! Workspace-wide constants and default names.

use std::path::PathBuf;

/// Profile token that enables every service regardless of its profiles.
pub const ALL_PROFILES: &str = "*";

/// Default project file names, tried in order.
pub const DEFAULT_PROJECT_FILES: &[&str] = &[
    "compose.yaml",
    "compose.yml",
    "docker-compose.yml",
    "docker-compose.yaml",
];

/// Environment variable overriding the project name.
pub const ENV_PROJECT_NAME: &str = "COMPOSE_PROJECT_NAME";

/// Environment variable listing active profiles (comma separated).
pub const ENV_PROFILES: &str = "COMPOSE_PROFILES";

/// Environment variable listing project files.
pub const ENV_PROJECT_FILE: &str = "COMPOSE_FILE";

/// Default registry domain for familiar image names.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Repository namespace for official images on the default registry.
pub const OFFICIAL_REPOSITORY_PREFIX: &str = "library/";

/// Tag applied to image references that carry neither tag nor digest.
pub const DEFAULT_TAG: &str = "latest";

/// Top-level keys owned by the project model itself.
pub const RESERVED_PROJECT_KEYS: &[&str] =
    &["name", "services", "networks", "volumes", "secrets", "configs"];

/// Returns the current user's home directory, if one is configured.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}
