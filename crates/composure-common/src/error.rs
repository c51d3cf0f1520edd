//! Unified error types for the Composure workspace.
//!
//! Every operation on a project returns this error so that callers can
//! surface it directly: each variant carries the service name, file path,
//! or reference string that triggered it.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A requested entity does not exist.
    #[error("no such {kind}: {id}")]
    NotFound {
        /// Type of the missing entity.
        kind: &'static str,
        /// Identifier of the missing entity.
        id: String,
    },

    /// The service exists but has been disabled by profiles or selection.
    #[error("service {name} is disabled")]
    ServiceDisabled {
        /// Name of the disabled service.
        name: String,
    },

    /// A required `depends_on` edge points to a service that does not exist.
    #[error("service {dependent} depends on undefined service {service}")]
    MissingDependency {
        /// Name of the missing dependency.
        service: String,
        /// Service that declared the dependency.
        dependent: String,
    },

    /// A required environment file does not exist.
    #[error("env file {path} not found")]
    MissingEnvFile {
        /// Path of the missing file.
        path: PathBuf,
    },

    /// An environment file could not be parsed.
    #[error("failed to read {path}: line {line}: {message}")]
    EnvFile {
        /// Path of the malformed file.
        path: PathBuf,
        /// 1-based line number of the offending entry.
        line: usize,
        /// Description of the syntax error.
        message: String,
    },

    /// An image reference or digest string is malformed.
    #[error("invalid reference format {reference:?}: {message}")]
    InvalidReference {
        /// The offending reference string.
        reference: String,
        /// Description of the problem.
        message: String,
    },

    /// The digest resolver failed for an image.
    #[error("failed to resolve digest for {reference}: {source}")]
    DigestResolution {
        /// Image reference being resolved.
        reference: String,
        /// Error reported by the resolver.
        source: Box<ComposeError>,
    },

    /// A volume definition is structurally invalid.
    #[error("invalid volume: {message}")]
    InvalidVolume {
        /// Description of the invalid volume.
        message: String,
    },

    /// An extension field collides with a reserved top-level key.
    #[error("extension key {key:?} collides with a reserved project key")]
    ExtensionConflict {
        /// The colliding key.
        key: String,
    },

    /// The enabled services form a dependency cycle.
    #[error("dependency cycle detected between services: {}", services.join(", "))]
    DependencyCycle {
        /// Services taking part in the cycle.
        services: Vec<String>,
    },

    /// A concurrent worker did not complete.
    #[error("background task failed: {message}")]
    Task {
        /// Description of the failure.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML serialization or deserialization failed.
    #[error("yaml error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl ComposeError {
    /// Builds a `NotFound` error for a service name.
    #[must_use]
    pub fn no_such_service(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "service",
            id: name.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ComposeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_service() {
        let err = ComposeError::no_such_service("web");
        assert_eq!(err.to_string(), "no such service: web");
    }

    #[test]
    fn disabled_message_is_distinct_from_not_found() {
        let err = ComposeError::ServiceDisabled { name: "web".into() };
        assert_eq!(err.to_string(), "service web is disabled");
    }

    #[test]
    fn cycle_message_lists_services() {
        let err = ComposeError::DependencyCycle {
            services: vec!["a".into(), "b".into()],
        };
        assert!(err.to_string().ends_with("a, b"));
    }

    #[test]
    fn digest_resolution_wraps_source() {
        let err = ComposeError::DigestResolution {
            reference: "docker.io/library/nginx:latest".into(),
            source: Box::new(ComposeError::Config {
                message: "registry unreachable".into(),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("nginx"), "got: {msg}");
        assert!(msg.contains("registry unreachable"), "got: {msg}");
    }
}
