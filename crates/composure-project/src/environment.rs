//! Resolution of each service's final environment.
//!
//! Values cascade from the project environment, through the service's env
//! files in order, to the service's own `environment` entries, with later
//! sources overriding earlier ones.

use std::io::ErrorKind;

use composure_common::error::{ComposeError, Result};

use crate::dotenv;
use crate::project::Project;
use crate::types::{Mapping, MappingWithEquals};

impl Project {
    /// Resolves every enabled service's environment.
    ///
    /// For each service:
    /// 1. unset `environment` entries are filled from the project
    ///    environment;
    /// 2. env files are read in order, each one's variables expanded against
    ///    the files read before it, then the project environment;
    /// 3. the service's own entries are laid over the env file values.
    ///
    /// Missing env files not marked required are skipped. When
    /// `discard_env_files` is set, the resolved services no longer list
    /// their env files.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::MissingEnvFile` for an absent required file,
    /// `ComposeError::Io` if a file cannot be read, and
    /// `ComposeError::EnvFile` if a file is malformed.
    pub fn with_services_environment_resolved(&self, discard_env_files: bool) -> Result<Self> {
        let mut project = self.clone();
        for (name, service) in &mut project.services {
            tracing::debug!(
                service = %name,
                env_files = service.env_files.len(),
                "resolving environment"
            );

            let declared = std::mem::take(&mut service.environment)
                .resolve_unset(|key| self.environment.resolve(key));

            let mut from_files = MappingWithEquals::new();
            for env_file in &service.env_files {
                let path = self.relative_path(&env_file.path);
                let content = match std::fs::read_to_string(&path) {
                    Ok(content) => content,
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        if env_file.required {
                            return Err(ComposeError::MissingEnvFile { path });
                        }
                        tracing::debug!(
                            path = %path.display(),
                            "skipping missing optional env file"
                        );
                        continue;
                    }
                    Err(source) => return Err(ComposeError::Io { path, source }),
                };

                let lookup = |key: &str| {
                    from_files
                        .value(key)
                        .or_else(|| self.environment.resolve(key))
                        .map(ToOwned::to_owned)
                };
                let vars = dotenv::parse_with_lookup(&content, lookup).map_err(|e| {
                    ComposeError::EnvFile {
                        path: path.clone(),
                        line: e.line,
                        message: e.message,
                    }
                })?;
                let vars = Mapping::from(vars).to_mapping_with_equals();
                from_files = from_files.override_by(&vars);
            }

            service.environment = from_files.override_by(&declared);
            if discard_env_files {
                service.env_files.clear();
            }
        }
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::types::{EnvFile, ServiceConfig};

    fn project_in(dir: &Path, service: ServiceConfig) -> Project {
        let mut project = Project::new("env", dir).with_service(service);
        let _ = project.environment.insert("FOO", "1");
        let _ = project.environment.insert("REGION", "eu");
        project
    }

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).expect("write env file");
    }

    #[test]
    fn env_file_overrides_project_baseline() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        write(dir.path(), "app.env", "FOO=2\n");
        let mut service = ServiceConfig::new("app");
        service.env_files.push(EnvFile::required("app.env"));

        let resolved = project_in(dir.path(), service)
            .with_services_environment_resolved(false)
            .expect("resolve");
        let env = &resolved.services["app"].environment;
        assert_eq!(env.value("FOO"), Some("2"));
        assert_eq!(env.len(), 1);
        assert_eq!(resolved.services["app"].env_files.len(), 1);
    }

    #[test]
    fn service_environment_overrides_env_file() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        write(dir.path(), "app.env", "FOO=2\n");
        let mut service = ServiceConfig::new("app");
        service.env_files.push(EnvFile::required("app.env"));
        service.environment.set("FOO", "3");

        let resolved = project_in(dir.path(), service)
            .with_services_environment_resolved(true)
            .expect("resolve");
        assert_eq!(resolved.services["app"].environment.value("FOO"), Some("3"));
        assert!(resolved.services["app"].env_files.is_empty());
    }

    #[test]
    fn later_files_override_earlier_and_see_their_values() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        write(dir.path(), "base.env", "HOST=db\nPORT=5432\n");
        write(dir.path(), "local.env", "PORT=6543\nURL=${HOST}:${PORT}/${REGION}\n");
        let mut service = ServiceConfig::new("app");
        service.env_files.push(EnvFile::required("base.env"));
        service.env_files.push(EnvFile::required("local.env"));

        let resolved = project_in(dir.path(), service)
            .with_services_environment_resolved(false)
            .expect("resolve");
        let env = &resolved.services["app"].environment;
        assert_eq!(env.value("PORT"), Some("6543"));
        assert_eq!(env.value("URL"), Some("db:6543/eu"));
    }

    #[test]
    fn unset_service_entries_come_from_project_environment() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let mut service = ServiceConfig::new("app");
        service.environment.unset("REGION");
        service.environment.unset("UNKNOWN");

        let resolved = project_in(dir.path(), service)
            .with_services_environment_resolved(false)
            .expect("resolve");
        let env = &resolved.services["app"].environment;
        assert_eq!(env.value("REGION"), Some("eu"));
        assert_eq!(env.get("UNKNOWN"), Some(None));
    }

    #[test]
    fn missing_optional_env_file_is_skipped() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let mut service = ServiceConfig::new("app");
        service.env_files.push(EnvFile::optional("absent.env"));

        let resolved = project_in(dir.path(), service)
            .with_services_environment_resolved(false)
            .expect("resolve");
        assert!(resolved.services["app"].environment.is_empty());
    }

    #[test]
    fn missing_required_env_file_fails() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let mut service = ServiceConfig::new("app");
        service.env_files.push(EnvFile::required("absent.env"));

        let err = project_in(dir.path(), service)
            .with_services_environment_resolved(false)
            .expect_err("should fail");
        assert!(
            matches!(&err, ComposeError::MissingEnvFile { path } if path.ends_with("absent.env")),
            "got: {err}"
        );
    }

    #[test]
    fn malformed_env_file_reports_path_and_line() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        write(dir.path(), "bad.env", "OK=1\n=broken\n");
        let mut service = ServiceConfig::new("app");
        service.env_files.push(EnvFile::required("bad.env"));

        let err = project_in(dir.path(), service)
            .with_services_environment_resolved(false)
            .expect_err("should fail");
        assert!(
            matches!(&err, ComposeError::EnvFile { line: 2, path, .. } if path.ends_with("bad.env")),
            "got: {err}"
        );
    }

    #[test]
    fn disabled_services_are_left_alone() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let mut project = project_in(dir.path(), ServiceConfig::new("app"));
        let mut idle = ServiceConfig::new("idle");
        idle.env_files.push(EnvFile::required("absent.env"));
        let _ = project.disabled_services.insert("idle".into(), idle);

        let resolved = project
            .with_services_environment_resolved(true)
            .expect("resolve");
        assert_eq!(resolved.disabled_services["idle"].env_files.len(), 1);
    }
}
