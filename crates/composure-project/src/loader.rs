//! Decoding an already-normalised project document into the typed model.
//!
//! Documents handed to this module must be fully interpolated and merged;
//! only the typed decode, service naming, and the project-level
//! environment are handled here.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use composure_common::config::ProjectSettings;
use composure_common::constants::DEFAULT_PROJECT_FILES;
use composure_common::error::{ComposeError, Result};

use crate::dotenv;
use crate::project::Project;
use crate::types::Mapping;

/// Name of the env file read into the project environment.
pub const PROJECT_ENV_FILE: &str = ".env";

impl Project {
    /// Decodes a YAML project document.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::Yaml` if the document does not match the model.
    pub fn from_yaml(bytes: &[u8], working_dir: impl Into<PathBuf>) -> Result<Self> {
        let project: Self = serde_yaml::from_slice(bytes)?;
        Ok(project.named(working_dir.into()))
    }

    /// Decodes a JSON project document.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::Serialization` if the document does not match
    /// the model.
    pub fn from_json(bytes: &[u8], working_dir: impl Into<PathBuf>) -> Result<Self> {
        let project: Self = serde_json::from_slice(bytes)?;
        Ok(project.named(working_dir.into()))
    }

    /// Loads the project described by `settings`.
    ///
    /// The project file is the first of `settings.files`, or the first
    /// default file name found in the working directory. The project's
    /// working directory is the absolute directory holding that file.
    /// `environment` (usually the process environment) is laid over the
    /// variables of a `.env` file next to the project file to form the
    /// project environment. Profiles are then applied, followed by
    /// environment resolution and resource pruning when the settings ask
    /// for them.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::NotFound` when no project file exists,
    /// `ComposeError::Config` when several files are given, and any error
    /// from reading, decoding, or the requested transformations.
    pub fn load(settings: &ProjectSettings, environment: Mapping) -> Result<Self> {
        let file = locate_project_file(settings)?;
        let file = std::path::absolute(&file).map_err(|source| ComposeError::Io {
            path: file.clone(),
            source,
        })?;
        let working_dir = file
            .parent()
            .map_or_else(|| settings.working_dir.clone(), Path::to_path_buf);
        tracing::info!(path = %file.display(), "loading project");

        let bytes = std::fs::read(&file).map_err(|source| ComposeError::Io {
            path: file.clone(),
            source,
        })?;
        let mut project = if file.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&bytes, &working_dir)?
        } else {
            Self::from_yaml(&bytes, &working_dir)?
        };

        if let Some(name) = settings.project_name.as_ref().filter(|n| !n.is_empty()) {
            project.name.clone_from(name);
        } else if project.name.is_empty() {
            let derived = ProjectSettings {
                working_dir: working_dir.clone(),
                ..ProjectSettings::default()
            };
            project.name = derived.effective_project_name().unwrap_or_default();
        }
        project.environment = project_environment(&working_dir, environment)?;
        project.compose_files = vec![file.display().to_string()];

        let mut project = project.with_profiles(&settings.profiles)?;
        if settings.resolve_environment {
            project = project.with_services_environment_resolved(false)?;
        }
        if settings.drop_unused_resources {
            project = project.without_unnecessary_resources();
        }
        tracing::info!(
            project = %project.name,
            services = project.services.len(),
            disabled = project.disabled_services.len(),
            "project loaded"
        );
        Ok(project)
    }

    fn named(mut self, working_dir: PathBuf) -> Self {
        self.working_dir = working_dir;
        for (name, service) in self
            .services
            .iter_mut()
            .chain(self.disabled_services.iter_mut())
        {
            service.name.clone_from(name);
        }
        self
    }
}

fn locate_project_file(settings: &ProjectSettings) -> Result<PathBuf> {
    match settings.files.as_slice() {
        [] => DEFAULT_PROJECT_FILES
            .iter()
            .map(|name| settings.working_dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| ComposeError::NotFound {
                kind: "project file",
                id: settings.working_dir.display().to_string(),
            }),
        [file] => Ok(settings.working_dir.join(file)),
        _ => Err(ComposeError::Config {
            message: "merging several project files is not supported; pass a single file".into(),
        }),
    }
}

fn project_environment(working_dir: &Path, environment: Mapping) -> Result<Mapping> {
    let path = working_dir.join(PROJECT_ENV_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(environment),
        Err(source) => return Err(ComposeError::Io { path, source }),
    };
    tracing::debug!(path = %path.display(), "reading project env file");

    let vars = dotenv::parse_with_lookup(&content, |key| {
        environment.resolve(key).map(ToOwned::to_owned)
    })
    .map_err(|e| ComposeError::EnvFile {
        path: path.clone(),
        line: e.line,
        message: e.message,
    })?;

    let mut merged: Mapping = vars.into_iter().collect();
    for (key, value) in environment.iter() {
        let _ = merged.insert(key.clone(), value.clone());
    }
    Ok(merged)
}
