//! `composure config`: render the resolved project.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};
use composure_common::types::Digest;
use composure_project::{DependencyPolicy, PinnedDigests};

use super::ProjectArgs;

/// Output format of the rendered project.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Structured YAML document.
    #[default]
    Yaml,
    /// Key-ordered JSON map.
    Json,
}

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Services to keep; every enabled service when empty.
    pub services: Vec<String>,

    /// Keep only the named services, not their dependencies.
    #[arg(long)]
    pub no_deps: bool,

    /// Merge env files into each service's environment.
    #[arg(long)]
    pub resolve_env: bool,

    /// Drop networks, volumes, secrets, and configs no service uses.
    #[arg(long)]
    pub no_unused: bool,

    /// JSON file mapping image references to digests to pin images with.
    #[arg(long, value_name = "FILE")]
    pub image_digests: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    pub format: Format,
}

/// Executes the `config` command.
///
/// Loads the project, enables and selects the requested services, then
/// applies pruning and digest pinning before rendering.
///
/// # Errors
///
/// Returns an error if loading, any transformation, or rendering fails.
pub fn execute(project_args: &ProjectArgs, args: ConfigArgs) -> anyhow::Result<()> {
    let mut settings = project_args.settings();
    settings.resolve_environment = args.resolve_env;
    let mut project = super::load_project(&settings)?;

    if !args.services.is_empty() {
        if args
            .services
            .iter()
            .any(|name| project.disabled_services.contains_key(name))
        {
            project = project.with_services_enabled(&args.services)?;
        }
        let policy = if args.no_deps {
            DependencyPolicy::IgnoreDependencies
        } else {
            DependencyPolicy::IncludeDependencies
        };
        project = project.with_selected_services(&args.services, policy)?;
    }
    if args.no_unused {
        project = project.without_unnecessary_resources();
    }
    if let Some(path) = &args.image_digests {
        let pins = read_pins(path)?;
        tracing::info!(path = %path.display(), pins = pins.len(), "pinning image digests");
        let runtime = tokio::runtime::Runtime::new()?;
        project = runtime.block_on(project.with_images_resolved(pins))?;
    }

    let rendered = match args.format {
        Format::Yaml => project.to_yaml()?,
        Format::Json => project.to_json()?,
    };
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&rendered)?;
    if !rendered.ends_with(b"\n") {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

/// Reads an `{"image": "sha256:..."}` JSON file.
fn read_pins(path: &Path) -> anyhow::Result<PinnedDigests> {
    let content = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let entries: BTreeMap<String, Digest> = serde_json::from_slice(&content)
        .with_context(|| format!("invalid digest file {}", path.display()))?;
    Ok(PinnedDigests::new(entries)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn read_pins_accepts_image_to_digest_map() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("digests.json");
        std::fs::write(&path, format!(r#"{{"nginx:1.25": "{DIGEST}", "redis": "{DIGEST}"}}"#))
            .expect("write digests");
        let pins = read_pins(&path).expect("should read pins");
        assert_eq!(pins.len(), 2);
    }

    #[test]
    fn read_pins_rejects_bad_digest() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("digests.json");
        std::fs::write(&path, r#"{"nginx": "sha256:abc"}"#).expect("write digests");
        assert!(read_pins(&path).is_err());
    }

    #[test]
    fn read_pins_reports_missing_file() {
        let err = read_pins(Path::new("/nonexistent/digests.json")).expect_err("should fail");
        assert!(err.to_string().contains("digests.json"));
    }
}
