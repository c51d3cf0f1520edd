//! Build specification attached to a service.
//!
//! A `build` entry may be written as a bare context path or as a full
//! mapping. Both decode to the same [`BuildConfig`]; a mapping without a
//! `context` builds from the project directory (`.`).

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::service::FileReference;

/// Context used when a build mapping omits one.
pub const DEFAULT_BUILD_CONTEXT: &str = ".";

/// How to build a service image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfig {
    /// Build context path or URL.
    pub context: String,
    /// Dockerfile path relative to the context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
    /// Build arguments; unset values come from the environment at build time.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, Option<String>>,
    /// Multi-stage target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Secrets exposed to the build.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<FileReference>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            context: DEFAULT_BUILD_CONTEXT.to_owned(),
            dockerfile: None,
            args: BTreeMap::new(),
            target: None,
            secrets: Vec::new(),
        }
    }
}

impl BuildConfig {
    /// Creates a build from the given context.
    #[must_use]
    pub fn from_context(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            ..Self::default()
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct BuildFields {
    context: Option<String>,
    dockerfile: Option<String>,
    args: BTreeMap<String, Option<String>>,
    target: Option<String>,
    secrets: Vec<FileReference>,
}

struct BuildVisitor;

impl<'de> Visitor<'de> for BuildVisitor {
    type Value = BuildConfig;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a build context path or a build mapping")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(BuildConfig::from_context(value))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        let fields = BuildFields::deserialize(de::value::MapAccessDeserializer::new(map))?;
        Ok(BuildConfig {
            context: fields
                .context
                .unwrap_or_else(|| DEFAULT_BUILD_CONTEXT.to_owned()),
            dockerfile: fields.dockerfile,
            args: fields.args,
            target: fields.target,
            secrets: fields.secrets,
        })
    }
}

impl<'de> Deserialize<'de> for BuildConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(BuildVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_form_becomes_context() {
        let build: BuildConfig = serde_yaml::from_str("./backend").expect("deserialize");
        assert_eq!(build.context, "./backend");
        assert!(build.dockerfile.is_none());
    }

    #[test]
    fn mapping_without_context_defaults_to_dot() {
        let build: BuildConfig =
            serde_yaml::from_str("dockerfile: Dockerfile.dev").expect("deserialize");
        assert_eq!(build.context, ".");
        assert_eq!(build.dockerfile.as_deref(), Some("Dockerfile.dev"));
    }

    #[test]
    fn mapping_keeps_secrets() {
        let yaml = "context: app\nsecrets:\n  - source: npm_token\n";
        let build: BuildConfig = serde_yaml::from_str(yaml).expect("deserialize");
        assert_eq!(build.context, "app");
        assert_eq!(build.secrets, vec![FileReference::new("npm_token")]);
    }

    #[test]
    fn other_shapes_are_rejected() {
        let err = serde_yaml::from_str::<BuildConfig>("42").expect_err("should fail");
        assert!(
            err.to_string().contains("build context path"),
            "got: {err}"
        );
    }
}
