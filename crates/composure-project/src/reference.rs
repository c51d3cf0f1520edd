//! Container image references.
//!
//! Parses references such as `nginx`, `ghcr.io/org/app:1.2`, or
//! `registry:5000/team/tool@sha256:...` into their domain, repository path,
//! tag, and digest, normalising familiar names the way registries do
//! (`nginx` becomes `docker.io/library/nginx:latest`).

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use composure_common::constants::{DEFAULT_REGISTRY, DEFAULT_TAG, OFFICIAL_REPOSITORY_PREFIX};
use composure_common::error::{ComposeError, Result};
use composure_common::types::Digest;
use regex::Regex;

const NAME_TOTAL_LENGTH_MAX: usize = 255;
const LEGACY_REGISTRY: &str = "index.docker.io";

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern is valid")
}

static PATH_COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$"));

static DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^(?:(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])(?:\.(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]))*|\[[a-fA-F0-9:]+\])(?::[0-9]+)?$",
    )
});

static TAG: LazyLock<Regex> = LazyLock::new(|| compile(r"^[\w][\w.-]{0,127}$"));

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| compile(r"^[a-f0-9]{64}$"));

/// A parsed, normalised image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    domain: String,
    path: String,
    tag: Option<String>,
    digest: Option<Digest>,
}

impl ImageReference {
    /// Parses a reference, normalising familiar names.
    ///
    /// The result names an explicit registry domain; a reference carrying
    /// neither tag nor digest gets the `latest` tag. When both a tag and a
    /// digest are present, only the digest is kept.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::InvalidReference` if the string is not a
    /// valid reference.
    pub fn parse_docker_ref(reference: &str) -> Result<Self> {
        let mut parsed = Self::parse_normalized_named(reference)?;
        if parsed.digest.is_some() {
            parsed.tag = None;
        } else if parsed.tag.is_none() {
            parsed.tag = Some(DEFAULT_TAG.to_owned());
        }
        Ok(parsed)
    }

    /// Parses a reference, normalising the domain and repository path but
    /// leaving tag and digest as written.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::InvalidReference` if the string is not a
    /// valid reference.
    pub fn parse_normalized_named(reference: &str) -> Result<Self> {
        let invalid = |message: &str| ComposeError::InvalidReference {
            reference: reference.to_owned(),
            message: message.to_owned(),
        };

        if reference.is_empty() {
            return Err(invalid("repository name must have at least one component"));
        }
        if IDENTIFIER.is_match(reference) {
            return Err(invalid(
                "cannot specify 64-byte hexadecimal strings as a repository name",
            ));
        }

        let (named, digest) = match reference.split_once('@') {
            Some((named, digest)) => (named, Some(Digest::parse(digest)?)),
            None => (reference, None),
        };

        let last_slash = named.rfind('/').map_or(0, |i| i + 1);
        let (name, tag) = match named[last_slash..].rfind(':') {
            Some(colon) => {
                let split = last_slash + colon;
                (&named[..split], Some(&named[split + 1..]))
            }
            None => (named, None),
        };

        if let Some(tag) = tag {
            if !TAG.is_match(tag) {
                return Err(invalid("invalid tag format"));
            }
        }
        if name.len() > NAME_TOTAL_LENGTH_MAX {
            return Err(invalid("repository name must not be more than 255 characters"));
        }

        let (domain, path) = split_domain(name);
        if path.to_lowercase() != path {
            return Err(invalid("repository name must be lowercase"));
        }
        if !DOMAIN.is_match(&domain) {
            return Err(invalid("invalid registry domain"));
        }
        if path.is_empty() || !path.split('/').all(|component| PATH_COMPONENT.is_match(component)) {
            return Err(invalid("invalid repository path"));
        }

        Ok(Self {
            domain,
            path,
            tag: tag.map(ToOwned::to_owned),
            digest,
        })
    }

    /// Returns a copy pinned to `digest`, keeping any tag.
    #[must_use]
    pub fn with_digest(mut self, digest: Digest) -> Self {
        self.digest = Some(digest);
        self
    }

    /// Registry domain, e.g. `docker.io`.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Repository path within the registry, e.g. `library/nginx`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fully qualified repository name, `domain/path`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}/{}", self.domain, self.path)
    }

    /// Tag, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Digest, if any.
    #[must_use]
    pub const fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    /// Returns true when the reference is pinned to a digest.
    #[must_use]
    pub const fn is_canonical(&self) -> bool {
        self.digest.is_some()
    }
}

/// Splits a repository name into registry domain and path, applying the
/// default registry and official-image namespace.
fn split_domain(name: &str) -> (String, String) {
    let (mut domain, mut path) = match name.split_once('/') {
        Some((first, rest))
            if first.contains(['.', ':'])
                || first == "localhost"
                || first.to_lowercase() != first =>
        {
            (first.to_owned(), rest.to_owned())
        }
        _ => (DEFAULT_REGISTRY.to_owned(), name.to_owned()),
    };
    if domain == LEGACY_REGISTRY {
        domain = DEFAULT_REGISTRY.to_owned();
    }
    if domain == DEFAULT_REGISTRY && !path.contains('/') {
        path = format!("{OFFICIAL_REPOSITORY_PREFIX}{path}");
    }
    (domain, path)
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.path)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl FromStr for ImageReference {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_docker_ref(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn parse(s: &str) -> ImageReference {
        ImageReference::parse_docker_ref(s).expect("valid reference")
    }

    #[test]
    fn familiar_name_is_normalised() {
        let reference = parse("nginx");
        assert_eq!(reference.domain(), "docker.io");
        assert_eq!(reference.path(), "library/nginx");
        assert_eq!(reference.tag(), Some("latest"));
        assert_eq!(reference.to_string(), "docker.io/library/nginx:latest");
    }

    #[test]
    fn user_repository_keeps_namespace() {
        assert_eq!(parse("bitnami/redis:7.2").to_string(), "docker.io/bitnami/redis:7.2");
    }

    #[test]
    fn explicit_registry_with_port() {
        let reference = parse("registry.local:5000/team/tool:v1");
        assert_eq!(reference.domain(), "registry.local:5000");
        assert_eq!(reference.path(), "team/tool");
        assert_eq!(reference.tag(), Some("v1"));
    }

    #[test]
    fn localhost_is_a_domain() {
        assert_eq!(parse("localhost/app").to_string(), "localhost/app:latest");
    }

    #[test]
    fn legacy_index_domain_is_rewritten() {
        assert_eq!(
            parse("index.docker.io/library/alpine:3").to_string(),
            "docker.io/library/alpine:3"
        );
    }

    #[test]
    fn digest_reference_drops_tag() {
        let reference = parse(&format!("nginx:1.25@{DIGEST}"));
        assert!(reference.is_canonical());
        assert_eq!(reference.digest().map(ToString::to_string).as_deref(), Some(DIGEST));
        assert_eq!(reference.tag(), None);
        assert_eq!(reference.to_string(), format!("docker.io/library/nginx@{DIGEST}"));
    }

    #[test]
    fn with_digest_keeps_tag() {
        let digest = Digest::parse(DIGEST).expect("digest");
        let pinned = parse("redis:7").with_digest(digest);
        assert_eq!(pinned.to_string(), format!("docker.io/library/redis:7@{DIGEST}"));
    }

    #[test]
    fn rejects_uppercase_repository() {
        assert!(ImageReference::parse_docker_ref("Library/Nginx").is_err());
        assert!(ImageReference::parse_docker_ref("docker.io/Nginx").is_err());
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "nginx:", "nginx:-bad", "a//b", "nginx@sha256:xyz", ":tag"] {
            assert!(ImageReference::parse_docker_ref(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn rejects_bare_identifier() {
        let hex = &DIGEST["sha256:".len()..];
        assert!(ImageReference::parse_docker_ref(hex).is_err());
    }
}
