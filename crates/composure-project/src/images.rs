//! Pinning service images to content digests.
//!
//! [`Project::with_images_resolved`] asks a [`DigestResolver`] for the
//! digest of every enabled service image that is not already pinned, one
//! task per service, and rewrites the images as `name[:tag]@digest`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use composure_common::error::{ComposeError, Result};
use composure_common::types::Digest;
use tokio::task::JoinSet;

use crate::project::Project;
use crate::reference::ImageReference;

/// Looks up the content digest an image reference currently points to.
#[async_trait]
pub trait DigestResolver: Send + Sync {
    /// Returns the digest of `reference`.
    async fn resolve(&self, reference: &ImageReference) -> Result<Digest>;
}

#[async_trait]
impl<F> DigestResolver for F
where
    F: Fn(&ImageReference) -> Result<Digest> + Send + Sync,
{
    async fn resolve(&self, reference: &ImageReference) -> Result<Digest> {
        self(reference)
    }
}

/// Resolver backed by a fixed table of digests.
///
/// Keys may be written in any form [`ImageReference::parse_docker_ref`]
/// accepts; a tagged key only matches that tag, an untagged key matches
/// the `latest` tag.
#[derive(Debug, Clone, Default)]
pub struct PinnedDigests {
    pins: BTreeMap<String, Digest>,
}

impl PinnedDigests {
    /// Builds the table from `image -> digest` entries.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::InvalidReference` for a malformed image key.
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Digest)>,
        S: AsRef<str>,
    {
        let pins = entries
            .into_iter()
            .map(|(image, digest)| {
                ImageReference::parse_docker_ref(image.as_ref())
                    .map(|reference| (reference.to_string(), digest))
            })
            .collect::<Result<_>>()?;
        Ok(Self { pins })
    }

    /// Number of pinned images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Returns true when no image is pinned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

#[async_trait]
impl DigestResolver for PinnedDigests {
    async fn resolve(&self, reference: &ImageReference) -> Result<Digest> {
        self.pins
            .get(&reference.to_string())
            .cloned()
            .ok_or_else(|| ComposeError::NotFound {
                kind: "image digest",
                id: reference.to_string(),
            })
    }
}

impl Project {
    /// Pins every enabled service image to the digest `resolver` reports.
    ///
    /// Images already pinned to a digest are left as written, and services
    /// without an image are skipped. All lookups run concurrently; once
    /// one fails, the remaining ones still run to completion before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::InvalidReference` for a malformed image,
    /// `ComposeError::DigestResolution` wrapping the first resolver failure,
    /// or `ComposeError::Task` if a lookup task panicked.
    pub async fn with_images_resolved<R>(&self, resolver: R) -> Result<Self>
    where
        R: DigestResolver + 'static,
    {
        let resolver = Arc::new(resolver);
        let mut project = self.clone();
        let mut tasks = JoinSet::new();

        for (name, service) in &project.services {
            if service.image.is_empty() {
                continue;
            }
            let resolver = Arc::clone(&resolver);
            let name = name.clone();
            let image = service.image.clone();
            let _ = tasks.spawn(async move {
                let pinned = pin_image(resolver.as_ref(), &image).await;
                (name, pinned)
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(Some(image)))) => {
                    tracing::debug!(service = %name, image = %image, "pinned image digest");
                    if let Some(service) = project.services.get_mut(&name) {
                        service.image = image;
                    }
                }
                Ok((_, Ok(None))) => {}
                Ok((_, Err(e))) => {
                    let _ = first_error.get_or_insert(e);
                }
                Err(join_error) => {
                    let _ = first_error.get_or_insert(ComposeError::Task {
                        message: join_error.to_string(),
                    });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(project),
        }
    }
}

/// Returns the pinned form of `image`, or `None` if it is already pinned.
async fn pin_image<R>(resolver: &R, image: &str) -> Result<Option<String>>
where
    R: DigestResolver + ?Sized,
{
    let reference = ImageReference::parse_docker_ref(image)?;
    if let Some(digest) = reference.digest() {
        tracing::debug!(image, %digest, "image already pinned");
        return Ok(None);
    }
    let digest = resolver
        .resolve(&reference)
        .await
        .map_err(|source| ComposeError::DigestResolution {
            reference: reference.to_string(),
            source: Box::new(source),
        })?;
    Ok(Some(reference.with_digest(digest).to_string()))
}
