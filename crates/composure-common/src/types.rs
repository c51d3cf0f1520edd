//! Domain primitive types used across the Composure workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::{ComposeError, Result};

/// Content-addressed digest in `algorithm:hex` form, e.g. `sha256:4f5c...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    algorithm: String,
    encoded: String,
}

impl Digest {
    /// Parses and validates a digest string.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::InvalidReference` if the string is not of the
    /// form `algorithm:encoded`, or if a known algorithm has a hex payload
    /// of the wrong length.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = |message: &str| ComposeError::InvalidReference {
            reference: value.to_owned(),
            message: message.to_owned(),
        };

        let (algorithm, encoded) = value
            .split_once(':')
            .ok_or_else(|| invalid("digest must be of the form algorithm:encoded"))?;

        let algorithm_ok = !algorithm.is_empty()
            && algorithm
                .split(['+', '.', '_', '-'])
                .all(|part| {
                    !part.is_empty()
                        && part
                            .chars()
                            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                });
        if !algorithm_ok {
            return Err(invalid("invalid digest algorithm"));
        }

        let expected_len = match algorithm {
            "sha256" => Some(64),
            "sha384" => Some(96),
            "sha512" => Some(128),
            _ => None,
        };
        match expected_len {
            Some(len) => {
                if encoded.len() != len
                    || !encoded
                        .chars()
                        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
                {
                    return Err(invalid("invalid checksum digest length or format"));
                }
            }
            None => {
                if encoded.is_empty()
                    || !encoded
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '=' | '_' | '-'))
                {
                    return Err(invalid("invalid digest payload"));
                }
            }
        }

        Ok(Self {
            algorithm: algorithm.to_owned(),
            encoded: encoded.to_owned(),
        })
    }

    /// Computes the SHA-256 digest of arbitrary content.
    #[must_use]
    pub fn sha256_of(content: &[u8]) -> Self {
        let hash = Sha256::digest(content);
        Self {
            algorithm: "sha256".to_owned(),
            encoded: format!("{hash:x}"),
        }
    }

    /// Returns the algorithm component (e.g. `sha256`).
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the encoded hash component.
    #[must_use]
    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.encoded)
    }
}

impl FromStr for Digest {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = ComposeError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_string()
    }
}
