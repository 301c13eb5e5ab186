//! SHA-256 digests for artifacts and manifests.
//!
//! [`Sha256Digest`] is the only hash representation written into artifact
//! records. [`copy_with_sha256`] hashes exactly the bytes it writes, so the
//! digest recorded for a copied artifact always matches the file that ships.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

const BUFFER_LEN: usize = 8192;

/// Rejection reason for a malformed digest string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid SHA-256 digest: {reason}")]
pub struct InvalidDigest {
    /// Why the value was rejected.
    pub reason: String,
}

/// A validated, lowercase hex-encoded SHA-256 digest.
///
/// # Examples
///
/// ```
/// use bootstrap_publisher::artifact::sha256_digest::Sha256Digest;
///
/// let digest = Sha256Digest::of_bytes(b"");
/// assert_eq!(
///     digest.as_str(),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Hash an in-memory byte slice.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self::from_hasher(Sha256::new_with_prefix(bytes))
    }

    fn from_hasher(hasher: Sha256) -> Self {
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<&str> for Sha256Digest {
    type Error = InvalidDigest;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        validate_sha256(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for Sha256Digest {
    type Error = InvalidDigest;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_sha256(&value)?;
        Ok(Self(value))
    }
}

impl From<Sha256Digest> for String {
    fn from(digest: Sha256Digest) -> Self {
        digest.0
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_sha256(value: &str) -> Result<(), InvalidDigest> {
    if value.len() != DIGEST_HEX_LEN {
        return Err(InvalidDigest {
            reason: format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {}",
                value.len()
            ),
        });
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !c.is_ascii_digit() && !('a'..='f').contains(c))
    {
        return Err(InvalidDigest {
            reason: format!("unexpected character '{bad}'"),
        });
    }
    Ok(())
}

/// Digest and byte count of a hashed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedFile {
    /// SHA-256 of the file contents.
    pub digest: Sha256Digest,
    /// Number of bytes hashed.
    pub size: u64,
}

/// Compute the SHA-256 digest and size of the file at `path`.
///
/// # Errors
///
/// Returns any I/O error raised while opening or reading the file.
pub fn compute_sha256(path: &Path) -> io::Result<HashedFile> {
    let mut file = fs::File::open(path)?;
    hash_stream(&mut file, &mut io::sink())
}

/// Copy `source` to `destination`, hashing the bytes as they are written.
///
/// The destination is overwritten when it already exists.
///
/// # Errors
///
/// Returns any I/O error raised while reading the source or writing the
/// destination.
pub fn copy_with_sha256(source: &Path, destination: &Path) -> io::Result<HashedFile> {
    let mut input = fs::File::open(source)?;
    let mut output = io::BufWriter::new(fs::File::create(destination)?);
    let hashed = hash_stream(&mut input, &mut output)?;
    output.flush()?;
    Ok(hashed)
}

fn hash_stream(input: &mut dyn Read, output: &mut dyn Write) -> io::Result<HashedFile> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; BUFFER_LEN];
    let mut size = 0u64;
    loop {
        let bytes_read = match input.read(&mut buffer) {
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        let Some(chunk) = buffer.get(..bytes_read).filter(|chunk| !chunk.is_empty()) else {
            break;
        };
        hasher.update(chunk);
        output.write_all(chunk)?;
        size += chunk.len() as u64;
    }
    Ok(HashedFile {
        digest: Sha256Digest::from_hasher(hasher),
        size,
    })
}
