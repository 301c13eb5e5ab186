//! Ed25519 key management and manifest signing.
//!
//! The launcher verifies `bootstrap.json` against a detached signature file.
//! The signature covers the SHA-256 digest of the manifest bytes and is
//! stored raw (64 bytes) next to the manifest.

use crate::error::{PublisherError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;

/// File name of the PKCS#8 private key inside the key directory.
pub const PRIVATE_KEY_FILE: &str = "key-private.pem";

/// File name of the SPKI public key inside the key directory.
pub const PUBLIC_KEY_FILE: &str = "key-public.pem";

/// Locations of a key pair on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    /// Path to the private key.
    pub private_key: Utf8PathBuf,
    /// Path to the public key.
    pub public_key: Utf8PathBuf,
    /// Whether this call created the private key.
    pub created: bool,
}

/// Ensure a key pair exists in `dir`, creating it if absent.
///
/// An existing private key is never replaced. A missing public key is
/// re-derived from the private key.
///
/// # Errors
///
/// Returns [`PublisherError::Signing`] if an existing key cannot be decoded or
/// a new one cannot be encoded, and [`PublisherError::Io`] on filesystem
/// failures.
pub fn generate_keys(dir: &Utf8Path) -> Result<KeyPair> {
    fs::create_dir_all(dir)?;
    let private_key = dir.join(PRIVATE_KEY_FILE);
    let public_key = dir.join(PUBLIC_KEY_FILE);

    let (signing_key, created) = if private_key.is_file() {
        debug!("reusing signing key at {private_key}");
        (load_signing_key(&private_key)?, false)
    } else {
        let key = SigningKey::generate(&mut rand::rngs::OsRng);
        let pem = key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| signing_error("encode private key", e))?;
        write_private(&private_key, pem.as_bytes())?;
        info!("generated signing key at {private_key}");
        (key, true)
    };

    if created || !public_key.is_file() {
        let pem = signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| signing_error("encode public key", e))?;
        fs::write(&public_key, pem)?;
    }

    Ok(KeyPair {
        private_key,
        public_key,
        created,
    })
}

/// Sign `input` with the key at `private_key`, writing the signature to
/// `output`.
///
/// # Errors
///
/// Returns [`PublisherError::Signing`] if the key cannot be decoded and
/// [`PublisherError::Io`] if the files cannot be read or written.
pub fn sign_file(private_key: &Utf8Path, input: &Utf8Path, output: &Utf8Path) -> Result<()> {
    let key = load_signing_key(private_key)?;
    let digest = digest_file(input)?;
    let signature = key.sign(&digest);
    fs::write(output, signature.to_bytes())?;
    debug!("signed {input} into {output}");
    Ok(())
}

/// Verify that `signature` is a valid signature of `input` under
/// `public_key`.
///
/// # Errors
///
/// Returns [`PublisherError::Signing`] if the key or signature is malformed or
/// the signature does not match.
pub fn verify_file(public_key: &Utf8Path, input: &Utf8Path, signature: &Utf8Path) -> Result<()> {
    let pem = fs::read_to_string(public_key)?;
    let key = VerifyingKey::from_public_key_pem(&pem)
        .map_err(|e| signing_error("decode public key", e))?;
    let raw = fs::read(signature)?;
    let signature =
        Signature::from_slice(&raw).map_err(|e| signing_error("decode signature", e))?;
    let digest = digest_file(input)?;
    key.verify(&digest, &signature)
        .map_err(|e| signing_error("verify signature", e))
}

fn load_signing_key(path: &Utf8Path) -> Result<SigningKey> {
    let pem = fs::read_to_string(path)?;
    SigningKey::from_pkcs8_pem(&pem).map_err(|e| signing_error("decode private key", e))
}

fn digest_file(path: &Utf8Path) -> Result<[u8; 32]> {
    let bytes = fs::read(path)?;
    Ok(Sha256::digest(&bytes).into())
}

fn signing_error(step: &str, err: impl std::fmt::Display) -> PublisherError {
    PublisherError::Signing {
        reason: format!("{step}: {err}"),
    }
}

#[cfg(unix)]
fn write_private(path: &Utf8Path, contents: &[u8]) -> Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Utf8Path, contents: &[u8]) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(contents)?;
    Ok(())
}
