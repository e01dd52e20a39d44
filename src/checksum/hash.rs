//! Local digests of downloaded artifacts.

use anyhow::{Context, Result};
use sha2::Digest;
use std::fmt;
use std::io::Read;
use std::path::Path;

use crate::runtime::Runtime;

/// Files are hashed in blocks of this size, never loaded whole.
pub const BLOCK_SIZE: usize = 64 * 1024;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Guesses the algorithm from a checksum file name like `SHA512SUMS`.
    pub fn from_checksum_name(name: &str) -> Self {
        if name.to_lowercase().contains("sha512") {
            Self::Sha512
        } else {
            Self::Sha256
        }
    }

    /// Guesses the algorithm from the length of a hex digest.
    pub fn from_digest(digest: &str) -> Self {
        if digest.trim().len() == 128 {
            Self::Sha512
        } else {
            Self::Sha256
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lower-case hex digest of the file at `path`.
pub fn compute_local_hash<R: Runtime>(
    runtime: &R,
    path: &Path,
    algorithm: HashAlgorithm,
) -> Result<String> {
    let mut reader = runtime.open(path)?;
    let digest = match algorithm {
        HashAlgorithm::Sha256 => hash_reader::<sha2::Sha256>(&mut reader),
        HashAlgorithm::Sha512 => hash_reader::<sha2::Sha512>(&mut reader),
    }
    .with_context(|| format!("Failed to hash {:?}", path))?;

    log::debug!("{} of {:?} is {}", algorithm, path, digest);
    Ok(digest)
}

fn hash_reader<D: Digest>(reader: &mut impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; BLOCK_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Case-insensitive comparison of two hex digests.
pub fn verify(expected: &str, actual: &str) -> bool {
    let expected = expected.trim();
    !expected.is_empty() && expected.eq_ignore_ascii_case(actual.trim())
}
