//! Content fingerprints for change detection.

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    /// No file exists at the path
    Absent,
    Sha256([u8; 32]),
}

impl Fingerprint {
    pub fn of_bytes(content: &[u8]) -> Self {
        Fingerprint::Sha256(Sha256::digest(content).into())
    }

    pub fn of_file(path: &Path) -> Result<Self> {
        match std::fs::read(path) {
            Ok(content) => Ok(Self::of_bytes(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Fingerprint::Absent),
            Err(e) => Err(e).with_context(|| format!("Failed to fingerprint {}", path.display())),
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fingerprint::Absent => write!(f, "absent"),
            Fingerprint::Sha256(digest) => {
                for byte in digest {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}
