//! SHA-256 helpers for step fingerprints.

use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Length of a command hash in hex digits.
const SHORT_LEN: usize = 16;

/// Hex SHA-256 of a file's contents.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("failed to read {} for hashing", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Short hex SHA-256 over a sequence of strings.
///
/// Every part is NUL-terminated, so `["-O2", "-g"]` and `["-O2-g"]` differ.
pub fn hash_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(SHORT_LEN);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("helper.cc");
        std::fs::write(&path, "hello").unwrap();

        assert_eq!(
            hash_file(&path).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(hash_file(&tmp.path().join("missing.cc")).is_err());
    }

    #[test]
    fn test_parts_are_separated() {
        assert_eq!(hash_parts(["-O2", "-g"]), hash_parts(["-O2", "-g"]));
        assert_ne!(hash_parts(["-O2", "-g"]), hash_parts(["-O2-g"]));
        assert_eq!(hash_parts(["x"]).len(), 16);
    }
}
