//! Two distinct checksum algorithms, deliberately not unified: CRC-32/IEEE
//! for bus resources, where speed matters
//! because every node handoff can be checked, and SHA-256 for package
//! assets, where collision resistance matters because packages cross a
//! trust boundary.

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::error::IntegrityError;

pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

/// Stream a file through SHA-256 without loading it entirely into memory.
pub fn sha256_file(path: &Path) -> Result<String, IntegrityError> {
    let mut file = std::fs::File::open(path).map_err(|source| IntegrityError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|source| IntegrityError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// First byte offset at which two equal-length buffers diverge.
pub fn diff_offset(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter().zip(b.iter()).position(|(x, y)| x != y).or_else(|| {
        if a.len() != b.len() {
            Some(a.len().min(b.len()))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_is_deterministic() {
        assert_eq!(crc32(b"livecalc"), crc32(b"livecalc"));
        assert_ne!(crc32(b"livecalc"), crc32(b"livecalc2"));
    }

    #[test]
    fn sha256_hex_matches_known_vector() {
        // SHA-256("") = e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn diff_offset_finds_first_mismatch() {
        assert_eq!(diff_offset(b"abcd", b"abXd"), Some(2));
        assert_eq!(diff_offset(b"abcd", b"abcd"), None);
    }

    #[test]
    fn diff_offset_handles_length_mismatch() {
        assert_eq!(diff_offset(b"abc", b"ab"), Some(2));
    }
}
