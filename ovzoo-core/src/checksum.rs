//! File integrity checks: streaming SHA-384 digests.

use sha2::{Digest, Sha384};
use std::io::Read;
use std::path::Path;

use crate::error::ZooError;

const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the hex-encoded SHA-384 digest of a file without loading it
/// into memory at once.
pub fn compute_sha384(path: &Path) -> Result<String, ZooError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha384::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify a downloaded file against its declared digest. A mismatch is a
/// hard error; the pipeline must not proceed past it.
pub fn verify_file(path: &Path, expected: &str) -> Result<(), ZooError> {
    let actual = compute_sha384(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(ZooError::ChecksumMismatch {
            file: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // SHA-384("abc"), FIPS 180-2 test vector.
    const ABC_SHA384: &str = "cb00753f45a35e8bb5a03d699ac65007272c32ab0eded1631a8b605a43ff5bed8086072ba1e7cc2358baeca134c825a7";

    #[test]
    fn test_known_vector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(compute_sha384(&path).unwrap(), ABC_SHA384);
    }

    #[test]
    fn test_verify_accepts_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();
        verify_file(&path, &ABC_SHA384.to_uppercase()).unwrap();
    }

    #[test]
    fn test_verify_rejects_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abcd").unwrap();
        let err = verify_file(&path, ABC_SHA384).unwrap_err();
        assert!(matches!(err, ZooError::ChecksumMismatch { .. }));
    }
}
