//! Streaming content digest.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 64 * 1024;

/// Lowercase hex SHA-256 of the file at `path`, read in fixed-size chunks.
pub async fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_known_digest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("abc.pdf");
        std::fs::write(&path, b"abc").unwrap();

        assert_eq!(
            sha256_file(&path).await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_digest_is_deterministic_across_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let content: Vec<u8> = (0..(3 * CHUNK_SIZE + 17)).map(|i| (i % 251) as u8).collect();
        let a = temp_dir.path().join("a.pdf");
        let b = temp_dir.path().join("b.pdf");
        std::fs::write(&a, &content).unwrap();
        std::fs::write(&b, &content).unwrap();

        let first = sha256_file(&a).await.unwrap();
        assert_eq!(first, sha256_file(&a).await.unwrap());
        assert_eq!(first, sha256_file(&b).await.unwrap());
        assert_eq!(first, hex::encode(Sha256::digest(&content)));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(sha256_file(&temp_dir.path().join("nope.pdf")).await.is_err());
    }
}
