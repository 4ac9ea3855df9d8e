//! File fingerprinting service
//!
//! Reads files from disk and derives their [`Fingerprint`]. Every call does a
//! single pass over the file; nothing is cached, so two calls always reflect
//! the bytes on disk at the moment of the call.

use crate::fingerprint::Fingerprint;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Read buffer size for streaming fingerprints
const CHUNK_SIZE: usize = 64 * 1024;

/// Bytes of a file together with their fingerprint, taken from one read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// Path the snapshot was read from
    pub path: PathBuf,
    /// Exact file contents
    pub bytes: Vec<u8>,
    /// Fingerprint of `bytes`
    pub fingerprint: Fingerprint,
}

impl FileSnapshot {
    /// Size of the snapshot in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the file was empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Computes fingerprints of files on disk
///
/// Stateless apart from the optional size limit; cheap to clone.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintService {
    max_file_size: Option<u64>,
}

impl FingerprintService {
    /// Create a service without a size limit
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse files larger than `limit` bytes
    #[inline]
    #[must_use]
    pub fn with_max_file_size(mut self, limit: u64) -> Self {
        self.max_file_size = Some(limit);
        self
    }

    /// Configured size limit, if any
    #[inline]
    #[must_use]
    pub fn max_file_size(&self) -> Option<u64> {
        self.max_file_size
    }

    /// Fingerprint the file at `path` in one streaming pass
    ///
    /// # Errors
    /// - `FingerprintError::NotFound` if the file does not exist
    /// - `FingerprintError::TooLarge` if the file exceeds the size limit
    /// - `FingerprintError::Io` on any other read failure
    pub async fn fingerprint(&self, path: impl AsRef<Path>) -> Result<Fingerprint, FingerprintError> {
        let path = path.as_ref();
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| FingerprintError::from_io(path, e))?;
        self.check_size(path, &file).await?;

        let mut hasher = blake3::Hasher::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = file
                .read(&mut buf)
                .await
                .map_err(|e| FingerprintError::from_io(path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize().into())
    }

    /// Read the whole file and fingerprint exactly the bytes read
    ///
    /// # Errors
    /// Same as [`FingerprintService::fingerprint`].
    pub async fn snapshot(&self, path: impl AsRef<Path>) -> Result<FileSnapshot, FingerprintError> {
        let path = path.as_ref();
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| FingerprintError::from_io(path, e))?;
        let size = self.check_size(path, &file).await?;

        let mut bytes = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
        file.read_to_end(&mut bytes)
            .await
            .map_err(|e| FingerprintError::from_io(path, e))?;

        let fingerprint = Fingerprint::of_bytes(&bytes);
        Ok(FileSnapshot {
            path: path.to_path_buf(),
            bytes,
            fingerprint,
        })
    }

    async fn check_size(&self, path: &Path, file: &tokio::fs::File) -> Result<u64, FingerprintError> {
        let meta = file
            .metadata()
            .await
            .map_err(|e| FingerprintError::from_io(path, e))?;
        if meta.is_dir() {
            return Err(FingerprintError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        let size = meta.len();
        match self.max_file_size {
            Some(limit) if size > limit => Err(FingerprintError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit,
            }),
            _ => Ok(size),
        }
    }
}

/// Errors that can occur while fingerprinting a file
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// File does not exist
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Path exists but is not a regular file
    #[error("not a regular file: {}", path.display())]
    NotAFile { path: PathBuf },

    /// File exceeds the configured size limit
    #[error("file too large: {} is {size} bytes (max: {limit})", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    /// Any other IO failure
    #[error("io error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FingerprintError {
    /// Classify an IO error for `path`
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Path the error refers to
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path }
            | Self::NotAFile { path }
            | Self::TooLarge { path, .. }
            | Self::Io { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn fingerprint_matches_in_memory_hash() {
        let file = temp_file(b"alpha\nbeta\n");
        let service = FingerprintService::new();

        let fp = service.fingerprint(file.path()).await.unwrap();
        assert_eq!(fp, Fingerprint::of_bytes(b"alpha\nbeta\n"));
    }

    #[tokio::test]
    async fn streaming_and_snapshot_agree_on_large_files() {
        let contents: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let file = temp_file(&contents);
        let service = FingerprintService::new();

        let streamed = service.fingerprint(file.path()).await.unwrap();
        let snapshot = service.snapshot(file.path()).await.unwrap();
        assert_eq!(streamed, snapshot.fingerprint);
        assert_eq!(snapshot.bytes, contents);
    }

    #[tokio::test]
    async fn unchanged_file_fingerprints_identically() {
        let file = temp_file(b"stable");
        let service = FingerprintService::new();

        let first = service.fingerprint(file.path()).await.unwrap();
        let second = service.fingerprint(file.path()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn modified_file_fingerprints_differently() {
        let mut file = temp_file(b"before");
        let service = FingerprintService::new();
        let first = service.fingerprint(file.path()).await.unwrap();

        file.write_all(b" and after").unwrap();
        file.flush().unwrap();

        let second = service.fingerprint(file.path()).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let service = FingerprintService::new();

        let result = service.fingerprint(&missing).await;
        assert!(matches!(result, Err(FingerprintError::NotFound { .. })));
        assert_eq!(result.unwrap_err().path(), missing.as_path());
    }

    #[tokio::test]
    async fn directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = FingerprintService::new();

        let result = service.snapshot(dir.path()).await;
        assert!(matches!(result, Err(FingerprintError::NotAFile { .. })));
    }

    #[tokio::test]
    async fn size_limit_is_enforced() {
        let file = temp_file(&[b'x'; 128]);
        let service = FingerprintService::new().with_max_file_size(64);

        let result = service.snapshot(file.path()).await;
        assert!(matches!(
            result,
            Err(FingerprintError::TooLarge {
                size: 128,
                limit: 64,
                ..
            })
        ));
    }
}
