use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("package is missing required entry {0:?}")]
    MissingEntry(String),
    #[error("asset {asset:?} failed checksum verification: expected {expected}, got {actual}")]
    ChecksumMismatch { asset: String, expected: String, actual: String },
    #[error("package integrity mismatch: local {local} does not match remote {remote}")]
    ParityMismatch { local: String, remote: String },
}
