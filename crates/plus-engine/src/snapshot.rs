//! Compressed job snapshots
//!
//! Jobs carry their whole script and register store, so persisted snapshots
//! are zstd-compressed JSON.

use crate::constants::files;
use crate::error::{EngineError, Result};
use crate::job::Job;

/// Serialize and compress a job.
pub fn compress_job(job: &Job) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(job)?;
    zstd::encode_all(&json[..], files::COMPRESSION_LEVEL)
        .map_err(|e| EngineError::Compression(e.to_string()))
}

/// Decompress and deserialize a job.
pub fn decompress_job(bytes: &[u8]) -> Result<Job> {
    let json = zstd::decode_all(bytes).map_err(|e| EngineError::Compression(e.to_string()))?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_job;

    #[test]
    fn test_snapshot_restores_job() {
        let job = sample_job();
        let bytes = compress_job(&job).unwrap();
        assert_eq!(decompress_job(&bytes).unwrap(), job);
    }

    #[test]
    fn test_corrupt_snapshot_is_a_compression_error() {
        let err = decompress_job(b"definitely not zstd").unwrap_err();
        assert!(matches!(err, EngineError::Compression(_)));
    }
}
