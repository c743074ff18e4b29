//! Job persistence between ticks.
//!
//! The engine never stores jobs itself. Runners load a job, tick it and save
//! it again; anything implementing [`JobStore`] can sit behind that loop.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::constants::files;
use crate::error::{EngineError, Result};
use crate::job::Job;
use crate::snapshot::{compress_job, decompress_job};

/// Load/save boundary for jobs.
///
/// Implementations must round-trip a job exactly. They provide no locking
/// across processes: only one runner may own a job at a time.
pub trait JobStore: Send + Sync {
    fn load(&self, job_id: &str) -> Result<Job>;

    fn save(&self, job: &Job) -> Result<()>;

    /// Every stored job, in no particular order.
    fn list(&self) -> Result<Vec<Job>>;

    /// Whether someone asked for this job to stop.
    fn cancel_requested(&self, job_id: &str) -> Result<bool> {
        Ok(self.load(job_id)?.request_cancel)
    }

    /// Flag a stored job for cancellation.
    fn request_cancel(&self, job_id: &str) -> Result<()> {
        let mut job = self.load(job_id)?;
        job.request_cancel = true;
        self.save(&job)
    }
}

/// In-memory store, mostly for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

impl JobStore for MemoryJobStore {
    fn load(&self, job_id: &str) -> Result<Job> {
        self.jobs
            .lock()
            .get(job_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(job_id))
    }

    fn save(&self, job: &Job) -> Result<()> {
        self.jobs.lock().insert(job.id.clone(), job.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Job>> {
        Ok(self.jobs.lock().values().cloned().collect())
    }
}

/// Directory of job documents, one file per job.
///
/// Jobs are written as pretty JSON (`{name}.json`) or, with compression
/// enabled, as zstd snapshots (`{name}.json.zst`). Either form is read back
/// regardless of the current setting.
///
/// # Example
///
/// ```ignore
/// use plus_engine::{FileJobStore, JobStore};
///
/// let store = FileJobStore::new(".plus/jobs").with_compression(true);
/// store.save(&job)?;
/// let job = store.load(&job.id)?;
/// ```
#[derive(Debug, Clone)]
pub struct FileJobStore {
    dir: PathBuf,
    compress: bool,
}

impl FileJobStore {
    /// Create a store rooted at `dir`.
    ///
    /// The directory will be created if it doesn't exist when saving.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            compress: false,
        }
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load every job in the directory.
    ///
    /// Files that fail to parse are logged and skipped.
    pub fn load_all(&self) -> Result<Vec<Job>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut jobs = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let parsed = match path.extension().and_then(|e| e.to_str()) {
                Some(files::JSON_EXTENSION) => std::fs::read(&path)
                    .map_err(EngineError::from)
                    .and_then(|bytes| Ok(serde_json::from_slice::<Job>(&bytes)?)),
                Some(files::SNAPSHOT_EXTENSION) => std::fs::read(&path)
                    .map_err(EngineError::from)
                    .and_then(|bytes| decompress_job(&bytes)),
                _ => continue,
            };
            match parsed {
                Ok(job) => {
                    log::debug!("Loaded job '{}' from {:?}", job.id, path);
                    jobs.push(job);
                }
                Err(e) => log::warn!("Failed to read job from {:?}: {}", path, e),
            }
        }
        Ok(jobs)
    }

    fn file_stem(job_id: &str) -> String {
        job_id.replace(['/', '\\'], "__")
    }

    fn json_path(&self, job_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", Self::file_stem(job_id), files::JSON_EXTENSION))
    }

    fn snapshot_path(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!(
            "{}.{}.{}",
            Self::file_stem(job_id),
            files::JSON_EXTENSION,
            files::SNAPSHOT_EXTENSION
        ))
    }

    /// Write through a temporary file so a crash never leaves half a job.
    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl JobStore for FileJobStore {
    fn load(&self, job_id: &str) -> Result<Job> {
        let snapshot = self.snapshot_path(job_id);
        if snapshot.exists() {
            return decompress_job(&std::fs::read(&snapshot)?);
        }
        let json = self.json_path(job_id);
        if json.exists() {
            return Ok(serde_json::from_slice(&std::fs::read(&json)?)?);
        }
        Err(EngineError::not_found(job_id))
    }

    fn save(&self, job: &Job) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let (path, stale, bytes) = if self.compress {
            (self.snapshot_path(&job.id), self.json_path(&job.id), compress_job(job)?)
        } else {
            (
                self.json_path(&job.id),
                self.snapshot_path(&job.id),
                serde_json::to_string_pretty(job)?.into_bytes(),
            )
        };

        Self::write_atomic(&path, &bytes)?;
        if stale.exists() {
            std::fs::remove_file(&stale)?;
        }
        log::debug!("Saved job '{}' to {:?}", job.id, path);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Job>> {
        self.load_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use crate::test_support::sample_job;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store() {
        let store = MemoryJobStore::new();
        assert!(matches!(store.load("nope"), Err(EngineError::JobNotFound(_))));

        let job = sample_job();
        store.save(&job).unwrap();
        assert_eq!(store.load(&job.id).unwrap(), job);
        assert_eq!(store.len(), 1);
        assert_eq!(store.list().unwrap(), vec![job]);
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileJobStore::new(temp_dir.path().join("jobs"));

        let job = sample_job();
        store.save(&job).unwrap();
        assert!(temp_dir
            .path()
            .join("jobs/localhost__ann__job.1.json")
            .exists());

        let loaded = store.load(&job.id).unwrap();
        assert_eq!(loaded, job);
        assert_eq!(
            serde_json::to_string(&loaded).unwrap(),
            serde_json::to_string(&job).unwrap()
        );
    }

    #[test]
    fn test_switching_to_compression_replaces_json() {
        let temp_dir = TempDir::new().unwrap();
        let plain = FileJobStore::new(temp_dir.path());
        let compressed = FileJobStore::new(temp_dir.path()).with_compression(true);

        let mut job = sample_job();
        plain.save(&job).unwrap();
        job.status = JobStatus::Succeeded;
        compressed.save(&job).unwrap();

        assert!(!temp_dir.path().join("localhost__ann__job.1.json").exists());
        assert_eq!(plain.load(&job.id).unwrap().status, JobStatus::Succeeded);
        assert_eq!(plain.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_cancel_flag() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileJobStore::new(temp_dir.path());
        let job = sample_job();
        store.save(&job).unwrap();

        assert!(!store.cancel_requested(&job.id).unwrap());
        store.request_cancel(&job.id).unwrap();
        assert!(store.cancel_requested(&job.id).unwrap());
    }

    #[test]
    fn test_load_all_skips_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileJobStore::new(temp_dir.path());
        store.save(&sample_job()).unwrap();
        std::fs::write(temp_dir.path().join("broken.json"), "{").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.load_all().unwrap().len(), 1);
    }
}
