//! Filesystem-backed run store

use chrono::Utc;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{
    ArtifactKind, LatestPointer, RunHandle, RunId, RunStore, LATEST_FILE, REGISTRY_DIR, RUNS_DIR,
};
use crate::error::{BaselineError, Result};

/// Run store rooted at a directory on disk
///
/// Artifacts and the latest pointer are written to a temporary file in the
/// destination directory and renamed into place, so readers never observe
/// a partially written file.
#[derive(Debug, Clone)]
pub struct FsRunStore {
    root: PathBuf,
}

impl FsRunStore {
    /// Create a store rooted at `root`; directories are created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn runs_dir(&self) -> PathBuf {
        self.root.join(RUNS_DIR)
    }

    fn run_dir(&self, id: &RunId) -> PathBuf {
        self.runs_dir().join(id.as_str())
    }

    fn latest_path(&self) -> PathBuf {
        self.root.join(REGISTRY_DIR).join(LATEST_FILE)
    }

    /// Create a run with a caller-chosen id
    ///
    /// Fails with `RunCollision` if the directory already exists; an
    /// existing run is never overwritten.
    pub fn create_run_with_id(&self, id: RunId) -> Result<RunHandle> {
        fs::create_dir_all(self.runs_dir())?;
        let location = self.run_dir(&id);
        match fs::create_dir(&location) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(BaselineError::RunCollision(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(run_id = %id, path = %location.display(), "Created run directory");
        Ok(RunHandle { id, location })
    }
}

/// Write `bytes` to `path` via a temporary sibling file and a rename
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        BaselineError::Internal(format!("{} has no parent directory", path.display()))
    })?;
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| BaselineError::Io(e.error))?;
    Ok(())
}

impl RunStore for FsRunStore {
    fn create_run(&self) -> Result<RunHandle> {
        self.create_run_with_id(RunId::generate())
    }

    fn write_artifact(
        &self,
        run: &RunHandle,
        kind: &ArtifactKind,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let path = run.location.join(kind.relative_path());
        write_atomic(&path, bytes)?;
        tracing::debug!(
            run_id = %run.id,
            artifact = %kind.label(),
            bytes = bytes.len(),
            "Wrote artifact"
        );
        Ok(path)
    }

    fn read_artifact(&self, run: &RunHandle, kind: &ArtifactKind) -> Result<Vec<u8>> {
        let path = run.location.join(kind.relative_path());
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(BaselineError::artifact_missing(kind.label(), path))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set_latest(&self, run: &RunHandle) -> Result<LatestPointer> {
        let version = self.latest()?.map(|p| p.version + 1).unwrap_or(1);
        let pointer = LatestPointer {
            run_id: run.id.clone(),
            updated_at: Utc::now(),
            version,
        };
        write_atomic(&self.latest_path(), &serde_json::to_vec_pretty(&pointer)?)?;
        tracing::info!(run_id = %run.id, version, "Updated latest pointer");
        Ok(pointer)
    }

    fn latest(&self) -> Result<Option<LatestPointer>> {
        match fs::read(self.latest_path()) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn open_run(&self, id: &RunId) -> Result<RunHandle> {
        let id = RunId::parse(id.as_str())?;
        let location = self.run_dir(&id);
        if location.is_dir() {
            Ok(RunHandle { id, location })
        } else {
            Err(BaselineError::run_not_found(format!(
                "no run '{}' under {}",
                id,
                self.runs_dir().display()
            )))
        }
    }

    fn list_runs(&self) -> Result<Vec<RunId>> {
        let entries = match fs::read_dir(self.runs_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(id) = RunId::parse(name) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RunRef;
    use tempfile::TempDir;

    fn store() -> (TempDir, FsRunStore) {
        let dir = TempDir::new().unwrap();
        let store = FsRunStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_create_and_open_run() {
        let (_dir, store) = store();
        let run = store.create_run().unwrap();
        assert!(run.location.is_dir());
        assert_eq!(store.open_run(&run.id).unwrap(), run);
        assert_eq!(store.list_runs().unwrap(), vec![run.id]);
    }

    #[test]
    fn test_collision_is_reported() {
        let (_dir, store) = store();
        let id = RunId::parse("20240101_000000_000000_00000000").unwrap();
        store.create_run_with_id(id.clone()).unwrap();
        let err = store.create_run_with_id(id).unwrap_err();
        assert!(matches!(err, BaselineError::RunCollision(_)));
    }

    #[test]
    fn test_artifact_round_trip_and_missing() {
        let (_dir, store) = store();
        let run = store.create_run().unwrap();
        let path = store
            .write_artifact(&run, &ArtifactKind::Metadata, b"{}")
            .unwrap();
        assert_eq!(path, run.location.join("run_meta.json"));
        assert_eq!(
            store.read_artifact(&run, &ArtifactKind::Metadata).unwrap(),
            b"{}"
        );

        let err = store.read_artifact(&run, &ArtifactKind::Model).unwrap_err();
        match err {
            BaselineError::ArtifactMissing { artifact, path } => {
                assert_eq!(artifact, "model");
                assert!(path.ends_with("model/model.json"));
            }
            other => panic!("expected ArtifactMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_latest_pointer_versions() {
        let (dir, store) = store();
        assert!(store.latest().unwrap().is_none());
        assert!(matches!(
            store.resolve(&RunRef::Latest),
            Err(BaselineError::RunNotFound(_))
        ));

        let first = store.create_run().unwrap();
        let second = store.create_run().unwrap();
        assert_eq!(store.set_latest(&first).unwrap().version, 1);
        let pointer = store.set_latest(&second).unwrap();
        assert_eq!(pointer.version, 2);
        assert_eq!(pointer.run_id, second.id);
        assert_eq!(store.resolve(&RunRef::Latest).unwrap(), second);
        assert!(dir.path().join("registry/latest.json").is_file());
    }

    #[test]
    fn test_unknown_run_is_not_found() {
        let (_dir, store) = store();
        let id = RunId::parse("does_not_exist").unwrap();
        assert!(matches!(
            store.open_run(&id),
            Err(BaselineError::RunNotFound(_))
        ));
        assert!(store.list_runs().unwrap().is_empty());
    }
}
