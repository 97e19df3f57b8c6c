//! In-memory run store for tests and embedding

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{ArtifactKind, LatestPointer, RunHandle, RunId, RunStore, RUNS_DIR};
use crate::error::{BaselineError, Result};

#[derive(Debug, Default)]
struct State {
    runs: BTreeMap<RunId, HashMap<PathBuf, Vec<u8>>>,
    latest: Option<LatestPointer>,
}

/// Run store that keeps everything in process memory
///
/// Run locations are virtual paths (`runs/<id>`) and never touch disk.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    state: RwLock<State>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| BaselineError::Internal("run store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| BaselineError::Internal("run store lock poisoned".to_string()))
    }

    fn location(id: &RunId) -> PathBuf {
        Path::new(RUNS_DIR).join(id.as_str())
    }

    /// Create a run with a caller-chosen id; an existing id is `RunCollision`
    pub fn create_run_with_id(&self, id: RunId) -> Result<RunHandle> {
        let mut state = self.write()?;
        if state.runs.contains_key(&id) {
            return Err(BaselineError::RunCollision(id.to_string()));
        }
        state.runs.insert(id.clone(), HashMap::new());
        Ok(RunHandle {
            location: Self::location(&id),
            id,
        })
    }

    /// Drop one artifact from a run, returning whether it existed
    pub fn remove_artifact(&self, run: &RunHandle, kind: &ArtifactKind) -> Result<bool> {
        let mut state = self.write()?;
        Ok(state
            .runs
            .get_mut(&run.id)
            .map(|artifacts| artifacts.remove(&kind.relative_path()).is_some())
            .unwrap_or(false))
    }
}

impl RunStore for MemoryRunStore {
    fn create_run(&self) -> Result<RunHandle> {
        self.create_run_with_id(RunId::generate())
    }

    fn write_artifact(
        &self,
        run: &RunHandle,
        kind: &ArtifactKind,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let mut state = self.write()?;
        let artifacts = state
            .runs
            .get_mut(&run.id)
            .ok_or_else(|| BaselineError::run_not_found(run.id.to_string()))?;
        let relative = kind.relative_path();
        artifacts.insert(relative.clone(), bytes.to_vec());
        Ok(run.location.join(relative))
    }

    fn read_artifact(&self, run: &RunHandle, kind: &ArtifactKind) -> Result<Vec<u8>> {
        let state = self.read()?;
        let artifacts = state
            .runs
            .get(&run.id)
            .ok_or_else(|| BaselineError::run_not_found(run.id.to_string()))?;
        let relative = kind.relative_path();
        artifacts
            .get(&relative)
            .cloned()
            .ok_or_else(|| BaselineError::artifact_missing(kind.label(), run.location.join(relative)))
    }

    fn set_latest(&self, run: &RunHandle) -> Result<LatestPointer> {
        let mut state = self.write()?;
        if !state.runs.contains_key(&run.id) {
            return Err(BaselineError::run_not_found(run.id.to_string()));
        }
        let version = state.latest.as_ref().map(|p| p.version + 1).unwrap_or(1);
        let pointer = LatestPointer {
            run_id: run.id.clone(),
            updated_at: Utc::now(),
            version,
        };
        state.latest = Some(pointer.clone());
        Ok(pointer)
    }

    fn latest(&self) -> Result<Option<LatestPointer>> {
        Ok(self.read()?.latest.clone())
    }

    fn open_run(&self, id: &RunId) -> Result<RunHandle> {
        if self.read()?.runs.contains_key(id) {
            Ok(RunHandle {
                id: id.clone(),
                location: Self::location(id),
            })
        } else {
            Err(BaselineError::run_not_found(format!("no run '{}'", id)))
        }
    }

    fn list_runs(&self) -> Result<Vec<RunId>> {
        Ok(self.read()?.runs.keys().cloned().collect())
    }
}
