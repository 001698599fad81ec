// wap-core/src/infrastructure/journal.rs

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::domain::workflow::WorkflowRun;
use crate::error::WapError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::journal::WorkflowJournal;

/// One JSON document per workflow run, rewritten atomically after each step.
pub struct FileJournal {
    dir: PathBuf,
}

impl FileJournal {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, InfrastructureError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The id is the file name, so only ids that are already safe file names
    /// are accepted. Two ids never share a record.
    fn record_path(&self, workflow_id: &str) -> Result<PathBuf, InfrastructureError> {
        let valid = !workflow_id.is_empty()
            && !workflow_id.starts_with('.')
            && workflow_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(InfrastructureError::InvalidWorkflowId(workflow_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", workflow_id)))
    }

    /// Serializes the run into a temp file of the journal directory, then
    /// renames it over the record: readers see the old run or the new one,
    /// never half a JSON document.
    fn write_record(&self, path: &Path, run: &WorkflowRun) -> Result<(), InfrastructureError> {
        let mut temp_file = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut temp_file, run)?;
        temp_file.flush()?;
        temp_file
            .persist(path)
            .map_err(|e| InfrastructureError::Io(e.error))?;
        Ok(())
    }
}

impl WorkflowJournal for FileJournal {
    fn load(&self, workflow_id: &str) -> Result<Option<WorkflowRun>, WapError> {
        let path = self.record_path(workflow_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let run: WorkflowRun = serde_json::from_str(&content)?;

        if run.workflow_id != workflow_id {
            return Err(InfrastructureError::JournalMismatch {
                requested: workflow_id.to_string(),
                found: run.workflow_id,
            }
            .into());
        }
        Ok(Some(run))
    }

    fn save(&self, run: &WorkflowRun) -> Result<(), WapError> {
        let path = self.record_path(&run.workflow_id)?;
        self.write_record(&path, run)?;
        debug!(path = ?path, status = run.status.as_str(), "Workflow record saved");
        Ok(())
    }

    fn list(&self) -> Result<Vec<WorkflowRun>, WapError> {
        let mut runs = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<WorkflowRun>(&content) {
                Ok(run) => runs.push(run),
                Err(e) => warn!(path = ?path, error = %e, "Skipping unreadable workflow record"),
            }
        }

        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }
}
