//! Append-only JSON log of assertion outcomes

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use stepbind_core::{AssertionRecord, Result, StepError};
use tracing::{debug, warn};

/// A JSON array file that accumulates assertion records across runs
#[derive(Debug, Clone)]
pub struct ResultLog {
    path: PathBuf,
}

impl ResultLog {
    pub const DEFAULT_FILE: &'static str = "test_result.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Existing records. A missing file or a body that is not a record
    /// array counts as empty; any other read failure is an error.
    pub fn load(&self) -> Result<Vec<AssertionRecord>> {
        let body = match fs::read_to_string(&self.path) {
            Ok(body) => body,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StepError::io(self.path.display().to_string(), err)),
        };
        match serde_json::from_str(&body) {
            Ok(records) => Ok(records),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "discarding corrupt result log");
                Ok(Vec::new())
            }
        }
    }

    /// Append records and return the total now stored
    pub fn append<'a>(&self, records: impl IntoIterator<Item = &'a AssertionRecord>) -> Result<usize> {
        let mut existing = self.load()?;
        existing.extend(records.into_iter().cloned());

        let body = serde_json::to_string_pretty(&existing)?;
        fs::write(&self.path, body)
            .map_err(|err| StepError::io(self.path.display().to_string(), err))?;

        debug!(path = %self.path.display(), total = existing.len(), "result log updated");
        Ok(existing.len())
    }
}
