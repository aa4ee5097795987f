//! Append-only run history.
//!
//! Finished runs are archived as JSON lines, one [`RunReport`] per line.
//! The file is only ever appended to, so concurrent readers see a prefix of
//! complete records.

use crate::errors::HistoryError;
use crate::run::RunReport;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A JSON-lines archive of finished runs.
#[derive(Debug, Clone)]
pub struct RunArchive {
    path: PathBuf,
}

impl RunArchive {
    /// Creates an archive backed by the given file. The file is created on
    /// first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the archive path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one finished run to the archive.
    pub fn append(&self, report: &RunReport) -> Result<(), HistoryError> {
        let mut line = serde_json::to_string(report)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Loads every archived run, oldest first.
    ///
    /// A missing archive file is an empty archive, not an error.
    pub fn load(&self) -> Result<Vec<RunReport>, HistoryError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut reports = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            reports.push(serde_json::from_str(&line)?);
        }
        Ok(reports)
    }

    /// Finds an archived run by its identifier.
    pub fn find(&self, run_id: Uuid) -> Result<Option<RunReport>, HistoryError> {
        Ok(self
            .load()?
            .into_iter()
            .find(|report| report.run.run_id == run_id))
    }
}
