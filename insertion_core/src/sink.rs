//! Diagnostic sinks for generated Cartesian trajectories.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::InsertionError;
use crate::phase::Phase;
use crate::trajectory::Trajectory;

/// Receives every Cartesian trajectory the supervisor generates.
///
/// Failures are reported to the caller, which logs and carries on; a sink
/// never stops an insertion.
pub trait TrajectorySink {
    fn record(&mut self, phase: Phase, trajectory: &Trajectory) -> Result<(), InsertionError>;
}

impl<T: TrajectorySink + ?Sized> TrajectorySink for Box<T> {
    fn record(&mut self, phase: Phase, trajectory: &Trajectory) -> Result<(), InsertionError> {
        (**self).record(phase, trajectory)
    }
}

/// Writes `x,y,z` rows to a CSV file.
///
/// The header is written once, when the file is empty. Without `append` the
/// first record of this sink truncates the file; later records always append.
#[derive(Debug)]
pub struct CsvTrajectorySink {
    path: PathBuf,
    append: bool,
    opened: bool,
}

impl CsvTrajectorySink {
    pub fn new(path: impl Into<PathBuf>, append: bool) -> Self {
        Self {
            path: path.into(),
            append,
            opened: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One-shot dump of a trajectory, as used by the `spiral` CLI command.
    pub fn write_all(
        path: impl Into<PathBuf>,
        trajectory: &Trajectory,
        append: bool,
    ) -> Result<(), InsertionError> {
        Self::new(path, append).write(trajectory)
    }

    fn write(&mut self, trajectory: &Trajectory) -> Result<(), InsertionError> {
        let io = |e: std::io::Error| InsertionError::Io(format!("{}: {e}", self.path.display()));
        let truncate = !self.append && !self.opened;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(!truncate)
            .truncate(truncate)
            .open(&self.path)
            .map_err(io)?;
        let empty = file.metadata().map_err(io)?.len() == 0;
        self.opened = true;

        let csv_err = |e: csv::Error| InsertionError::Io(format!("{}: {e}", self.path.display()));
        let mut w = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if empty {
            w.write_record(["x", "y", "z"]).map_err(csv_err)?;
        }
        for p in trajectory {
            w.write_record([p.x.to_string(), p.y.to_string(), p.z.to_string()])
                .map_err(csv_err)?;
        }
        w.flush().map_err(io)?;
        Ok(())
    }
}

impl TrajectorySink for CsvTrajectorySink {
    fn record(&mut self, phase: Phase, trajectory: &Trajectory) -> Result<(), InsertionError> {
        tracing::debug!(%phase, points = trajectory.len(), path = %self.path.display(), "trajectory logged");
        self.write(trajectory)
    }
}

/// Keeps recorded trajectories in memory; clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: std::sync::Arc<parking_lot::Mutex<Vec<(Phase, Trajectory)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Phase, Trajectory)> {
        self.records.lock().clone()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.records.lock().iter().map(|(p, _)| *p).collect()
    }
}

impl TrajectorySink for MemorySink {
    fn record(&mut self, phase: Phase, trajectory: &Trajectory) -> Result<(), InsertionError> {
        self.records.lock().push((phase, trajectory.clone()));
        Ok(())
    }
}
