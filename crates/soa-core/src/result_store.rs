use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::newton::NewtonExit;
use crate::sweep::{SweepPoint, SweepSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Converged,
    /// At least one point ran out of Newton iterations
    MaxIters,
    /// At least one point left the bracket or hit a non-finite derivative
    Failed,
}

impl RunStatus {
    /// Worst status over the saturated-gain solves of a sweep
    pub fn from_points(points: &[SweepPoint]) -> Self {
        let mut status = RunStatus::Converged;
        for point in points {
            match point.report.solver.exit {
                NewtonExit::Converged | NewtonExit::Shortcut => {}
                NewtonExit::MaxIters => status = RunStatus::MaxIters,
                NewtonExit::LeftBracket | NewtonExit::NonFinite => return RunStatus::Failed,
            }
        }
        status
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub id: RunId,
    pub spec: SweepSpec,
    pub status: RunStatus,
    pub points: Vec<SweepPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunResult {
    /// Unregistered run; the store assigns the id
    pub fn new(spec: SweepSpec, points: Vec<SweepPoint>) -> Self {
        let status = RunStatus::from_points(&points);
        let message = match status {
            RunStatus::Converged => None,
            _ => {
                let bad = points
                    .iter()
                    .filter(|p| !p.report.solver.exit.is_converged())
                    .count();
                Some(format!("{} of {} points did not converge", bad, points.len()))
            }
        };
        RunResult {
            id: RunId(0),
            spec,
            status,
            points,
            message,
        }
    }
}

/// Runs kept before the oldest is evicted
pub const DEFAULT_MAX_RUNS: usize = 256;

/// Completed sweeps, oldest first
///
/// Ids keep counting across evictions, so an evicted id is simply not
/// found rather than pointing at a newer run.
#[derive(Debug, Clone)]
pub struct ResultStore {
    runs: VecDeque<RunResult>,
    next_id: usize,
    max_runs: usize,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultStore {
    pub fn new() -> Self {
        Self::with_max_runs(DEFAULT_MAX_RUNS)
    }

    pub fn with_max_runs(max_runs: usize) -> Self {
        Self {
            runs: VecDeque::new(),
            next_id: 0,
            max_runs: max_runs.max(1),
        }
    }

    pub fn add_run(&mut self, mut run: RunResult) -> RunId {
        let id = RunId(self.next_id);
        self.next_id += 1;
        run.id = id;
        self.runs.push_back(run);
        while self.runs.len() > self.max_runs {
            if let Some(evicted) = self.runs.pop_front() {
                log::debug!("result_store: evicted run {}", evicted.id.0);
            }
        }
        log::debug!("result_store: stored run {} ({} runs)", id.0, self.runs.len());
        id
    }

    pub fn get(&self, id: RunId) -> Option<&RunResult> {
        let first = self.runs.front()?.id.0;
        self.runs.get(id.0.checked_sub(first)?)
    }

    pub fn runs(&self) -> impl Iterator<Item = &RunResult> {
        self.runs.iter()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn write_table_text(&self, id: RunId, path: &std::path::Path) -> std::io::Result<()> {
        let run = self
            .get(id)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "run not found"))?;
        crate::table::write_table_text(run, path, crate::table::DEFAULT_PRECISION)
    }
}
