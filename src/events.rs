use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Typed notifications sent from the batch worker to the UI loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Inputs were resolved and processing begins.
    Started { total: usize },
    /// About to process file `index` (1-based) of `total`.
    Progress { index: usize, total: usize, eta: Eta },
    /// File `index` was written to `path`.
    Saved {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    Completed { processed: usize },
    Cancelled { processed: usize },
    Failed { message: String },
}

impl ProgressEvent {
    /// Whether this event ends the batch.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Cancelled { .. } | Self::Failed { .. }
        )
    }

    /// Human readable status line for the event.
    pub fn status_line(&self) -> String {
        match self {
            Self::Started { total } => format!("Processing {total} images"),
            Self::Progress { index, total, eta } => {
                format!("Processing {index}/{total} | ETA: {eta}")
            }
            Self::Saved { index, total, path } => {
                format!("Saved {index}/{total}: {}", path.display())
            }
            Self::Completed { processed } => format!("Complete! Processed {processed} images."),
            Self::Cancelled { processed } => format!("Cancelled after {processed} images."),
            Self::Failed { message } => format!("Error: {message}"),
        }
    }
}

/// Remaining-time estimate for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eta {
    /// No file has completed yet.
    Calculating,
    Remaining(Duration),
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calculating => f.write_str("Calculating..."),
            Self::Remaining(remaining) => {
                let secs = remaining.as_secs();
                write!(f, "{:02}:{:02}", secs / 60, secs % 60)
            }
        }
    }
}

/// Average-time-per-file ETA, measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct EtaEstimator {
    started: Instant,
}

impl EtaEstimator {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn estimate(&self, completed: usize, total: usize) -> Eta {
        estimate_eta(self.started.elapsed(), completed, total)
    }
}

/// `(elapsed / completed) * (total - completed)`, truncated to whole seconds.
pub fn estimate_eta(elapsed: Duration, completed: usize, total: usize) -> Eta {
    if completed == 0 {
        return Eta::Calculating;
    }
    let remaining = total.saturating_sub(completed);
    let per_file = elapsed.as_secs_f64() / completed as f64;
    Eta::Remaining(Duration::from_secs((per_file * remaining as f64) as u64))
}
