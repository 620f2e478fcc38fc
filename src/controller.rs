//! Single-batch controller.
//!
//! [`BatchController`] owns the Idle/Running state. A batch runs on its own
//! worker thread and talks to the caller only through [`ProgressEvent`]s, so
//! the UI loop never blocks on image processing and never shares mutable
//! state with the worker.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::batch::BatchRequest;
use crate::config::ModelVariant;
use crate::errors::{MagicMaskError, Result};
use crate::events::ProgressEvent;
use crate::image_processor::{BatchOutcome, ImageProcessor};
use crate::traits::MattingModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    #[default]
    Idle,
    Running,
}

/// Resets the shared state to Idle however the worker exits.
struct IdleGuard(Arc<Mutex<WorkerState>>);

impl Drop for IdleGuard {
    fn drop(&mut self) {
        *self.0.lock() = WorkerState::Idle;
    }
}

/// Caller side of a running batch.
pub struct BatchHandle {
    events: Receiver<ProgressEvent>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl BatchHandle {
    pub const fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// Asks the worker to stop before the next file.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Blocks until the worker thread exits.
    pub fn join(self) -> Result<()> {
        self.worker.join().map_err(|_| MagicMaskError::Worker {
            message: "worker thread panicked".to_string(),
        })
    }

    /// Discards events up to the terminal one, then joins the worker.
    pub fn wait(self) -> Result<ProgressEvent> {
        let terminal = self.events.iter().find(ProgressEvent::is_terminal);
        self.join()?;
        terminal.ok_or_else(|| MagicMaskError::Worker {
            message: "worker exited without a result".to_string(),
        })
    }
}

#[derive(Debug, Default)]
pub struct BatchController {
    state: Arc<Mutex<WorkerState>>,
}

impl BatchController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    /// Starts a batch on a new worker thread.
    ///
    /// Returns `Ok(None)` without doing anything while another batch is
    /// running. Configuration errors are reported before any thread starts.
    /// `load_model` runs on the worker, so model loading and device probing
    /// never block the caller.
    pub fn start<M, F>(&self, request: BatchRequest, load_model: F) -> Result<Option<BatchHandle>>
    where
        M: MattingModel + 'static,
        F: FnOnce(ModelVariant) -> Result<M> + Send + 'static,
    {
        request.validate()?;

        {
            let mut state = self.state.lock();
            if *state == WorkerState::Running {
                info!("Batch already running, ignoring start request");
                return Ok(None);
            }
            *state = WorkerState::Running;
        }

        let (tx, rx) = mpsc::channel();
        let cancel = CancellationToken::new();
        let guard = IdleGuard(Arc::clone(&self.state));
        let worker_cancel = cancel.clone();

        let worker = thread::Builder::new()
            .name("magic-mask-worker".to_string())
            .spawn(move || {
                let terminal = match run_batch(request, load_model, &tx, &worker_cancel) {
                    Ok(BatchOutcome::Completed { processed }) => {
                        ProgressEvent::Completed { processed }
                    }
                    Ok(BatchOutcome::Cancelled { processed }) => {
                        ProgressEvent::Cancelled { processed }
                    }
                    Err(e) => {
                        let message = e.report();
                        error!(error = %message, "Batch failed");
                        ProgressEvent::Failed { message }
                    }
                };
                // Idle before the terminal event so a listener may restart at once.
                drop(guard);
                let _ = tx.send(terminal);
            })
            .map_err(|e| MagicMaskError::Worker {
                message: format!("failed to spawn worker thread: {e}"),
            })?;

        Ok(Some(BatchHandle {
            events: rx,
            cancel,
            worker,
        }))
    }
}

fn run_batch<M, F>(
    request: BatchRequest,
    load_model: F,
    events: &Sender<ProgressEvent>,
    cancel: &CancellationToken,
) -> Result<BatchOutcome>
where
    M: MattingModel,
    F: FnOnce(ModelVariant) -> Result<M>,
{
    let config = request.config;
    let job = request.resolve()?;
    let _ = events.send(ProgressEvent::Started { total: job.total() });
    info!(
        total = job.total(),
        output = %job.output_dir.display(),
        variant = %config.variant,
        "Starting batch"
    );

    let model = load_model(config.variant)?;
    info!(input_size = model.input_size(), "Model ready");
    ImageProcessor::new(model, config).run(&job, events, cancel)
}
