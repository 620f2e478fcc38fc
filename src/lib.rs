pub mod batch;
pub mod config;
pub mod controller;
pub mod errors;
pub mod events;
pub mod image_processor;
pub mod imageops;
pub mod model;
pub mod progress_tracker;
pub mod selection;
pub mod tracing_config;
pub mod traits;

pub mod mocks;

pub use batch::{collect_input_files, is_supported_image_format, BatchJob, BatchRequest};
pub use config::{BackgroundColor, Config, ModelVariant, ProcessingConfig};
pub use controller::{BatchController, BatchHandle, WorkerState};
pub use errors::{MagicMaskError, Result};
pub use events::{Eta, ProgressEvent};
pub use image_processor::{BatchOutcome, ImageProcessor};
pub use model::OnnxMattingModel;
pub use selection::{CropSelector, SelectionRect};
pub use traits::*;
