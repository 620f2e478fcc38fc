use std::error::Error as StdError;
use std::path::PathBuf;
use thiserror::Error;

type BoxedError = Box<dyn StdError + Send + Sync>;

/// Structured error types for the background removal pipeline.
///
/// Each variant carries the context of its failure domain so callers can
/// report a useful message without parsing strings. Anything returned from
/// the per-file pipeline is fatal to the batch; crop problems never reach
/// this type (see [`crate::selection::CropRejected`]).
#[derive(Error, Debug)]
pub enum MagicMaskError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("No valid images found in {path:?}")]
    NoInput { path: PathBuf },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: BoxedError,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: BoxedError,
    },

    #[error("Worker error: {message}")]
    Worker { message: String },
}

pub type Result<T> = std::result::Result<T, MagicMaskError>;

impl MagicMaskError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn image_processing(
        path: impl Into<String>,
        operation: impl Into<String>,
        source: impl Into<BoxedError>,
    ) -> Self {
        Self::ImageProcessing {
            path: path.into(),
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn model(operation: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::Model {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Renders the error followed by every source in its chain, separated by `": "`.
    ///
    /// This is the message surfaced to the user when a batch fails.
    pub fn report(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Code that knows the path and operation should construct
/// [`MagicMaskError::FileSystem`] directly instead.
impl From<std::io::Error> for MagicMaskError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for MagicMaskError {
    fn from(err: image::ImageError) -> Self {
        Self::image_processing("unknown", "image processing", err)
    }
}

impl From<ort::Error> for MagicMaskError {
    fn from(err: ort::Error) -> Self {
        Self::model("ort operation", err)
    }
}

/// Shape errors come from tensor handling around inference, so they are
/// reported as model errors.
impl From<ndarray::ShapeError> for MagicMaskError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::model("tensor shape conversion", err)
    }
}
