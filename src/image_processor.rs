use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use image::{imageops, ImageFormat, RgbImage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::batch::{output_path_for, BatchJob};
use crate::config::ProcessingConfig;
use crate::errors::{MagicMaskError, Result};
use crate::events::{EtaEstimator, ProgressEvent};
use crate::imageops::{composite, invert_mask, Cutout};
use crate::selection::{CropRejected, SelectionRect};
use crate::traits::MattingModel;

/// How a run ended when no file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed { processed: usize },
    Cancelled { processed: usize },
}

/// Runs the load → crop → mask → composite → save pipeline.
pub struct ImageProcessor<M: MattingModel> {
    model: M,
    config: ProcessingConfig,
}

impl<M: MattingModel> ImageProcessor<M> {
    pub const fn new(model: M, config: ProcessingConfig) -> Self {
        Self { model, config }
    }

    pub const fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Processes every file of `job` in order.
    ///
    /// The first failing file aborts the run; files saved before it stay on
    /// disk. `cancel` is checked between files. Progress goes to `events`;
    /// a disconnected receiver does not stop the run.
    pub fn run(
        &self,
        job: &BatchJob,
        events: &Sender<ProgressEvent>,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome> {
        job.ensure_output_dir()?;

        let total = job.total();
        let eta = EtaEstimator::start();

        for (completed, input) in job.files.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(processed = completed, total, "Batch cancelled");
                return Ok(BatchOutcome::Cancelled {
                    processed: completed,
                });
            }

            let index = completed + 1;
            let _ = events.send(ProgressEvent::Progress {
                index,
                total,
                eta: eta.estimate(completed, total),
            });

            let path = self.process_single_image(input, &job.output_dir)?;
            let _ = events.send(ProgressEvent::Saved { index, total, path });
        }

        info!(processed = total, "Batch complete");
        Ok(BatchOutcome::Completed { processed: total })
    }

    /// Processes one image and returns where the result was written.
    pub fn process_single_image(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        let input_name = input.display().to_string();
        let original = image::open(input)
            .map_err(|e| MagicMaskError::image_processing(&input_name, "load image", e))?
            .into_rgb8();

        let region = self
            .config
            .crop
            .and_then(|rect| match crop_region(&original, rect) {
                Ok(image) => Some((image, rect)),
                Err(reason) => {
                    warn!(file = %input_name, %reason, "Crop fallback, processing full image");
                    None
                }
            });
        let working = region.as_ref().map_or(&original, |(image, _)| image);

        let mask = self.model.predict_mask(working)?;
        if mask.dimensions() != working.dimensions() {
            return Err(MagicMaskError::image_processing(
                &input_name,
                "predict mask",
                format!(
                    "mask is {}x{} but image is {}x{}",
                    mask.width(),
                    mask.height(),
                    working.width(),
                    working.height()
                ),
            ));
        }
        let mask = if self.config.invert_mask {
            invert_mask(&mask)
        } else {
            mask
        };

        let cutout = match &region {
            Some((image, rect)) => Cutout::Region {
                image,
                rect: *rect,
            },
            None => Cutout::Full,
        };
        let result = composite(&original, cutout, &mask, self.config.background)
            .map_err(|e| MagicMaskError::image_processing(&input_name, "composite", e))?;

        let output_file = output_path_for(input, output_dir)?;
        result
            .save_with_format(&output_file, ImageFormat::Png)
            .map_err(|e| {
                MagicMaskError::image_processing(
                    output_file.display().to_string(),
                    "save image",
                    e,
                )
            })?;

        debug!(input = %input_name, output = %output_file.display(), "Saved");
        Ok(output_file)
    }
}

fn crop_region(image: &RgbImage, rect: SelectionRect) -> std::result::Result<RgbImage, CropRejected> {
    rect.check_within(image.width(), image.height())?;
    Ok(imageops::crop_imm(image, rect.x1, rect.y1, rect.width(), rect.height()).to_image())
}
