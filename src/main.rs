use anyhow::{bail, ensure, Context, Result};
use indicatif::ProgressBar;
use tracing::{info, warn};

use magic_mask::{
    config::parse_display_box, progress_tracker::ProgressTracker, tracing_config,
    BatchController, BatchRequest, Config, CropSelector, OnnxMattingModel, ProgressEvent,
};

fn main() -> Result<()> {
    let config = Config::new();
    let progress_bar = ProgressBar::new(0);
    tracing_config::init(config.verbose, progress_bar.clone())?;

    ensure!(config.input.exists(), "Input path does not exist");

    if let Some(preview_path) = &config.write_preview {
        let selector = single_file_selector(&config)?;
        selector
            .preview()?
            .save(preview_path)
            .with_context(|| format!("Failed to save preview: {}", preview_path.display()))?;
        let (width, height) = selector.display_size();
        info!(
            path = %preview_path.display(),
            width,
            height,
            "Preview written; pass a box on it with --display-crop"
        );
        return Ok(());
    }

    let mut processing = config.processing_config();
    if let Some(display_box) = config.display_crop.as_deref() {
        match parse_display_box(display_box) {
            Some([a, b, c, d]) => {
                let mut selector = single_file_selector(&config)?;
                selector.press(a, b);
                processing.crop = selector.release(c, d);
            }
            None => warn!(crop = display_box, "Ignoring malformed display crop box"),
        }
    }

    let request = BatchRequest::new(&config.input, config.output_dir(), processing);
    let model_dir = config.model_dir.clone();
    let device_id = config.device_id;

    let controller = BatchController::new();
    let Some(handle) = controller.start(request, move |variant| {
        OnnxMattingModel::load(&model_dir, variant, device_id)
    })?
    else {
        bail!("A batch is already running");
    };

    let tracker = ProgressTracker::with_bar(progress_bar);
    let terminal = tracker.follow(handle.events());
    handle.join()?;

    match terminal {
        Some(ProgressEvent::Completed { processed }) => {
            info!(processed, "Processed {processed} images");
            Ok(())
        }
        Some(ProgressEvent::Failed { message }) => bail!(message),
        Some(event) => {
            info!("{}", event.status_line());
            Ok(())
        }
        None => bail!("Worker stopped without reporting a result"),
    }
}

fn single_file_selector(config: &Config) -> Result<CropSelector> {
    ensure!(
        config.input.is_file(),
        "Please select a single image file to use the crop selector"
    );
    Ok(CropSelector::open(&config.input, config.preview_size)?)
}
