//! Interactive crop selection.
//!
//! A [`CropSelector`] fits an image into a square preview bound, follows a
//! press/drag/release gesture in preview (display) coordinates and maps the
//! released rectangle back into original-image pixels.

use std::path::{Path, PathBuf};

use image::{imageops::FilterType, DynamicImage};
use thiserror::Error;
use tracing::debug;

use crate::errors::{MagicMaskError, Result};

/// Default bound for the longest preview side.
pub const DEFAULT_PREVIEW_SIZE: u32 = 600;

/// Axis-aligned rectangle in original-image pixel space.
///
/// Always normalized: `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

/// Why a crop rectangle cannot be applied to a particular image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CropRejected {
    #[error("crop rectangle {0:?} has no area")]
    Empty(SelectionRect),

    #[error("crop rectangle {rect:?} exceeds image bounds {width}x{height}")]
    OutOfBounds {
        rect: SelectionRect,
        width: u32,
        height: u32,
    },
}

impl SelectionRect {
    /// Builds a rectangle from two arbitrary corners.
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Maps a display-space drag from `(a, b)` to `(c, d)` into original pixels.
    ///
    /// Each normalized edge is multiplied by `scale_factor` and rounded.
    /// Negative display coordinates clamp to the preview origin.
    pub fn from_display(a: f64, b: f64, c: f64, d: f64, scale_factor: f64) -> Self {
        let to_original = |v: f64| (v.max(0.0) * scale_factor).round() as u32;
        Self {
            x1: to_original(a.min(c)),
            y1: to_original(b.min(d)),
            x2: to_original(a.max(c)),
            y2: to_original(b.max(d)),
        }
    }

    pub const fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub const fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Checks that the rectangle has area and lies inside a `width` x `height` image.
    pub fn check_within(&self, width: u32, height: u32) -> std::result::Result<(), CropRejected> {
        if self.width() == 0 || self.height() == 0 {
            return Err(CropRejected::Empty(*self));
        }
        if self.x2 > width || self.y2 > height {
            return Err(CropRejected::OutOfBounds {
                rect: *self,
                width,
                height,
            });
        }
        Ok(())
    }
}

type SelectCallback = Box<dyn FnOnce(SelectionRect) + Send>;

/// Rubber-band rectangle selection over a scaled preview.
pub struct CropSelector {
    source: Option<PathBuf>,
    original_size: (u32, u32),
    display_size: (u32, u32),
    scale_factor: f64,
    drag_start: Option<(f64, f64)>,
    on_select: Option<SelectCallback>,
    finished: bool,
}

impl CropSelector {
    pub fn new(width: u32, height: u32, max_preview: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        // ratio = max / longest side, truncated per axis
        let longest = u64::from(width.max(height));
        let fit = |side: u32| {
            (u64::from(side) * u64::from(max_preview.max(1)) / longest).max(1) as u32
        };
        let (display_width, display_height) = (fit(width), fit(height));

        Self {
            source: None,
            original_size: (width, height),
            display_size: (display_width, display_height),
            scale_factor: f64::from(width) / f64::from(display_width),
            drag_start: None,
            on_select: None,
            finished: false,
        }
    }

    /// Prepares a selector for the image stored at `path`.
    pub fn open(path: &Path, max_preview: u32) -> Result<Self> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            MagicMaskError::image_processing(path.display().to_string(), "read dimensions", e)
        })?;
        let mut selector = Self::new(width, height, max_preview);
        selector.source = Some(path.to_path_buf());
        debug!(
            path = %path.display(),
            original = ?selector.original_size,
            display = ?selector.display_size,
            scale = selector.scale_factor,
            "Crop selector ready"
        );
        Ok(selector)
    }

    /// Registers the callback that receives the final selection.
    pub fn on_select(mut self, callback: impl FnOnce(SelectionRect) + Send + 'static) -> Self {
        self.on_select = Some(Box::new(callback));
        self
    }

    pub const fn original_size(&self) -> (u32, u32) {
        self.original_size
    }

    pub const fn display_size(&self) -> (u32, u32) {
        self.display_size
    }

    pub const fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Renders the scaled-down preview of the opened image.
    pub fn preview(&self) -> Result<DynamicImage> {
        let path = self
            .source
            .as_deref()
            .ok_or_else(|| MagicMaskError::configuration("crop selector has no source image"))?;
        let image = image::open(path).map_err(|e| {
            MagicMaskError::image_processing(path.display().to_string(), "load preview", e)
        })?;
        let (width, height) = self.display_size;
        Ok(image.resize_exact(width, height, FilterType::Triangle))
    }

    /// Starts a new drag, discarding any rectangle in progress.
    pub fn press(&mut self, x: f64, y: f64) {
        if !self.finished {
            self.drag_start = Some((x, y));
        }
    }

    /// Returns the live rectangle in display space as `(x1, y1, x2, y2)`.
    pub fn drag(&self, x: f64, y: f64) -> Option<(f64, f64, f64, f64)> {
        let (start_x, start_y) = self.drag_start.filter(|_| !self.finished)?;
        Some((start_x.min(x), start_y.min(y), start_x.max(x), start_y.max(y)))
    }

    /// Completes the drag and reports the selection in original pixels.
    ///
    /// Both corners are clamped to the preview, so a drag that overshoots an
    /// edge selects up to that edge.
    ///
    /// The callback fires here and only here; later gestures are ignored.
    pub fn release(&mut self, x: f64, y: f64) -> Option<SelectionRect> {
        if self.finished {
            return None;
        }
        let (start_x, start_y) = self.drag_start.take()?;
        let (width, height) = self.display_size;
        let clamp_x = |v: f64| v.clamp(0.0, f64::from(width));
        let clamp_y = |v: f64| v.clamp(0.0, f64::from(height));
        let rect = SelectionRect::from_display(
            clamp_x(start_x),
            clamp_y(start_y),
            clamp_x(x),
            clamp_y(y),
            self.scale_factor,
        );
        self.finished = true;

        debug!(?rect, "Crop area selected");
        if let Some(callback) = self.on_select.take() {
            callback(rect);
        }
        Some(rect)
    }

    /// Abandons the selection without reporting anything.
    pub fn cancel(&mut self) {
        self.drag_start = None;
        self.on_select = None;
        self.finished = true;
    }
}
