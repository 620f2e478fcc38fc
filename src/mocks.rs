use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::{MagicMaskError, Result};
use crate::traits::MattingModel;
use image::{buffer::ConvertBuffer, GrayImage, Luma, RgbImage};

/// Deterministic mask generators for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskPattern {
    /// Every pixel has the same value.
    Constant(u8),
    /// Rises from 0 on the left edge to 255 on the right edge.
    HorizontalGradient,
    /// The luminance of the input image.
    Luminance,
}

/// Mock matting model that renders a fixed [`MaskPattern`].
#[derive(Debug)]
pub struct MockMattingModel {
    pub pattern: MaskPattern,
    calls: AtomicUsize,
}

impl MockMattingModel {
    pub const fn new(pattern: MaskPattern) -> Self {
        Self {
            pattern,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockMattingModel {
    fn default() -> Self {
        Self::new(MaskPattern::Luminance)
    }
}

impl MattingModel for MockMattingModel {
    fn predict_mask(&self, image: &RgbImage) -> Result<GrayImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(render_mask(self.pattern, image))
    }

    fn input_size(&self) -> u32 {
        384
    }
}

/// Produces the mask `pattern` describes for `image`.
pub fn render_mask(pattern: MaskPattern, image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    match pattern {
        MaskPattern::Constant(value) => GrayImage::from_pixel(width, height, Luma([value])),
        MaskPattern::HorizontalGradient => {
            let span = width.saturating_sub(1).max(1);
            GrayImage::from_fn(width, height, |x, _| Luma([(x * 255 / span) as u8]))
        }
        MaskPattern::Luminance => image.convert(),
    }
}

/// Model that succeeds until its `fail_on`-th call (1-based), then errors.
#[derive(Debug)]
pub struct FailingModel {
    pub fail_on: usize,
    calls: AtomicUsize,
}

impl FailingModel {
    pub const fn new(fail_on: usize) -> Self {
        Self {
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }
}

impl MattingModel for FailingModel {
    fn predict_mask(&self, image: &RgbImage) -> Result<GrayImage> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(MagicMaskError::model(
                "inference",
                format!("simulated failure on call {call}"),
            ));
        }
        Ok(render_mask(MaskPattern::Constant(255), image))
    }

    fn input_size(&self) -> u32 {
        384
    }
}
