use crate::errors::Result;
use image::{GrayImage, RgbImage};

/// Foreground matting model.
///
/// The batch pipeline only depends on this trait so that the ONNX session
/// can be swapped for a deterministic double in tests.
pub trait MattingModel: Send + Sync {
    /// Predicts a single-channel mask with the same dimensions as `image`.
    ///
    /// `0` marks background, `255` foreground, values in between are soft edges.
    fn predict_mask(&self, image: &RgbImage) -> Result<GrayImage>;

    /// Square input resolution the network runs at.
    fn input_size(&self) -> u32;
}

impl<M: MattingModel + ?Sized> MattingModel for Box<M> {
    fn predict_mask(&self, image: &RgbImage) -> Result<GrayImage> {
        (**self).predict_mask(image)
    }

    fn input_size(&self) -> u32 {
        (**self).input_size()
    }
}
