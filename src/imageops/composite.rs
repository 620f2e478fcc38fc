use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::config::BackgroundColor;
use crate::errors::Result;
use crate::imageops::{attach_alpha, dimension_mismatch, flatten_onto, paste_with_mask};
use crate::selection::SelectionRect;

/// The part of the original image the mask was predicted for.
#[derive(Debug, Clone, Copy)]
pub enum Cutout<'a> {
    Full,
    Region {
        image: &'a RgbImage,
        rect: SelectionRect,
    },
}

/// Combines the original image with its mask.
///
/// | cutout | background | result                                                  |
/// |--------|------------|---------------------------------------------------------|
/// | full   | none       | original with the mask as straight alpha (RGBA)         |
/// | full   | color      | original stencil-pasted onto a color canvas (RGB)       |
/// | region | none       | masked region pasted at its offset on a clear canvas    |
/// | region | color      | the previous result flattened onto a color canvas (RGB) |
pub fn composite(
    original: &RgbImage,
    cutout: Cutout<'_>,
    mask: &GrayImage,
    background: Option<BackgroundColor>,
) -> Result<DynamicImage> {
    let (width, height) = original.dimensions();

    match cutout {
        Cutout::Full => match background {
            None => Ok(DynamicImage::ImageRgba8(attach_alpha(original, mask)?)),
            Some(color) => {
                let mut canvas = RgbImage::from_pixel(width, height, color.to_rgb());
                paste_with_mask(&mut canvas, original, mask, 0, 0)?;
                Ok(DynamicImage::ImageRgb8(canvas))
            }
        },
        Cutout::Region { image, rect } => {
            if image.dimensions() != (rect.width(), rect.height()) {
                return Err(dimension_mismatch(
                    "paste cropped region",
                    (rect.width(), rect.height()),
                    image.dimensions(),
                ));
            }
            let region = attach_alpha(image, mask)?;
            let mut canvas = RgbaImage::new(width, height);
            paste_with_mask(&mut canvas, &region, mask, rect.x1, rect.y1)?;

            match background {
                None => Ok(DynamicImage::ImageRgba8(canvas)),
                Some(color) => Ok(DynamicImage::ImageRgb8(flatten_onto(
                    &canvas,
                    color.to_rgb(),
                )?)),
            }
        }
    }
}
