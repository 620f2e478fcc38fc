use image::{GrayImage, ImageBuffer, Luma, Pixel, Rgb, RgbImage, RgbaImage};

use crate::errors::Result;
use crate::imageops::{dimension_mismatch, div255};

/// Pastes `src` onto `canvas` at `(x, y)` using `mask` as a stencil.
///
/// Every channel of the canvas, alpha included, becomes
/// `(dst * (255 - m) + src * m) / 255`. This is not alpha compositing: an
/// RGBA canvas ends up with `alpha = a * m / 255` where `a` was its previous
/// alpha. Parts of `src` that fall outside the canvas are skipped.
pub fn paste_with_mask<P>(
    canvas: &mut ImageBuffer<P, Vec<u8>>,
    src: &ImageBuffer<P, Vec<u8>>,
    mask: &GrayImage,
    x: u32,
    y: u32,
) -> Result<()>
where
    P: Pixel<Subpixel = u8>,
{
    if src.dimensions() != mask.dimensions() {
        return Err(dimension_mismatch(
            "paste with mask",
            src.dimensions(),
            mask.dimensions(),
        ));
    }

    let (canvas_width, canvas_height) = canvas.dimensions();
    for (sx, sy, pixel) in src.enumerate_pixels() {
        let (cx, cy) = (x + sx, y + sy);
        if cx >= canvas_width || cy >= canvas_height {
            continue;
        }
        let Luma([m]) = *mask.get_pixel(sx, sy);
        let m = u32::from(m);
        let target = canvas.get_pixel_mut(cx, cy);
        for (dst, &value) in target.channels_mut().iter_mut().zip(pixel.channels()) {
            *dst = div255(u32::from(*dst) * (255 - m) + u32::from(value) * m);
        }
    }
    Ok(())
}

/// Flattens an RGBA image onto a solid color canvas using its own alpha as
/// the paste stencil.
pub fn flatten_onto(image: &RgbaImage, color: Rgb<u8>) -> Result<RgbImage> {
    let (width, height) = image.dimensions();
    let mut canvas = RgbImage::from_pixel(width, height, color);
    let rgb = RgbImage::from_fn(width, height, |x, y| image.get_pixel(x, y).to_rgb());
    let alpha = super::mask::alpha_channel(image);
    paste_with_mask(&mut canvas, &rgb, &alpha, 0, 0)?;
    Ok(canvas)
}
