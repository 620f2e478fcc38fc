use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::map::map_colors;

use crate::errors::Result;
use crate::imageops::dimension_mismatch;

/// Complements every mask value, swapping foreground and background.
pub fn invert_mask(mask: &GrayImage) -> GrayImage {
    map_colors(mask, |Luma([v])| Luma([u8::MAX - v]))
}

/// Uses `mask` as the straight (non-premultiplied) alpha channel of `image`.
pub fn attach_alpha(image: &RgbImage, mask: &GrayImage) -> Result<RgbaImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(dimension_mismatch(
            "attach alpha",
            image.dimensions(),
            mask.dimensions(),
        ));
    }

    let mut rgba = RgbaImage::new(image.width(), image.height());
    for ((out, &Rgb([r, g, b])), &Luma([a])) in
        rgba.pixels_mut().zip(image.pixels()).zip(mask.pixels())
    {
        *out = Rgba([r, g, b, a]);
    }
    Ok(rgba)
}

/// Splits the alpha channel out of an RGBA image.
pub fn alpha_channel(image: &RgbaImage) -> GrayImage {
    map_colors(image, |Rgba([_, _, _, a])| Luma([a]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x * 31 + y * 7) % 256) as u8]))
    }

    #[test]
    fn test_invert_twice_is_identity() {
        let mask = gradient(16, 9);
        assert_eq!(invert_mask(&invert_mask(&mask)), mask);
    }

    #[test]
    fn test_invert_complements() {
        let mask = GrayImage::from_raw(3, 1, vec![0, 100, 255]).unwrap();
        assert_eq!(invert_mask(&mask).into_raw(), vec![255, 155, 0]);
    }

    #[test]
    fn test_attach_alpha_keeps_color() {
        let image = RgbImage::from_pixel(4, 2, Rgb([10, 20, 30]));
        let mask = gradient(4, 2);
        let rgba = attach_alpha(&image, &mask).unwrap();

        for (x, y, pixel) in rgba.enumerate_pixels() {
            assert_eq!(*pixel, Rgba([10, 20, 30, mask.get_pixel(x, y)[0]]));
        }
        assert_eq!(alpha_channel(&rgba), mask);
    }

    #[test]
    fn test_attach_alpha_rejects_size_mismatch() {
        let image = RgbImage::new(4, 4);
        let mask = GrayImage::new(4, 3);
        assert!(attach_alpha(&image, &mask).is_err());
    }
}
