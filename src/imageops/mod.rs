mod composite;
pub mod mask;
pub mod paste;

pub use composite::{composite, Cutout};
pub use mask::{attach_alpha, invert_mask};
pub use paste::{flatten_onto, paste_with_mask};

use crate::errors::MagicMaskError;

/// Rounded division by 255, matching the integer blend used by common imaging libraries.
#[inline]
pub(crate) const fn div255(v: u32) -> u8 {
    let tmp = v + 128;
    (((tmp >> 8) + tmp) >> 8) as u8
}

pub(crate) fn dimension_mismatch(
    operation: &str,
    expected: (u32, u32),
    actual: (u32, u32),
) -> MagicMaskError {
    MagicMaskError::image_processing(
        "unknown",
        operation,
        format!(
            "image and mask sizes differ: image {}x{}, mask {}x{}",
            expected.0, expected.1, actual.0, actual.1
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::div255;

    #[test]
    fn test_div255_matches_exact_rounding() {
        for a in [0u32, 1, 17, 128, 200, 254, 255] {
            for b in [0u32, 1, 64, 127, 128, 255] {
                let v = a * b;
                let exact = (f64::from(v) / 255.0).round() as u8;
                assert_eq!(div255(v), exact, "{a} * {b}");
            }
        }
    }
}
