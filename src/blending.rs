//! Inverse alpha compositing.
//!
//! The watermark is modeled as a pure-white overlay composited onto the
//! original pixels: `watermarked = alpha * 255 + (1 - alpha) * original`.
//! This module inverts that formula to recover the original pixels.

use image::RgbaImage;

use crate::mask::AlphaMap;
use crate::position::Region;

/// Alpha threshold: ignore pixels with negligible watermark effect (noise).
const ALPHA_THRESHOLD: f32 = 0.002;

/// Maximum alpha: clamp to keep the denominator at least 0.01.
///
/// Where the overlay is nearly opaque the original pixel is almost gone;
/// the floor trades a bounded reconstruction error for numeric stability.
const MAX_ALPHA: f32 = 0.99;

/// Overlay fill value: the logo is rendered in pure white.
const LOGO_VALUE: f32 = 255.0;

/// Restore the original pixels inside `region` by inverting the composite.
///
/// Applies `original = (watermarked - alpha * 255) / max(1 - alpha, 0.01)`
/// per RGB channel, clamped to `[0, 255]` before the `u8` conversion. The
/// alpha channel of the image and every pixel outside `region` are left
/// untouched. The region is clipped to the image bounds.
pub fn restore_region(image: &mut RgbaImage, region: &Region, alpha_map: &AlphaMap) {
    let img_w = image.width();
    let img_h = image.height();

    // Clip to image bounds
    let x2 = (region.x + region.width).min(img_w);
    let y2 = (region.y + region.height).min(img_h);

    if region.x >= x2 || region.y >= y2 {
        return;
    }

    for dy in 0..(y2 - region.y) {
        for dx in 0..(x2 - region.x) {
            let mut alpha = alpha_map.value(dx, dy);

            // Skip pixels with negligible watermark effect
            if alpha < ALPHA_THRESHOLD {
                continue;
            }

            alpha = alpha.min(MAX_ALPHA);
            let inv_alpha = 1.0 - alpha;

            let px = image.get_pixel_mut(region.x + dx, region.y + dy);
            for ch in 0..3 {
                let watermarked = f32::from(px[ch]);
                let original = (watermarked - alpha * LOGO_VALUE) / inv_alpha;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    px[ch] = original.clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
}

/// Composite a pure-white overlay onto `image` inside `region`.
///
/// The forward counterpart of [`restore_region`], used to validate the
/// round trip in tests and the demo.
pub fn composite_region(image: &mut RgbaImage, region: &Region, alpha_map: &AlphaMap) {
    let x2 = (region.x + region.width).min(image.width());
    let y2 = (region.y + region.height).min(image.height());

    if region.x >= x2 || region.y >= y2 {
        return;
    }

    for dy in 0..(y2 - region.y) {
        for dx in 0..(x2 - region.x) {
            let alpha = alpha_map.value(dx, dy);
            if alpha < ALPHA_THRESHOLD {
                continue;
            }

            let px = image.get_pixel_mut(region.x + dx, region.y + dy);
            for ch in 0..3 {
                let original = f32::from(px[ch]);
                let blended = alpha * LOGO_VALUE + (1.0 - alpha) * original;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    px[ch] = blended.clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{AlphaMap, Mask};
    use image::{Rgb, RgbImage, Rgba};

    fn ramp_alpha(size: u32) -> AlphaMap {
        // Brightness ramp up to 50% opacity.
        let img = RgbImage::from_fn(size, size, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = ((x + y * size) * 128 / (size * size)) as u8;
            Rgb([v, v, v])
        });
        AlphaMap::from_mask(&Mask::from_image(img).unwrap())
    }

    #[test]
    fn reverse_blend_recovers_original_within_tolerance() {
        let mut img = RgbaImage::from_pixel(100, 100, Rgba([128, 64, 200, 255]));
        let reference = img.clone();

        let region = Region::new(50, 50, 10, 10);
        let alpha_map = ramp_alpha(10);

        composite_region(&mut img, &region, &alpha_map);
        restore_region(&mut img, &region, &alpha_map);

        // +/- 2 due to double u8 rounding
        for dy in 0..10 {
            for dx in 0..10 {
                let restored = img.get_pixel(50 + dx, 50 + dy);
                let orig = reference.get_pixel(50 + dx, 50 + dy);
                for ch in 0..3 {
                    let diff = (i32::from(restored[ch]) - i32::from(orig[ch])).abs();
                    assert!(
                        diff <= 2,
                        "pixel ({dx},{dy}) ch {ch} diff {diff} (restored={}, orig={})",
                        restored[ch],
                        orig[ch]
                    );
                }
            }
        }
    }

    #[test]
    fn restore_leaves_pixels_outside_region_untouched() {
        let mut img = RgbaImage::from_fn(60, 60, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = ((x * 7 + y * 13) % 256) as u8;
            Rgba([v, v / 2, v / 3, 255])
        });
        let reference = img.clone();

        let region = Region::new(20, 20, 16, 16);
        let white = RgbImage::from_pixel(16, 16, Rgb([255, 255, 255]));
        let alpha_map = AlphaMap::from_mask(&Mask::from_image(white).unwrap());

        restore_region(&mut img, &region, &alpha_map);

        for (x, y, px) in img.enumerate_pixels() {
            let inside =
                x >= region.x && x < region.x + 16 && y >= region.y && y < region.y + 16;
            if !inside {
                assert_eq!(px, reference.get_pixel(x, y), "pixel ({x},{y}) changed");
            }
        }
    }

    #[test]
    fn restore_preserves_alpha_channel() {
        let mut img = RgbaImage::from_pixel(40, 40, Rgba([177, 177, 177, 93]));
        let region = Region::new(0, 0, 40, 40);
        let gray = RgbImage::from_pixel(40, 40, Rgb([128, 128, 128]));
        let alpha_map = AlphaMap::from_mask(&Mask::from_image(gray).unwrap());

        restore_region(&mut img, &region, &alpha_map);

        for px in img.pixels() {
            assert_eq!(px[3], 93);
        }
    }

    #[test]
    fn half_alpha_over_gray_restores_gray() {
        // watermarked = 100 * 0.5 + 255 * 0.5 = 177.5
        let mut img = RgbaImage::from_pixel(48, 48, Rgba([100, 100, 100, 255]));
        let region = Region::new(0, 0, 48, 48);
        let half = RgbImage::from_pixel(48, 48, Rgb([128, 128, 128]));
        let alpha_map = AlphaMap::from_mask(&Mask::from_image(half).unwrap());

        composite_region(&mut img, &region, &alpha_map);
        restore_region(&mut img, &region, &alpha_map);

        for px in img.pixels() {
            for ch in 0..3 {
                let diff = (i32::from(px[ch]) - 100).abs();
                assert!(diff <= 2, "channel {ch} is {}", px[ch]);
            }
        }
    }

    #[test]
    fn near_opaque_alpha_clamps_instead_of_blowing_up() {
        // alpha clamps to 0.99, so (250 - 252.45) / 0.01 clamps to 0.
        let mut img = RgbaImage::from_pixel(8, 8, Rgba([250, 250, 250, 255]));
        let region = Region::new(0, 0, 8, 8);
        let white = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        let alpha_map = AlphaMap::from_mask(&Mask::from_image(white).unwrap());

        restore_region(&mut img, &region, &alpha_map);

        for px in img.pixels() {
            for ch in 0..3 {
                assert_eq!(px[ch], 0);
            }
        }
    }

    #[test]
    fn region_clipped_to_image_bounds_does_not_panic() {
        let mut img = RgbaImage::from_pixel(30, 30, Rgba([200, 200, 200, 255]));
        let region = Region::new(20, 20, 16, 16);
        let gray = RgbImage::from_pixel(16, 16, Rgb([64, 64, 64]));
        let alpha_map = AlphaMap::from_mask(&Mask::from_image(gray).unwrap());

        restore_region(&mut img, &region, &alpha_map);
    }
}
