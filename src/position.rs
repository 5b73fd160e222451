//! Locate the watermark region inside an image.
//!
//! Two strategies are supported: a deterministic size/margin rule keyed on
//! the image dimensions, and a brute-force template search over the
//! bottom-right corner that minimizes the mean absolute difference between
//! the image patch and a candidate mask.

use image::{RgbImage, RgbaImage};

use crate::error::{Error, Result};
use crate::mask::{MaskEntry, MaskStore};

/// Default search band, in pixels from the bottom-right edges.
pub const DEFAULT_SEARCH_MARGIN: u32 = 200;

/// A rectangle inside an image, equal in size to the chosen mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Left edge, in pixels.
    pub x: u32,
    /// Top edge, in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Region {
    /// Create a region from its top-left corner and extent.
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the region lies entirely inside an image of the given size.
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x + self.width <= width && self.y + self.height <= height
    }
}

/// How the watermark position is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Deterministic size/margin rule keyed on the image dimensions.
    RuleBased,
    /// Brute-force template search over the bottom-right corner band.
    SearchBased {
        /// Search band in pixels from the bottom-right edges.
        margin: u32,
    },
}

impl Default for Strategy {
    fn default() -> Self {
        Self::RuleBased
    }
}

impl Strategy {
    /// Search strategy with the default margin band.
    #[must_use]
    pub fn search() -> Self {
        Self::SearchBased {
            margin: DEFAULT_SEARCH_MARGIN,
        }
    }
}

/// A resolved watermark placement: the region plus the mask it matched.
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    /// Where the watermark sits in the image.
    pub region: Region,
    /// The mask and opacity map for that region.
    pub entry: &'a MaskEntry,
    /// Mean absolute difference at the chosen offset (search strategy only).
    pub score: Option<f64>,
}

/// Resolve the watermark placement for an image.
///
/// `force_size` restricts both strategies to one mask size, overriding the
/// rule's dimension-based choice.
///
/// # Errors
///
/// Returns [`Error::OutOfBounds`] when the deterministic rule underflows,
/// [`Error::NotFound`] when no candidate mask fits the image, and
/// [`Error::MaskUnavailable`] when the store lacks the required size.
pub fn resolve<'a>(
    image: &RgbaImage,
    store: &'a MaskStore,
    strategy: Strategy,
    force_size: Option<u32>,
) -> Result<Placement<'a>> {
    match strategy {
        Strategy::RuleBased => resolve_rule(image, store, force_size),
        Strategy::SearchBased { margin } => resolve_search(image, store, margin, force_size),
    }
}

/// Logo size and corner margin for given image dimensions.
///
/// Large images (both dimensions strictly above 1024) carry the 96px logo
/// with a 64px margin; everything else gets 48px with a 32px margin.
#[must_use]
pub fn rule_config(width: u32, height: u32) -> (u32, u32) {
    if width > 1024 && height > 1024 {
        (96, 64)
    } else {
        (48, 32)
    }
}

// Margin scales with the logo: 32px for the 48 logo, 64px for the 96.
fn margin_for(logo_size: u32) -> u32 {
    logo_size * 2 / 3
}

fn resolve_rule<'a>(
    image: &RgbaImage,
    store: &'a MaskStore,
    force_size: Option<u32>,
) -> Result<Placement<'a>> {
    let (width, height) = image.dimensions();
    let (logo_size, margin) = match force_size {
        Some(size) => (size, margin_for(size)),
        None => rule_config(width, height),
    };

    let entry = store.get(logo_size).ok_or_else(|| Error::MaskUnavailable {
        size: logo_size,
        reason: "not loaded in mask store".to_string(),
    })?;

    let oob = || Error::OutOfBounds {
        width,
        height,
        logo_size,
        margin,
    };
    let x = width.checked_sub(margin + logo_size).ok_or_else(oob)?;
    let y = height.checked_sub(margin + logo_size).ok_or_else(oob)?;

    Ok(Placement {
        region: Region::new(x, y, logo_size, logo_size),
        entry,
        score: None,
    })
}

fn resolve_search<'a>(
    image: &RgbaImage,
    store: &'a MaskStore,
    margin: u32,
    force_size: Option<u32>,
) -> Result<Placement<'a>> {
    let (width, height) = image.dimensions();
    let mut best: Option<(f64, Region, &MaskEntry)> = None;

    // Ascending size order; ties keep the first candidate found.
    for entry in store.entries() {
        let size = entry.mask.size();
        if force_size.is_some_and(|s| s != size) {
            continue;
        }
        if size > width || size > height {
            continue;
        }

        let x_max = width - size;
        let y_max = height - size;
        let x_min = x_max.saturating_sub(margin);
        let y_min = y_max.saturating_sub(margin);

        let (score, x, y) = best_offset(image, entry.mask.pixels(), x_min, x_max, y_min, y_max);
        log::debug!("{size}px mask: score {score:.4} at ({x}, {y})");

        if best.as_ref().map_or(true, |(b, _, _)| score < *b) {
            best = Some((score, Region::new(x, y, size, size), entry));
        }
    }

    best.map_or(Err(Error::NotFound { width, height }), |(score, region, entry)| {
        Ok(Placement {
            region,
            entry,
            score: Some(score),
        })
    })
}

/// Scan the `[x_min, x_max] x [y_min, y_max]` offsets (inclusive) and return
/// `(score, x, y)` for the lowest-scoring one, ties resolved to smaller `y`
/// then smaller `x`.
///
/// Rows are scored in parallel when the `cli` feature is enabled (via rayon);
/// the reduction orders candidates by `(score, y, x)`, so both paths return
/// the same offset.
fn best_offset(
    image: &RgbaImage,
    mask: &RgbImage,
    x_min: u32,
    x_max: u32,
    y_min: u32,
    y_max: u32,
) -> (f64, u32, u32) {
    let scan_row = |y: u32| -> (f64, u32, u32) {
        let mut row_best = (f64::INFINITY, u32::MAX);
        for x in x_min..=x_max {
            let score = patch_mad(image, mask, x, y);
            if score < row_best.0 {
                row_best = (score, x);
            }
        }
        (row_best.0, y, row_best.1)
    };

    let pick = |a: (f64, u32, u32), b: (f64, u32, u32)| -> (f64, u32, u32) {
        if (b.0, b.1, b.2) < (a.0, a.1, a.2) {
            b
        } else {
            a
        }
    };

    #[cfg(feature = "cli")]
    {
        use rayon::prelude::*;
        (y_min..=y_max)
            .into_par_iter()
            .map(scan_row)
            .reduce(|| (f64::INFINITY, u32::MAX, u32::MAX), pick)
    }

    #[cfg(not(feature = "cli"))]
    {
        (y_min..=y_max)
            .map(scan_row)
            .fold((f64::INFINITY, u32::MAX, u32::MAX), pick)
    }
}

/// Mean absolute difference between the image patch at `(x, y)` and the mask,
/// over the RGB channels.
fn patch_mad(image: &RgbaImage, mask: &RgbImage, x: u32, y: u32) -> f64 {
    let mut sum = 0.0_f64;
    for dy in 0..mask.height() {
        for dx in 0..mask.width() {
            let ip = image.get_pixel(x + dx, y + dy);
            let mp = mask.get_pixel(dx, dy);
            for ch in 0..3 {
                sum += (f64::from(ip[ch]) - f64::from(mp[ch])).abs();
            }
        }
    }
    sum / f64::from(mask.width() * mask.height() * 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::Mask;
    use image::{Rgb, Rgba};

    fn store_with_flat_masks(value: u8) -> MaskStore {
        let mut store = MaskStore::new();
        for size in [48u32, 96] {
            let img = RgbImage::from_pixel(size, size, Rgb([value, value, value]));
            store.insert(Mask::from_image(img).unwrap());
        }
        store
    }

    fn gradient_mask(size: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = ((x * 5 + y * 3) % 256) as u8;
            Rgb([v, v / 2, 255 - v])
        })
    }

    #[test]
    fn rule_selects_large_logo_for_2000_square() {
        let store = store_with_flat_masks(128);
        let img = RgbaImage::new(2000, 2000);
        let placement = resolve(&img, &store, Strategy::RuleBased, None).unwrap();
        assert_eq!(placement.region, Region::new(1840, 1840, 96, 96));
        assert_eq!(placement.entry.mask.size(), 96);
        assert!(placement.score.is_none());
    }

    #[test]
    fn rule_selects_small_logo_at_1024_boundary() {
        // 1024 is not strictly greater than 1024, so the 48px rule applies.
        let store = store_with_flat_masks(128);
        let img = RgbaImage::new(1024, 1024);
        let placement = resolve(&img, &store, Strategy::RuleBased, None).unwrap();
        assert_eq!(placement.region, Region::new(944, 944, 48, 48));
    }

    #[test]
    fn rule_selects_large_logo_just_past_boundary() {
        let store = store_with_flat_masks(128);
        let img = RgbaImage::new(1025, 1025);
        let placement = resolve(&img, &store, Strategy::RuleBased, None).unwrap();
        assert_eq!(placement.region, Region::new(865, 865, 96, 96));
    }

    #[test]
    fn rule_region_stays_in_bounds() {
        let store = store_with_flat_masks(128);
        for (w, h) in [(81, 81), (200, 90), (1024, 4096), (3000, 1300)] {
            let img = RgbaImage::new(w, h);
            let placement = resolve(&img, &store, Strategy::RuleBased, None).unwrap();
            assert!(
                placement.region.fits_within(w, h),
                "region {:?} escapes {w}x{h}",
                placement.region
            );
        }
    }

    #[test]
    fn rule_fails_out_of_bounds_for_tiny_image() {
        let store = store_with_flat_masks(128);
        let img = RgbaImage::new(50, 50);
        let err = resolve(&img, &store, Strategy::RuleBased, None).unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfBounds {
                width: 50,
                height: 50,
                logo_size: 48,
                margin: 32,
            }
        ));
    }

    #[test]
    fn rule_fails_when_mask_size_not_loaded() {
        let mut store = MaskStore::new();
        let img48 = RgbImage::from_pixel(48, 48, Rgb([10, 10, 10]));
        store.insert(Mask::from_image(img48).unwrap());

        let img = RgbaImage::new(2000, 2000);
        let err = resolve(&img, &store, Strategy::RuleBased, None).unwrap_err();
        assert!(matches!(err, Error::MaskUnavailable { size: 96, .. }));
    }

    #[test]
    fn force_size_overrides_rule_choice() {
        let store = store_with_flat_masks(128);
        let img = RgbaImage::new(2000, 2000);
        let placement = resolve(&img, &store, Strategy::RuleBased, Some(48)).unwrap();
        assert_eq!(placement.region, Region::new(1920, 1920, 48, 48));
    }

    #[test]
    fn search_finds_exact_paste_offset() {
        let mask_img = gradient_mask(48);
        let mut store = MaskStore::new();
        store.insert(Mask::from_image(mask_img.clone()).unwrap());

        let mut img = RgbaImage::from_pixel(400, 300, Rgba([200, 200, 200, 255]));
        let (px, py) = (330u32, 235u32);
        for dy in 0..48 {
            for dx in 0..48 {
                let mp = mask_img.get_pixel(dx, dy);
                img.put_pixel(px + dx, py + dy, Rgba([mp[0], mp[1], mp[2], 255]));
            }
        }

        let placement = resolve(
            &img,
            &store,
            Strategy::SearchBased { margin: 60 },
            None,
        )
        .unwrap();
        assert_eq!(placement.region, Region::new(px, py, 48, 48));
        assert!(placement.score.unwrap() < 1e-9);
    }

    #[test]
    fn search_ties_resolve_to_smaller_size_and_scan_order() {
        // Flat black masks on a flat black image score zero everywhere, so
        // the winner must be the first candidate: 48px at the scan origin.
        let store = store_with_flat_masks(0);
        let img = RgbaImage::from_pixel(300, 300, Rgba([0, 0, 0, 255]));
        let placement = resolve(
            &img,
            &store,
            Strategy::SearchBased { margin: 10 },
            None,
        )
        .unwrap();
        assert_eq!(placement.region, Region::new(242, 242, 48, 48));
        assert_eq!(placement.entry.mask.size(), 48);
    }

    #[test]
    fn search_fails_when_no_mask_fits() {
        let store = store_with_flat_masks(0);
        let img = RgbaImage::new(30, 30);
        let err = resolve(&img, &store, Strategy::search(), None).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                width: 30,
                height: 30
            }
        ));
    }

    #[test]
    fn search_clamps_band_to_image_bounds() {
        // Margin larger than the image: the band degenerates to the full
        // top-left range without underflow.
        let mask_img = gradient_mask(48);
        let mut store = MaskStore::new();
        store.insert(Mask::from_image(mask_img.clone()).unwrap());

        let mut img = RgbaImage::from_pixel(60, 60, Rgba([255, 255, 255, 255]));
        for dy in 0..48 {
            for dx in 0..48 {
                let mp = mask_img.get_pixel(dx, dy);
                img.put_pixel(3 + dx, 7 + dy, Rgba([mp[0], mp[1], mp[2], 255]));
            }
        }

        let placement = resolve(&img, &store, Strategy::search(), None).unwrap();
        assert_eq!(placement.region, Region::new(3, 7, 48, 48));
    }

    #[test]
    fn patch_mad_is_zero_on_identical_patch() {
        let mask_img = gradient_mask(16);
        let img = RgbaImage::from_fn(16, 16, |x, y| {
            let mp = mask_img.get_pixel(x, y);
            Rgba([mp[0], mp[1], mp[2], 255])
        });
        assert!(patch_mad(&img, &mask_img, 0, 0) < 1e-12);
    }

    #[test]
    fn patch_mad_of_opposite_extremes_is_255() {
        let mask_img = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        let img = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        let score = patch_mad(&img, &mask_img, 0, 0);
        assert!((score - 255.0).abs() < 1e-9);
    }
}
