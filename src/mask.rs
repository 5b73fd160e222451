//! Reference masks and their derived opacity maps.
//!
//! A mask is a capture of the watermark logo rendered over black; brightness
//! encodes how opaque the overlay is at each pixel. The opacity map is
//! derived as `alpha = max(R, G, B) / 255.0` per pixel.

use std::collections::BTreeMap;
use std::path::Path;

use image::RgbImage;

use crate::error::{Error, Result};

/// Mask sizes shipped by the watermark source: 48x48 and 96x96.
pub const SUPPORTED_SIZES: [u32; 2] = [48, 96];

/// A square RGB reference image of the watermark logo, identified by its
/// pixel size.
#[derive(Debug, Clone)]
pub struct Mask {
    pixels: RgbImage,
}

impl Mask {
    /// Wrap a decoded RGB image as a mask.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if the image is not square.
    pub fn from_image(pixels: RgbImage) -> Result<Self> {
        if pixels.width() != pixels.height() {
            return Err(Error::Format(format!(
                "mask must be square, got {}x{}",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self { pixels })
    }

    /// Decode a mask from encoded image bytes (typically PNG).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if the data cannot be decoded, carries an
    /// alpha channel, or is not square. Opacity must be encoded in the RGB
    /// brightness; a file with its own alpha channel is not the expected
    /// capture format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| Error::Format(format!("undecodable mask image: {e}")))?;
        if decoded.color().has_alpha() {
            return Err(Error::Format(format!(
                "mask must be 3-channel RGB, got {:?}",
                decoded.color()
            )));
        }
        Self::from_image(decoded.to_rgb8())
    }

    /// Mask side length in pixels.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.pixels.width()
    }

    /// The underlying RGB pixel grid.
    #[must_use]
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Per-pixel opacity values in `[0, 1]`, same dimensions as the source mask.
#[derive(Debug, Clone)]
pub struct AlphaMap {
    values: Vec<f32>,
    size: u32,
}

impl AlphaMap {
    /// Derive the opacity map from a mask: `alpha = max(R, G, B) / 255.0`.
    ///
    /// The brightest channel approximates the logo's coverage at that pixel
    /// regardless of tinting.
    #[must_use]
    pub fn from_mask(mask: &Mask) -> Self {
        let size = mask.size();
        let mut values = Vec::with_capacity((size * size) as usize);
        for pixel in mask.pixels().pixels() {
            let r = f32::from(pixel[0]);
            let g = f32::from(pixel[1]);
            let b = f32::from(pixel[2]);
            values.push(r.max(g).max(b) / 255.0);
        }
        Self { values, size }
    }

    /// Side length in pixels.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Opacity at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the map.
    #[must_use]
    pub fn value(&self, x: u32, y: u32) -> f32 {
        assert!(x < self.size && y < self.size, "alpha lookup out of range");
        self.values[(y * self.size + x) as usize]
    }

    /// Row-major opacity values, length `size * size`.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

/// A mask together with its derived opacity map.
#[derive(Debug, Clone)]
pub struct MaskEntry {
    /// The reference mask.
    pub mask: Mask,
    /// Opacity map derived from the mask.
    pub alpha: AlphaMap,
}

/// Loaded masks keyed by size, scoped to one run.
///
/// Keys are kept in a `BTreeMap` so iteration is deterministic, smallest
/// size first. Opacity maps are recomputed on insert; nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct MaskStore {
    entries: BTreeMap<u32, MaskEntry>,
}

impl MaskStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mask, replacing any previous mask of the same size.
    pub fn insert(&mut self, mask: Mask) {
        let alpha = AlphaMap::from_mask(&mask);
        self.entries.insert(mask.size(), MaskEntry { mask, alpha });
    }

    /// Decode a mask from encoded bytes and insert it. Returns the size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if the bytes are not a usable mask.
    pub fn insert_bytes(&mut self, bytes: &[u8]) -> Result<u32> {
        let mask = Mask::from_bytes(bytes)?;
        let size = mask.size();
        self.insert(mask);
        Ok(size)
    }

    /// Load the supported mask sizes from a local cache directory.
    ///
    /// Expects one `bg_{size}.png` file per supported size, as laid out by
    /// the mask downloader.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MaskUnavailable`] for a missing or unreadable file
    /// and [`Error::Format`] for a file that decodes to the wrong geometry.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut store = Self::new();
        for size in SUPPORTED_SIZES {
            let path = dir.join(format!("bg_{size}.png"));
            let bytes = std::fs::read(&path).map_err(|e| Error::MaskUnavailable {
                size,
                reason: format!("cannot read {}: {e}", path.display()),
            })?;
            let mask = Mask::from_bytes(&bytes)?;
            if mask.size() != size {
                return Err(Error::Format(format!(
                    "{} is {}x{}, expected {size}x{size}",
                    path.display(),
                    mask.size(),
                    mask.size()
                )));
            }
            log::debug!("loaded {size}px mask from {}", path.display());
            store.insert(mask);
        }
        Ok(store)
    }

    /// Look up the entry for a given mask size.
    #[must_use]
    pub fn get(&self, size: u32) -> Option<&MaskEntry> {
        self.entries.get(&size)
    }

    /// Loaded sizes in ascending order.
    pub fn sizes(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    /// Entries in ascending size order.
    pub fn entries(&self) -> impl Iterator<Item = &MaskEntry> {
        self.entries.values()
    }

    /// Whether the store holds no masks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
