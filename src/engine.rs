//! Core restoration engine.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::blending;
use crate::error::{Error, Result};
use crate::mask::MaskStore;
use crate::position::{self, Placement, Region, Strategy};

/// Options controlling how the watermark region is located.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Position strategy: deterministic rule or brute-force search.
    pub strategy: Strategy,
    /// Force a specific mask size instead of letting the strategy choose.
    pub force_size: Option<u32>,
}

/// What a successful restoration did.
#[derive(Debug, Clone)]
pub struct Restoration {
    /// Region that was rewritten.
    pub region: Region,
    /// Size of the mask that matched.
    pub mask_size: u32,
    /// Search score at the chosen offset, if the search strategy ran.
    pub score: Option<f64>,
}

/// [`Restoration`] plus the file the engine processed.
#[derive(Debug, Clone)]
pub struct RestoreSummary {
    /// Path of the input file.
    pub path: PathBuf,
    /// What was done to it.
    pub restoration: Restoration,
}

/// The restoration engine holding the masks loaded for this run.
///
/// Create once with a populated [`MaskStore`] and reuse for multiple images.
#[derive(Debug)]
pub struct RestoreEngine {
    store: MaskStore,
}

impl RestoreEngine {
    /// Create an engine over an already-populated store.
    #[must_use]
    pub fn new(store: MaskStore) -> Self {
        Self { store }
    }

    /// Create an engine by loading the supported masks from a cache
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MaskUnavailable`] if a mask file is missing or
    /// unreadable, [`Error::Format`] if one decodes to the wrong geometry.
    pub fn with_mask_dir(dir: &Path) -> Result<Self> {
        Ok(Self::new(MaskStore::load_dir(dir)?))
    }

    /// The masks this engine resolves against.
    #[must_use]
    pub fn store(&self) -> &MaskStore {
        &self.store
    }

    /// Locate the watermark without modifying the image.
    ///
    /// # Errors
    ///
    /// Propagates the resolver errors: [`Error::OutOfBounds`],
    /// [`Error::NotFound`], [`Error::MaskUnavailable`].
    pub fn resolve(&self, image: &RgbaImage, opts: &RestoreOptions) -> Result<Placement<'_>> {
        position::resolve(image, &self.store, opts.strategy, opts.force_size)
    }

    /// Locate the watermark and restore the pixels beneath it in-place.
    ///
    /// # Errors
    ///
    /// Fails with the resolver errors; the image is untouched on failure.
    pub fn restore(&self, image: &mut RgbaImage, opts: &RestoreOptions) -> Result<Restoration> {
        let placement = self.resolve(image, opts)?;
        let region = placement.region;
        let mask_size = placement.entry.mask.size();
        let score = placement.score;

        log::debug!(
            "restoring {mask_size}px watermark at ({}, {})",
            region.x,
            region.y
        );
        blending::restore_region(image, &region, &placement.entry.alpha);

        Ok(Restoration {
            region,
            mask_size,
            score,
        })
    }

    /// Process a single image file: decode, restore, encode.
    ///
    /// The output format follows the output path's extension (the default
    /// output path keeps the input's). The output file is only created after
    /// restoration succeeded; on any error the destination is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for an unreadable input, the resolver
    /// errors for a failed placement, and [`Error::UnsupportedFormat`] or
    /// [`Error::Io`] for an unwritable output.
    pub fn restore_file(
        &self,
        input: &Path,
        output: &Path,
        opts: &RestoreOptions,
    ) -> Result<RestoreSummary> {
        let decoded = image::open(input).map_err(Error::Decode)?;
        let mut rgba = decoded.to_rgba8();

        let restoration = self.restore(&mut rgba, opts)?;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        save_image(&rgba, output)?;

        Ok(RestoreSummary {
            path: input.to_path_buf(),
            restoration,
        })
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Save an RGBA image with format-specific handling.
///
/// JPEG output is encoded at quality 100 and drops the alpha channel; the
/// other supported formats keep it.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(&rgb)?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            DynamicImage::ImageRgba8(img.clone()).save(path)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_restored.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_restored.{ext}"))
}
