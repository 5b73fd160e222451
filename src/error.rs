//! Error types for the corner-watermark-restore crate.

/// Errors that can occur while locating and restoring a watermark.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input image could not be decoded.
    #[error("failed to decode input image: {0}")]
    Decode(image::ImageError),

    /// A reference mask is missing from the store or cache directory.
    #[error("no {size}x{size} reference mask available: {reason}")]
    MaskUnavailable {
        /// Mask size in pixels.
        size: u32,
        /// Why the mask could not be supplied.
        reason: String,
    },

    /// A mask image is not usable as a 3-channel RGB template.
    #[error("bad mask format: {0}")]
    Format(String),

    /// The deterministic rule places the watermark outside the image.
    #[error(
        "image too small ({width}x{height}) for {logo_size}x{logo_size} watermark with {margin}px margin"
    )]
    OutOfBounds {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Selected logo size in pixels.
        logo_size: u32,
        /// Corner margin in pixels.
        margin: u32,
    },

    /// The search strategy found no candidate mask that fits the image.
    #[error("no candidate mask fits inside image ({width}x{height})")]
    NotFound {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },

    /// The output path implies a format this crate cannot encode.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
