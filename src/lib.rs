//! Recover original pixels beneath corner watermarks via inverse alpha
//! compositing.
//!
//! Generative-image services overlay a semi-transparent logo near the
//! bottom-right corner of their output. Given a reference mask of that logo,
//! this crate locates the watermark region (by a deterministic size/margin
//! rule or a brute-force template search) and inverts the alpha-compositing
//! formula to restore the pixels underneath.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use corner_watermark_restore::{RestoreEngine, RestoreOptions};
//!
//! let engine = RestoreEngine::with_mask_dir(Path::new("masks")).expect("masks missing");
//! let mut img = image::open("photo.png").unwrap().to_rgba8();
//! engine.restore(&mut img, &RestoreOptions::default()).expect("no watermark region");
//! img.save("photo_restored.png").unwrap();
//! ```
//!
//! # Position strategies
//!
//! The deterministic rule is fast and matches how the watermark is placed:
//! a 96px logo with a 64px margin on images larger than 1024 in both
//! dimensions, a 48px logo with a 32px margin otherwise. The search strategy
//! scans a bottom-right band for the offset minimizing the mean absolute
//! difference against each candidate mask, which also validates the rule.
//!
//! ```no_run
//! use std::path::Path;
//! use corner_watermark_restore::{RestoreEngine, RestoreOptions, Strategy};
//!
//! let engine = RestoreEngine::with_mask_dir(Path::new("masks")).unwrap();
//! let mut img = image::open("photo.png").unwrap().to_rgba8();
//! let opts = RestoreOptions { strategy: Strategy::search(), ..RestoreOptions::default() };
//! let done = engine.restore(&mut img, &opts).unwrap();
//! println!("matched {}px mask at ({}, {})", done.mask_size, done.region.x, done.region.y);
//! ```

#![deny(missing_docs)]

pub mod blending;
mod engine;
pub mod error;
pub mod mask;
pub mod position;

pub use engine::{
    default_output_path, is_supported_image, save_image, RestoreEngine, RestoreOptions,
    RestoreSummary, Restoration,
};
pub use error::{Error, Result};
pub use mask::{AlphaMap, Mask, MaskEntry, MaskStore, SUPPORTED_SIZES};
pub use position::{Placement, Region, Strategy, DEFAULT_SEARCH_MARGIN};
