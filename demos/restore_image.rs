//! Restore the pixels beneath a corner watermark in a single image.
//!
//! Usage:
//! ```sh
//! cargo run --example restore_image -- masks/ input.png output.png
//! ```

use std::env;
use std::process;

use corner_watermark_restore::{RestoreEngine, RestoreOptions};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <mask_dir> <input> <output>", args[0]);
        process::exit(1);
    }

    let engine = match RestoreEngine::with_mask_dir(args[1].as_ref()) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let opts = RestoreOptions::default();
    match engine.restore_file(args[2].as_ref(), args[3].as_ref(), &opts) {
        Ok(summary) => {
            let done = &summary.restoration;
            println!(
                "Done: {}px watermark at ({}, {})",
                done.mask_size, done.region.x, done.region.y
            );
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
