use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use corner_watermark_restore::{
    default_output_path, is_supported_image, RestoreEngine, RestoreOptions, Strategy,
};

#[derive(Parser)]
#[command(
    name = "watermark-restore",
    about = "Recover original pixels beneath corner watermarks via inverse alpha compositing",
    version,
    after_help = "Simple usage: watermark-restore <image>  (rule-based position, writes {name}_restored.{ext})\n\n\
                  The mask directory must contain one bg_{size}.png capture per supported\n\
                  logo size (48, 96), as fetched by the mask downloader."
)]
struct Cli {
    /// Input image file
    input: String,

    /// Output file (default: {name}_restored.{ext})
    #[arg(short, long)]
    output: Option<String>,

    /// Directory holding the cached reference masks
    #[arg(short, long, default_value = "masks")]
    masks: PathBuf,

    /// Locate the watermark by brute-force template search instead of the
    /// deterministic rule
    #[arg(short, long)]
    search: bool,

    /// Search band in pixels from the bottom-right edges (used with --search)
    #[arg(long, default_value = "200")]
    margin: u32,

    /// Force the 48x48 mask regardless of image size
    #[arg(long)]
    force_small: bool,

    /// Force the 96x96 mask regardless of image size
    #[arg(long)]
    force_large: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();

    if cli.force_small && cli.force_large {
        eprintln!("Error: Cannot specify both --force-small and --force-large");
        process::exit(1);
    }

    let force_size = if cli.force_small {
        Some(48)
    } else if cli.force_large {
        Some(96)
    } else {
        None
    };

    let strategy = if cli.search {
        Strategy::SearchBased { margin: cli.margin }
    } else {
        Strategy::RuleBased
    };

    let opts = RestoreOptions {
        strategy,
        force_size,
    };

    let input_path = Path::new(&cli.input);
    if !input_path.is_file() {
        eprintln!("Error: Input is not a file: {}", cli.input);
        process::exit(1);
    }
    if !is_supported_image(input_path) {
        eprintln!("Error: Unsupported input format: {}", cli.input);
        process::exit(1);
    }

    let engine = match RestoreEngine::with_mask_dir(&cli.masks) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Fatal: Failed to load masks: {e}");
            process::exit(1);
        }
    };

    let output_path = match &cli.output {
        Some(o) => PathBuf::from(o),
        None => default_output_path(input_path),
    };

    match engine.restore_file(input_path, &output_path, &opts) {
        Ok(summary) => {
            if !cli.quiet {
                let filename = summary.path.file_name().map_or_else(
                    || summary.path.display().to_string(),
                    |f| f.to_string_lossy().to_string(),
                );
                let done = &summary.restoration;
                match done.score {
                    Some(score) => eprintln!(
                        "[OK] {filename}: {}px watermark at ({}, {}), match score {score:.4} -> {}",
                        done.mask_size,
                        done.region.x,
                        done.region.y,
                        output_path.display()
                    ),
                    None => eprintln!(
                        "[OK] {filename}: {}px watermark at ({}, {}) -> {}",
                        done.mask_size,
                        done.region.x,
                        done.region.y,
                        output_path.display()
                    ),
                }
            }
        }
        Err(e) => {
            eprintln!("[FAIL] {}: {e}", cli.input);
            process::exit(1);
        }
    }
}
