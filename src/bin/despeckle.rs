//! despeckle CLI - clean speckle noise off scanned pages
//!
//! Thresholds any raster image to 1-bit, removes speckle noise while
//! keeping small marks that belong to nearby text, and writes the result.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use despeckle_oxide::{despeckle, BinaryImage, Dpi, Level, NeverCancelled};
use image::GrayImage;
use serde::Serialize;

/// Despeckle a scanned page image
///
/// Small isolated marks are removed; marks close to comparably sized or
/// larger neighbors are kept, so dots of "i", punctuation and broken
/// letter fragments survive.
///
/// Levels:
///   cautious    - keep anything remotely plausible
///   normal      - balanced cleaning (default)
///   aggressive  - remove everything not clearly attached to text
///   <number>    - continuous strength; 1, 2 and 3 match the presets
#[derive(Parser, Debug)]
#[command(name = "despeckle")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    despeckle scan.png clean.png
    despeckle --level aggressive scan.png clean.png
    despeckle --level 1.5 --dpi 600 scan.tif clean.png
    despeckle --json scan.png clean.png")]
struct Cli {
    /// Input image (any common raster format; thresholded at mid gray)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output image (written as PNG-compatible grayscale)
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Despeckling level: cautious, normal, aggressive, or a number
    #[arg(short, long, default_value = "normal", value_name = "LEVEL")]
    level: String,

    /// Scan resolution in dots per inch
    #[arg(long, default_value = "300", value_name = "DPI")]
    dpi: i32,

    /// Output statistics as JSON
    #[arg(long)]
    json: bool,

    /// Only report errors
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Serialize)]
struct Stats {
    width: usize,
    height: usize,
    foreground_before: usize,
    foreground_after: usize,
    removed: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match parse_level(&cli.level) {
        Ok(level) => level,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            return ExitCode::from(2);
        }
    };

    let page = match load_binary(&cli.input) {
        Ok(page) => page,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            return ExitCode::from(2);
        }
    };

    let before = page.count_foreground();
    let dpi = Dpi::new(cli.dpi, cli.dpi);
    let clean = match despeckle(&page, dpi, level, &NeverCancelled, None) {
        Ok(clean) => clean,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            return ExitCode::from(2);
        }
    };
    let after = clean.count_foreground();

    if let Err(err) = save_binary(&clean, &cli.output) {
        eprintln!("{} {err}", "error:".red().bold());
        return ExitCode::from(2);
    }

    let stats = Stats {
        width: page.width(),
        height: page.height(),
        foreground_before: before,
        foreground_after: after,
        removed: before - after,
    };

    if cli.json {
        match serde_json::to_string_pretty(&stats) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("{} {err}", "error:".red().bold());
                return ExitCode::from(2);
            }
        }
    } else if !cli.quiet {
        println!(
            "{} {}x{} px, {} ink pixels, {} removed ({:.2}%)",
            "done:".green().bold(),
            stats.width,
            stats.height,
            stats.foreground_before,
            stats.removed,
            if stats.foreground_before > 0 {
                stats.removed as f64 * 100.0 / stats.foreground_before as f64
            } else {
                0.0
            },
        );
    }

    ExitCode::SUCCESS
}

fn parse_level(text: &str) -> Result<Level, String> {
    match text.to_ascii_lowercase().as_str() {
        "cautious" => Ok(Level::Cautious),
        "normal" => Ok(Level::Normal),
        "aggressive" => Ok(Level::Aggressive),
        other => other
            .parse::<f64>()
            .map(Level::Custom)
            .map_err(|_| format!("unknown level '{text}'")),
    }
}

/// Loads a raster image and thresholds it: luma below mid gray is ink.
fn load_binary(path: &PathBuf) -> Result<BinaryImage, String> {
    let gray = image::open(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?
        .into_luma8();

    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(format!("{} is empty", path.display()));
    }

    let mut page = BinaryImage::new(width as usize, height as usize);
    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] < 128 {
            page.set(x as usize, y as usize, true);
        }
    }
    Ok(page)
}

/// Writes the binary image as 8-bit grayscale: ink black, paper white.
fn save_binary(page: &BinaryImage, path: &PathBuf) -> Result<(), String> {
    let mut gray = GrayImage::new(page.width() as u32, page.height() as u32);
    for (x, y, pixel) in gray.enumerate_pixels_mut() {
        pixel.0[0] = if page.get(x as usize, y as usize) {
            0
        } else {
            255
        };
    }
    gray.save(path)
        .map_err(|e| format!("cannot write {}: {e}", path.display()))
}
