use std::path::PathBuf;

use clap::Parser;
use image::ImageReader;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};

use bit2bez::{svg, Bitmap, Segment, TraceParams, TurnPolicy};

#[derive(Parser)]
#[command(name = "bit2bez", about = "Trace a bitmap image into SVG outlines")]
struct Cli {
    /// Input image path (PNG, JPEG, BMP)
    #[arg(short, long)]
    input: PathBuf,

    /// Output SVG path
    #[arg(short, long)]
    output: PathBuf,

    /// Drop contours with area up to this many pixels
    #[arg(long, default_value = "2")]
    turdsize: i64,

    /// Ambiguity rule: black, white, left, right, minority, majority, random
    #[arg(long, default_value = "minority")]
    turnpolicy: TurnPolicy,

    /// Corner threshold (0 = polygonal, 1.33 = no corners)
    #[arg(long, default_value = "1.0")]
    alphamax: f64,

    /// Curve merging tolerance (0 = keep all segments)
    #[arg(long, default_value = "0.2")]
    opttolerance: f64,

    /// Fixed brightness threshold (0-255). Overrides Otsu auto-detection.
    #[arg(long)]
    threshold: Option<u8>,

    /// Invert the image before tracing (trace bright regions)
    #[arg(long)]
    invert: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let img = ImageReader::open(&cli.input)?.decode()?.into_luma8();
    let (w, h) = img.dimensions();

    let level = match cli.threshold {
        Some(t) => t,
        None => {
            let t = otsu_level(&img);
            eprintln!("  Threshold   Otsu = {t}");
            t
        }
    };
    // dark pixels become foreground unless --invert is given
    let mut binary = threshold(&img, level, ThresholdType::BinaryInverted);
    if cli.invert {
        for pixel in binary.pixels_mut() {
            pixel.0[0] = 255 - pixel.0[0];
        }
    }

    let bitmap = Bitmap::from_gray(&binary)?;
    eprintln!("  Load        {w}x{h} px");

    let params = TraceParams {
        turdsize: cli.turdsize,
        turnpolicy: cli.turnpolicy,
        alphamax: cli.alphamax,
        opttolerance: cli.opttolerance,
    };
    let result = bit2bez::trace(&bitmap, &params)?;

    let (mut curves, mut corners) = (0usize, 0usize);
    let mut paths = 0usize;
    for node in result.iter() {
        paths += 1;
        for seg in node.curve().segments() {
            match seg {
                Segment::Bezier { .. } => curves += 1,
                Segment::Corner { .. } => corners += 1,
            }
        }
    }
    eprintln!("  Trace       {paths} paths \u{2192} {curves} curves + {corners} corners");

    std::fs::write(&cli.output, svg::to_svg(&result, w, h))?;
    eprintln!("  \u{2713} {}", cli.output.display());
    Ok(())
}
