//! card-scanner - diagnostic CLI
//!
//! Runs card detection and rectification over still images and writes the
//! intermediate results for inspection.

use anyhow::{bail, Context, Result};
use clap::Parser;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use card_scanner::config::{self, RectifyMode, ScannerConfig};
use card_scanner::events::{EventSink, ScanEvent, TracingSink};
use card_scanner::vision::title;
use card_scanner::{CardScanner, CornerSet, Detection, Frame, FrameSource, ImageFileSource};

/// Card Scanner - detect, rectify and crop trading cards
#[derive(Parser, Debug)]
#[command(name = "card-scanner")]
#[command(about = "Detect, rectify and crop trading cards in still images")]
struct Args {
    /// Image files to scan
    inputs: Vec<PathBuf>,

    /// Configuration file (default: config.toml in the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write rectified cards and title crops to this directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write the input with the detected corners drawn on it
    #[arg(long)]
    overlay: bool,

    /// Also write the edge map
    #[arg(long)]
    edges: bool,

    /// Print one JSON object per image instead of text
    #[arg(long)]
    json: bool,

    /// Rectify with the projective mapping instead of bilinear interpolation
    #[arg(long)]
    homography: bool,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    dump_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Per-image result printed by the CLI
#[derive(Debug, Serialize)]
struct FrameReport {
    path: PathBuf,
    width: u32,
    height: u32,
    detection: Option<Detection>,
    processing_time_ms: u64,
    outputs: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.dump_config {
        print!("{}", toml::to_string_pretty(&ScannerConfig::default())?);
        return Ok(());
    }

    if args.inputs.is_empty() {
        bail!("No input images given");
    }

    let mut config = load_scanner_config(args.config.as_deref())?;
    if args.homography {
        config.rectify.mode = RectifyMode::Homography;
    }

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    }

    let scanner = CardScanner::with_config(config);
    let mut source = ImageFileSource::new(&args.inputs);
    let mut scanned = 0usize;
    let mut detected = 0usize;

    loop {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                warn!("Skipping input: {:#}", e);
                continue;
            }
        };
        let path = source.current_path().map(Path::to_path_buf).unwrap_or_default();

        let report = scan_file(&scanner, &frame, &path, &args)?;
        scanned += 1;
        if report.detection.is_some() {
            detected += 1;
        }
        print_report(&report, args.json)?;
    }

    info!("Scanned {} image(s), card found in {}", scanned, detected);

    Ok(())
}

/// Load configuration from an explicit path, the user config file, or defaults
fn load_scanner_config(explicit: Option<&Path>) -> Result<ScannerConfig> {
    if let Some(path) = explicit {
        let config = config::load_config(path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    if let Ok(config_path) = config::default_config_path() {
        if config_path.exists() {
            match config::load_config(&config_path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", config_path);
                    return Ok(config);
                }
                Err(e) => warn!("Ignoring invalid configuration: {:#}", e),
            }
        }
    }

    info!("Using default configuration");
    Ok(ScannerConfig::default())
}

/// Run detection on one image and write the requested outputs
fn scan_file(scanner: &CardScanner, frame: &Frame, path: &Path, args: &Args) -> Result<FrameReport> {
    let start = Instant::now();
    let sink = TracingSink;
    let run = scanner.run(frame, &sink);
    let detection = run.detection;
    let mut outputs = Vec::new();

    if let Some(dir) = &args.output_dir {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());

        if args.edges {
            let out = dir.join(format!("{}_edges.png", stem));
            run.edges
                .save(&out)
                .with_context(|| format!("Failed to write image: {:?}", out))?;
            outputs.push(out);
        }

        if let Some(d) = &detection {
            let rectified = scanner.rectify(frame, &d.corners);
            sink.emit(ScanEvent::Rectified {
                width: rectified.width(),
                height: rectified.height(),
            });

            let out = dir.join(format!("{}_card.png", stem));
            rectified
                .save(&out)
                .with_context(|| format!("Failed to write image: {:?}", out))?;
            outputs.push(out);

            let crop = title::crop_title(&rectified, scanner.config().title.crop_fraction);
            let out = dir.join(format!("{}_title.png", stem));
            crop.save(&out)
                .with_context(|| format!("Failed to write image: {:?}", out))?;
            outputs.push(out);

            if args.overlay {
                let out = dir.join(format!("{}_overlay.png", stem));
                draw_corners(frame.image(), &d.corners)
                    .save(&out)
                    .with_context(|| format!("Failed to write image: {:?}", out))?;
                outputs.push(out);
            }
        }
    }

    Ok(FrameReport {
        path: path.to_path_buf(),
        width: frame.width(),
        height: frame.height(),
        detection,
        processing_time_ms: start.elapsed().as_millis() as u64,
        outputs,
    })
}

/// Copy of `image` with the card outline and corners marked
fn draw_corners(image: &RgbaImage, corners: &CornerSet) -> RgbaImage {
    let mut canvas = image.clone();
    let pts = corners.points();
    for i in 0..4 {
        let a = pts[i];
        let b = pts[(i + 1) % 4];
        draw_line_segment_mut(&mut canvas, (a.x, a.y), (b.x, b.y), Rgba([0, 255, 0, 255]));
    }
    for p in pts {
        draw_filled_circle_mut(&mut canvas, (p.x.round() as i32, p.y.round() as i32), 4, Rgba([255, 0, 0, 255]));
    }
    canvas
}

fn print_report(report: &FrameReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }

    match &report.detection {
        Some(d) => {
            let corners: Vec<String> = d
                .corners
                .points()
                .iter()
                .map(|p| format!("({:.1}, {:.1})", p.x, p.y))
                .collect();
            println!(
                "{}: card found (score {:.3}, area {:.0} px) at {}",
                report.path.display(),
                d.score,
                d.corners.area(),
                corners.join(" ")
            );
        }
        None => println!("{}: no card found", report.path.display()),
    }
    for out in &report.outputs {
        println!("  wrote {}", out.display());
    }
    Ok(())
}
