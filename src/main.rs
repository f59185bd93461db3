//! PlateScan - License-plate scanning for camera frames
//!
//! Command-line front end: crops raw frame dumps to the region of interest
//! and classifies text lines against known plate formats.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use plate_scan::capture::{load_raw_frame, RawFormat};
use plate_scan::config::{default_config_path, load_config, save_config, AppConfig};
use plate_scan::vision::{annotate_region, ConverterKind, FrameCropper, NormalizedRegion};
use plate_scan::PlateClassifier;

/// PlateScan - License-plate text scanning for camera frames
#[derive(Parser, Debug)]
#[command(name = "plate-scan")]
#[command(about = "Crop camera frames to a scanning region and classify plate text")]
struct Args {
    /// Configuration file (defaults to the per-user config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a raw YUV frame dump into a cropped PNG
    Crop(CropArgs),
    /// Classify text lines as license plates
    Classify(ClassifyArgs),
    /// Show or initialize the configuration file
    Config(ConfigArgs),
}

#[derive(ClapArgs, Debug)]
struct CropArgs {
    /// Raw frame file
    #[arg(short, long)]
    input: PathBuf,

    /// Frame width in pixels
    #[arg(long)]
    width: u32,

    /// Frame height in pixels
    #[arg(long)]
    height: u32,

    /// Raw layout (i420 or nv21)
    #[arg(long, default_value = "i420")]
    format: RawFormat,

    /// Clockwise rotation in degrees (multiple of 90)
    #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
    rotation: i32,

    /// Region of interest as left,top,right,bottom fractions
    #[arg(long)]
    roi: Option<NormalizedRegion>,

    /// Color conversion (direct or jpeg)
    #[arg(long)]
    converter: Option<ConverterKind>,

    /// Output image for the crop
    #[arg(short, long)]
    output: PathBuf,

    /// Also write the full rotated frame with the ROI outlined
    #[arg(long)]
    debug_frame: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct ClassifyArgs {
    /// Lines to classify (reads stdin when omitted)
    text: Vec<String>,

    /// Print JSON objects instead of plain text
    #[arg(long)]
    json: bool,

    /// Also print lines that are not plates
    #[arg(long)]
    all: bool,
}

#[derive(ClapArgs, Debug)]
struct ConfigArgs {
    /// Write the default configuration file
    #[arg(long)]
    init: bool,

    /// Overwrite an existing file with --init
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // `config --init` must work before any file exists
    let config = match &args.command {
        Command::Config(cfg) if cfg.init => AppConfig::default(),
        _ => load_or_default_config(args.config.as_deref())?,
    };

    // Initialize logging
    let level = if args.verbose {
        "debug"
    } else {
        config.general.log_level.as_str()
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Crop(crop) => run_crop(crop, &config),
        Command::Classify(classify) => run_classify(classify),
        Command::Config(cfg) => run_config(cfg, args.config, &config),
    }
}

/// Load the configuration file, or fall back to defaults when none exists
fn load_or_default_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return load_config(path);
    }
    if let Ok(path) = default_config_path() {
        if path.exists() {
            return load_config(&path);
        }
    }
    Ok(AppConfig::default())
}

fn run_crop(args: CropArgs, config: &AppConfig) -> Result<()> {
    let frame = load_raw_frame(&args.input, args.width, args.height, args.format)?;

    let mut converter = config.converter.clone();
    if let Some(kind) = args.converter {
        converter.kind = kind;
    }
    let cropper = FrameCropper::from_config(&converter);
    let roi = args.roi.unwrap_or(config.scanner.roi);

    let cropped = cropper.crop(&frame, args.rotation, &roi)?;
    cropped
        .image()
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(
        "Wrote {}x{} crop to {}",
        cropped.width(),
        cropped.height(),
        args.output.display()
    );

    if let Some(path) = &args.debug_frame {
        let mut raster = cropper.rotated_raster(&frame, args.rotation)?;
        annotate_region(&mut raster, &roi)?;
        raster
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote annotated frame to {}", path.display());
    }

    Ok(())
}

fn run_classify(args: ClassifyArgs) -> Result<()> {
    let classifier = PlateClassifier::new();

    let lines: Vec<String> = if args.text.is_empty() {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<_>>()
            .context("Failed to read stdin")?
    } else {
        args.text
    };

    let mut matches = 0usize;
    for line in &lines {
        let result = classifier.classify(line);
        if result.is_match() {
            matches += 1;
        } else if !args.all {
            continue;
        }

        if args.json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            println!("{}\t{}", result.category(), result.text());
        }
    }

    debug!("{} of {} lines matched a plate format", matches, lines.len());
    Ok(())
}

fn run_config(args: ConfigArgs, path: Option<PathBuf>, config: &AppConfig) -> Result<()> {
    if !args.init {
        print!("{}", toml::to_string_pretty(config)?);
        return Ok(());
    }

    let path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };
    if path.exists() && !args.force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    save_config(&AppConfig::default(), &path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
