use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use cutout::config::{
    CutoutConfig, RemoverConfig, DEFAULT_CACHE_CAPACITY, DEFAULT_ITERATIONS,
    DEFAULT_MAX_DIMENSION, DEFAULT_MODEL_INPUT_SIZE,
};
use cutout::output::{Download, OutputSink, PngFileSink, DOWNLOAD_FILE_NAME};
use cutout::remove::remove_background;
use cutout::segmentation::{self, Preprocessor};
use cutout::{CanvasState, Engine, Rect, Session, SessionState, Upload};
use image::DynamicImage;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remove the background around a rectangle with GrabCut
    Grabcut(GrabcutArgs),

    /// Remove the background with a pretrained ONNX matting model
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
struct GrabcutArgs {
    /// Input image (png, jpg or jpeg)
    input: PathBuf,

    /// Seed rectangle as left,top,width,height in resized-image pixels
    #[arg(long, conflicts_with = "canvas", allow_hyphen_values = true)]
    rect: Option<Rect>,

    /// Drawable-canvas JSON; the first object is used as the seed
    #[arg(long)]
    canvas: Option<PathBuf>,

    /// Where to write the result
    #[arg(short, long, default_value = DOWNLOAD_FILE_NAME)]
    output: PathBuf,

    /// Largest side after resizing
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION)]
    max_dim: u32,

    /// Write the resized image with the seed outlined here
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Make the background transparent instead of black
    #[arg(long)]
    transparent: bool,

    /// Write the black/white mask instead of the cut-out image
    #[arg(long)]
    show_mask: bool,
}

#[derive(Args, Debug)]
struct RemoveArgs {
    /// Input image (png, jpg or jpeg)
    input: PathBuf,

    /// Path to the matting model (ONNX file)
    #[arg(long)]
    model: PathBuf,

    /// Square input size expected by the model
    #[arg(long, default_value_t = DEFAULT_MODEL_INPUT_SIZE)]
    input_size: u32,

    /// Where to write the result
    #[arg(short, long, default_value = DOWNLOAD_FILE_NAME)]
    output: PathBuf,

    /// Show matte visualization (grayscale silhouette) instead of the cut-out
    #[arg(long)]
    show_matte: bool,
}

impl From<&GrabcutArgs> for CutoutConfig {
    fn from(args: &GrabcutArgs) -> Self {
        Self {
            max_dimension: args.max_dim,
            iterations: DEFAULT_ITERATIONS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            transparent: args.transparent,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Cutout starting");

    match cli.command {
        Command::Grabcut(args) => run_grabcut(&args),
        Command::Remove(args) => run_remove(&args),
    }
}

fn run_grabcut(args: &GrabcutArgs) -> Result<()> {
    let engine = Engine::new(CutoutConfig::from(args));
    let mut session = Session::new();

    let upload = Upload::from_path(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    session
        .upload(&engine, &upload)
        .context("Failed to load image")?;

    let canvas = match (&args.canvas, args.rect) {
        (Some(path), _) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(CanvasState::from_json(&json).context("Failed to parse canvas JSON")?)
        }
        (None, Some(rect)) => Some(rect_canvas(rect)),
        (None, None) => None,
    };

    if session.draw(canvas.as_ref()) != SessionState::RegionReady {
        bail!("No usable rectangle: pass --rect left,top,width,height or --canvas with one drawn rectangle inside the resized image");
    }

    if let Some(overlay_path) = &args.overlay {
        if let Some(preview) = session.selection_preview() {
            preview
                .save(overlay_path)
                .with_context(|| format!("Failed to write {}", overlay_path.display()))?;
            tracing::info!("Selected region written to {}", overlay_path.display());
        }
    }

    tracing::info!("Processing...");
    let start = Instant::now();
    let result = session
        .confirm(&engine)
        .context("Failed to remove background")?;
    tracing::info!(
        "Background removed in {:.1}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    let download = if args.show_mask {
        Download::png(&DynamicImage::ImageRgb8(result.mask.to_rgb()))?
    } else {
        result.download.clone()
    };

    PngFileSink::new(&args.output).write_download(&download)?;
    Ok(())
}

/// Wrap a command-line rectangle as a one-object canvas payload
fn rect_canvas(rect: Rect) -> CanvasState {
    CanvasState {
        objects: vec![cutout::region::CanvasObject {
            kind: "rect".to_string(),
            left: rect.left as f64,
            top: rect.top as f64,
            width: rect.width as f64,
            height: rect.height as f64,
        }],
    }
}

fn run_remove(args: &RemoveArgs) -> Result<()> {
    let config = RemoverConfig {
        model_path: args.model.clone(),
        input_size: args.input_size,
    };

    tracing::info!("Loading segmentation model from {}", config.model_path.display());
    let mut model = segmentation::create_default_model(&config)
        .context("Failed to load segmentation model")?;
    tracing::info!("Segmentation model loaded successfully");

    let upload = Upload::from_path(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let result = remove_background(model.as_mut(), &upload)?;

    let download = if args.show_matte {
        let (width, height) = result.image.dimensions();
        let matte = Preprocessor::matte_to_rgb(&result.matte, width, height);
        Download::png(&DynamicImage::ImageRgb8(matte))?
    } else {
        result.download
    };

    PngFileSink::new(&args.output).write_download(&download)?;
    Ok(())
}
