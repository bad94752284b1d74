use clap::{Parser, Subcommand};
use gridstitch::batch::{self, SplitBatch};
use gridstitch::config::{self, Config};
use gridstitch::imaging::{
    EncodeParams, ImageBackend, OutputFormat, PreviewPreset, RustBackend, SourceId, StitchMode,
    collect_images,
};
use gridstitch::naming::default_stitch_output;
use gridstitch::output::{self, JobKind};
use gridstitch::preview::PreviewPipeline;
use gridstitch::thumbnail::ThumbnailPipeline;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// How long the CLI waits for a preview or a thumbnail batch to settle.
const WAIT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "gridstitch")]
#[command(about = "Split images into grids and stitch images into vertical strips")]
#[command(long_about = "\
Split images into grids and stitch images into vertical strips

Split cuts every image into rows x cols cells, numbered row by row:

  photo.jpg  --split 2x2-->  photo_1.jpg  photo_2.jpg
                             photo_3.jpg  photo_4.jpg

Stitch stacks two or more images top to bottom. Images of different widths
are aligned first:

  resize  scale every image to the widest width
  crop    center-crop every image to the narrowest width
  fill    pad every image to the widest width (white, or transparent)

Inputs are image files, or every image in a folder with --dir.
Defaults come from ./gridstitch.toml (or --config); flags override them.

Run 'gridstitch gen-config' to generate a documented gridstitch.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Input selection shared by every image command.
#[derive(clap::Args, Clone)]
struct InputArgs {
    /// Image files to process
    files: Vec<PathBuf>,

    /// Also process every image in this folder and its subfolders
    #[arg(long)]
    dir: Option<PathBuf>,
}

/// Encoder flags shared by split and stitch.
#[derive(clap::Args, Clone)]
struct EncodeArgs {
    /// Output format (jpg, png, webp, bmp, gif, tiff, avif)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// JPEG/AVIF quality (1-100)
    #[arg(long)]
    quality: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Cut each image into a grid of equal cells
    Split {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        encode: EncodeArgs,
        /// Grid rows
        #[arg(long)]
        rows: Option<u32>,
        /// Grid columns
        #[arg(long)]
        cols: Option<u32>,
        /// Output directory (default: the first image's folder)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Write each image's cells into a subfolder named after it
        #[arg(long)]
        subfolders: bool,
        /// Only process these inputs (repeatable)
        #[arg(long)]
        only: Vec<PathBuf>,
        /// Write the batch report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Stack images vertically into one image
    Stitch {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        encode: EncodeArgs,
        /// Width alignment: resize, crop or fill
        #[arg(long)]
        mode: Option<StitchMode>,
        /// Output file (default: stitched_<first image>.jpg next to it, or the --format extension)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Write the job report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Render a downscaled stitch preview as PNG
    Preview {
        #[command(flatten)]
        input: InputArgs,
        /// Width alignment: resize, crop or fill
        #[arg(long)]
        mode: Option<StitchMode>,
        /// Preview size: low (300), medium (600) or high (1000)
        #[arg(long)]
        preset: Option<PreviewPreset>,
        /// Preview box edge in pixels (overrides --preset)
        #[arg(long)]
        max_width: Option<u32>,
        /// Output PNG
        #[arg(long, short, default_value = "preview.png")]
        output: PathBuf,
    },
    /// Write square thumbnails of every image
    Thumbs {
        #[command(flatten)]
        input: InputArgs,
        /// Thumbnail edge in pixels
        #[arg(long)]
        size: Option<u32>,
        /// Output directory
        #[arg(long, short, default_value = "thumbnails")]
        output: PathBuf,
    },
    /// Print a stock gridstitch.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=gridstitch=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let load_config = || config::load_config(&cli.config);
    let backend = Arc::new(RustBackend::new());

    match cli.command {
        Command::Split {
            input,
            encode,
            rows,
            cols,
            output,
            subfolders,
            only,
            report,
        } => {
            let mut config = load_config()?;
            apply_encode_args(&mut config, &encode);
            if let Some(rows) = rows {
                config.split.rows = rows;
            }
            if let Some(cols) = cols {
                config.split.cols = cols;
            }
            config.split.subfolder_per_source |= subfolders;
            config.validate()?;
            init_thread_pool(&config.processing);

            let all = resolve_inputs(&input)?;
            let checked: Vec<SourceId> = only.into_iter().map(SourceId::path).collect();
            let sources = batch::select_items(&all, &checked, config.split.empty_selection);
            if sources.is_empty() {
                println!("Nothing to split");
                return Ok(());
            }

            let output_dir = output
                .or_else(|| {
                    sources[0]
                        .parent_dir()
                        .filter(|dir| !dir.as_os_str().is_empty())
                        .map(Path::to_path_buf)
                })
                .unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&output_dir)?;
            let job = SplitBatch {
                output_dir,
                subfolder_per_source: config.split.subfolder_per_source,
                options: config.split_options(),
            };

            let (tx, rx) = mpsc::channel();
            let handle = batch::spawn_split_batch(backend, sources, job, tx)?;
            for event in rx {
                output::print_batch_event(JobKind::Split, &event);
            }
            let result = handle.join().map_err(|_| "split batch panicked")?;
            finish_batch(&result, report.as_deref())?;
        }
        Command::Stitch {
            input,
            encode,
            mode,
            output,
            report,
        } => {
            let mut config = load_config()?;
            apply_encode_args(&mut config, &encode);
            if let Some(mode) = mode {
                config.stitch.mode = mode;
            }
            config.validate()?;

            let sources = resolve_inputs(&input)?;
            let output_path = match (output, sources.first()) {
                (Some(path), _) => path,
                (None, Some(first)) => default_stitch_output(first, None),
                (None, None) => return Err("stitch needs at least two images".into()),
            };

            let (tx, rx) = mpsc::channel();
            let handle = batch::spawn_stitch_job(
                backend,
                sources,
                output_path,
                config.stitch_options(),
                tx,
            )?;
            for event in rx {
                output::print_batch_event(JobKind::Stitch, &event);
            }
            let result = handle.join().map_err(|_| "stitch job panicked")?;
            finish_batch(&result, report.as_deref())?;
        }
        Command::Preview {
            input,
            mode,
            preset,
            max_width,
            output,
        } => {
            let mut config = load_config()?;
            if let Some(mode) = mode {
                config.stitch.mode = mode;
            }
            if let Some(preset) = preset {
                config.preview.quality = preset;
                config.preview.max_width = None;
            }
            if let Some(max_width) = max_width {
                config.preview.max_width = Some(max_width);
            }
            config.validate()?;

            let sources = resolve_inputs(&input)?;
            let pipeline = PreviewPipeline::new(Arc::clone(&backend));
            pipeline.request_preview(sources, config.stitch.mode, config.preview_max_width());
            let image = pipeline
                .wait_latest(WAIT_TIMEOUT)
                .ok_or("timed out waiting for the preview")?;

            let dimensions = match image {
                Some(image) => {
                    let params = EncodeParams {
                        format: OutputFormat::Png,
                        quality: config.quality(),
                        exif: None,
                    };
                    backend.save(&image, &output, &params)?;
                    Some((image.width(), image.height()))
                }
                None => None,
            };
            output::print_preview_output(dimensions, &output);
        }
        Command::Thumbs {
            input,
            size,
            output,
        } => {
            let mut config = load_config()?;
            if let Some(size) = size {
                config.thumbnails.size = size;
            }
            config.validate()?;

            let sources = resolve_inputs(&input)?;
            std::fs::create_dir_all(&output)?;
            write_thumbnails(backend, &sources, &config, &output)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn apply_encode_args(config: &mut Config, encode: &EncodeArgs) {
    if let Some(format) = encode.format {
        config.output.format = Some(format);
    }
    if let Some(quality) = encode.quality {
        config.output.quality = quality;
    }
}

/// Explicit files first, then the folder's images, without duplicates.
fn resolve_inputs(input: &InputArgs) -> Result<Vec<SourceId>, Box<dyn std::error::Error>> {
    let mut paths = input.files.clone();
    if let Some(dir) = &input.dir {
        for path in collect_images(dir)? {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    Ok(paths.into_iter().map(SourceId::path).collect())
}

/// Print failures, write the optional JSON report, and fail the command if
/// any job failed.
fn finish_batch(
    report: &batch::BatchReport,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    output::print_failure_summary(report);
    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(path, json)?;
    }
    if report.all_succeeded() {
        Ok(())
    } else {
        Err(format!("{} of {} jobs failed", report.failed(), report.items.len()).into())
    }
}

fn write_thumbnails(
    backend: Arc<RustBackend>,
    sources: &[SourceId],
    config: &Config,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut pipeline = ThumbnailPipeline::new(Arc::clone(&backend), config.thumbnail_config())?;
    for id in sources {
        pipeline.enqueue(id.clone());
    }

    // Failed sources never produce an event, so settle on the pending set.
    // Events are kept here because a bounded cache may evict early results.
    let mut ready = HashMap::new();
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while pipeline.pending_count() > 0 && Instant::now() < deadline {
        if let Some(event) = pipeline.recv_timeout(Duration::from_millis(100)) {
            ready.insert(event.id, event.thumbnail);
        }
    }
    pipeline.shutdown();
    while let Some(event) = pipeline.try_recv() {
        ready.insert(event.id, event.thumbnail);
    }

    let params = EncodeParams {
        format: OutputFormat::Png,
        quality: config.quality(),
        exif: None,
    };
    let mut written = Vec::new();
    let mut skipped = Vec::new();
    for id in sources {
        match ready.get(id) {
            Some(thumb) => {
                let path = output_dir.join(format!("{}.png", id.stem()));
                backend.save(&thumb, &path, &params)?;
                written.push((id.to_string(), (thumb.width(), thumb.height()), path));
            }
            None => skipped.push(id.to_string()),
        }
    }
    output::print_thumbnail_output(&written, &skipped);
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
