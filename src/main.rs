use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thumbwright::config;
use thumbwright::output;
use thumbwright::processing::ArtifactProcessor;
use thumbwright::sweep::{self, SweepMode};
use thumbwright::types::{ArtifactKind, Dimensions, FaceBox, FaceRegion, PhotoInfo, SourceKind};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "thumbwright")]
#[command(about = "Get-or-create thumbnails, face crops and converted previews")]
#[command(long_about = "\
Get-or-create thumbnails, face crops and converted previews

Artifacts live at deterministic paths, so an existing file is returned as-is
and only missing ones are rendered:

  images/2023/dawn.jpg                  source
  cache/transcoded/2023/dawn.jpg_240.jpg  thumbnail (and converted preview)
  cache/faces/<hash>_200.jpg            person thumbnail

Run 'thumbwright gen-config' to generate a documented thumbwright.toml.")]
#[command(version)]
struct Cli {
    /// Config file. Repeat to layer files; later files win. Missing files are skipped.
    #[arg(long = "config", default_value = "thumbwright.toml", global = true)]
    config: Vec<PathBuf>,

    /// Log engine activity to stderr (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Get or create a sized thumbnail of a photo or video
    Thumbnail {
        media: PathBuf,
        /// Short-side size; must be a configured size. Defaults to the first one.
        #[arg(long)]
        size: Option<u32>,
        /// Cover size×size and center-crop
        #[arg(long)]
        square: bool,
    },
    /// Get or create a converted preview at the configured resolution
    Convert { media: PathBuf },
    /// Get or create a person thumbnail around one face box
    Face {
        media: PathBuf,
        /// Photo width; read from the file header when omitted
        #[arg(long)]
        width: Option<u32>,
        /// Photo height; read from the file header when omitted
        #[arg(long)]
        height: Option<u32>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        left: u32,
        #[arg(long)]
        top: u32,
        #[arg(long)]
        box_width: u32,
        #[arg(long)]
        box_height: u32,
    },
    /// Report whether transcoded files are still legal artifacts
    Check {
        #[arg(required = true)]
        artifacts: Vec<PathBuf>,
    },
    /// List stale files under the transcoded root
    Sweep {
        /// Delete the stale files instead of only listing them
        #[arg(long)]
        delete: bool,
    },
    /// Print a stock thumbwright.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Thumbnail {
            media,
            size,
            square,
        } => {
            let processor = open_processor(&cli.config)?;
            let size = match size {
                Some(size) => size,
                None => *processor
                    .config()
                    .thumbnails
                    .sizes
                    .first()
                    .ok_or("no thumbnail sizes configured")?,
            };
            if !processor.size_registry().is_legal(size) {
                return Err(format!("size {size} is not configured").into());
            }
            let kind = SourceKind::from_path(&media)
                .ok_or_else(|| format!("unsupported media type: {}", media.display()))?;
            let path = processor.get_or_create_thumbnail(&media, size, kind, square)?;
            println!(
                "{}",
                output::format_artifact(ArtifactKind::SizedThumbnail, size, &path)
            );
        }
        Command::Convert { media } => {
            let processor = open_processor(&cli.config)?;
            let path = processor.get_or_create_converted_photo(&media)?;
            let resolution = processor.config().converting.resolution;
            println!(
                "{}",
                output::format_artifact(ArtifactKind::ConvertedPhoto, resolution, &path)
            );
        }
        Command::Face {
            media,
            width,
            height,
            name,
            left,
            top,
            box_width,
            box_height,
        } => {
            let processor = open_processor(&cli.config)?;
            let (width, height) = match (width, height) {
                (Some(w), Some(h)) => (w, h),
                _ => image::image_dimensions(&media)?,
            };
            let photo = PhotoInfo {
                path: media,
                dimensions: Dimensions { width, height },
                faces: vec![FaceRegion {
                    name,
                    face_box: FaceBox {
                        left,
                        top,
                        width: box_width,
                        height: box_height,
                    },
                }],
            };
            let path = processor.get_or_create_person_thumbnail(&photo)?;
            let size = processor.config().thumbnails.person_size;
            println!(
                "{}",
                output::format_artifact(ArtifactKind::PersonFaceThumbnail, size, &path)
            );
        }
        Command::Check { artifacts } => {
            let processor = open_processor(&cli.config)?;
            for artifact in &artifacts {
                let valid = processor.is_valid_derived_path(artifact);
                println!("{}", output::format_check(artifact, valid));
            }
        }
        Command::Sweep { delete } => {
            let processor = open_processor(&cli.config)?;
            let mode = if delete {
                SweepMode::Delete
            } else {
                SweepMode::Report
            };
            let report = sweep::sweep(&processor, mode)?;
            let root = processor.paths().transcoded_root();
            for line in output::format_sweep_report(&report, root, mode) {
                println!("{}", line);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the layered config and build the processor it describes.
fn open_processor(files: &[PathBuf]) -> Result<ArtifactProcessor, Box<dyn std::error::Error>> {
    let config = config::load_config(files)?;
    Ok(ArtifactProcessor::from_config(config)?)
}

/// Install the stderr log subscriber. Default level is `warn`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
