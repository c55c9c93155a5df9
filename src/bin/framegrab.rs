use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framegrab::{
    ExtractOptions, ExtractionState, FfmpegLogLevel, FrameExtractor, FramePosition,
    ProgressCallback, ProgressInfo, VideoSource,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framegrab extract input.mp4 --position last --out stills\n  framegrab extract upload.bin --media-type video/webm --json\n  framegrab probe input.mp4 --json\n  framegrab completions zsh > _framegrab";

#[derive(Debug, Parser)]
#[command(
    name = "framegrab",
    version,
    about = "Save the first or last frame of a video as a PNG",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a spinner while extracting.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Seconds to wait for container metadata.
    #[arg(long, global = true)]
    metadata_timeout: Option<f64>,

    /// Seconds to wait for the seek to land.
    #[arg(long, global = true)]
    seek_timeout: Option<f64>,

    /// Seconds subtracted from the duration when grabbing the last frame.
    #[arg(long, global = true)]
    epsilon: Option<f64>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract the first or last frame to `<position>-frame.png`.
    #[command(
        about = "Extract a still frame",
        after_help = "Examples:\n  framegrab extract input.mp4\n  framegrab extract input.mp4 --position last --out stills --progress"
    )]
    Extract {
        /// Input video path.
        input: PathBuf,
        /// Which frame to grab: first | last.
        #[arg(long, default_value = "first")]
        position: FramePosition,
        /// Output directory for the PNG.
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Declared media type, overriding sniffing.
        #[arg(long)]
        media_type: Option<String>,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the stream metadata the extractor sees.
    #[command(about = "Print video metadata", visible_alias = "info")]
    Probe {
        /// Input video path.
        input: PathBuf,
        /// Declared media type, overriding sniffing.
        #[arg(long)]
        media_type: Option<String>,
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_seconds(flag: &str, value: f64) -> Result<Duration, Box<dyn std::error::Error>> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| format!("--{flag} must be a non-negative number of seconds").into())
}

/// Read the input and validate its media type before any extraction.
fn load_source(
    input: &Path,
    media_type: Option<&str>,
) -> Result<VideoSource, Box<dyn std::error::Error>> {
    let source = match media_type {
        Some(media_type) => VideoSource::new(std::fs::read(input)?, media_type)?,
        None => VideoSource::open(input)?,
    };
    Ok(source)
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn init_logging(global: &GlobalOptions) {
    let default_filter = if global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn extract_options(global: &GlobalOptions) -> Result<ExtractOptions, Box<dyn std::error::Error>> {
    let mut options = ExtractOptions::new();

    if let Some(seconds) = global.metadata_timeout {
        options = options.with_metadata_timeout(parse_seconds("metadata-timeout", seconds)?);
    }
    if let Some(seconds) = global.seek_timeout {
        options = options.with_seek_timeout(parse_seconds("seek-timeout", seconds)?);
    }
    if let Some(seconds) = global.epsilon {
        options = options.with_last_frame_epsilon(parse_seconds("epsilon", seconds)?);
    }

    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level.parse()?;
        framegrab::set_ffmpeg_log_level(parsed);
    }

    Ok(options)
}

/// Drives an indicatif spinner from state transitions.
struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        bar.enable_steady_tick(Duration::from_millis(100));
        Ok(Self { bar })
    }
}

impl ProgressCallback for SpinnerProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let message = match info.state {
            ExtractionState::Idle => "starting",
            ExtractionState::MetadataPending => "reading metadata",
            ExtractionState::Seeking => "seeking",
            ExtractionState::FrameReady => "drawing frame",
            ExtractionState::Encoding => "encoding PNG",
            ExtractionState::Done => "done",
            ExtractionState::Failed => "failed",
        };
        if info.state.is_terminal() {
            self.bar.finish_and_clear();
        } else {
            self.bar.set_message(format!("{} frame: {message}", info.position));
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);
    let mut options = extract_options(&cli.global)?;

    match cli.command {
        Commands::Extract {
            input,
            position,
            out,
            media_type,
            json,
        } => {
            let source = load_source(&input, media_type.as_deref())?;

            std::fs::create_dir_all(&out)?;
            let output_path = out.join(position.file_name());
            ensure_writable_path(&output_path, cli.global.overwrite)?;

            if cli.global.progress {
                options = options.with_progress(Arc::new(SpinnerProgress::new()?));
            }

            let extractor = FrameExtractor::with_options(options);
            let frame = extractor.extract(&source, position).await?;
            frame.save(&output_path)?;

            if json {
                let seek_target = frame.seek_target().as_duration();
                let duration = frame.metadata().duration;
                let payload = json!({
                    "position": frame.position().as_str(),
                    "width": frame.width(),
                    "height": frame.height(),
                    "seek_target_seconds": seek_target.map(|target| target.as_secs_f64()),
                    "duration_seconds": duration.map(|duration| duration.as_secs_f64()),
                    "encoding": frame.encoding().media_type(),
                    "bytes": frame.bytes().len(),
                    "path": output_path.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!(
                    "{} {}",
                    "saved".green().bold(),
                    format!(
                        "{} ({}x{}, {} bytes)",
                        output_path.display(),
                        frame.width(),
                        frame.height(),
                        frame.bytes().len()
                    )
                    .green()
                );
            }
            frame.revoke();
        }
        Commands::Probe {
            input,
            media_type,
            json,
        } => {
            let source = load_source(&input, media_type.as_deref())?;
            let extractor = FrameExtractor::with_options(options);
            let metadata = extractor.probe(&source).await?;

            if json {
                let payload = json!({
                    "media_type": source.media_type(),
                    "format": metadata.format,
                    "codec": metadata.codec,
                    "width": metadata.width,
                    "height": metadata.height,
                    "fps": metadata.frames_per_second,
                    "duration_seconds": metadata.duration.map(|duration| duration.as_secs_f64()),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Type: {}", source.media_type());
                println!("Format: {}", metadata.format);
                match metadata.duration {
                    Some(duration) => println!("Duration: {duration:?}"),
                    None => println!("Duration: unknown"),
                }
                println!(
                    "Video: {}x{} @ {:.2} fps [{}]",
                    metadata.width, metadata.height, metadata.frames_per_second, metadata.codec,
                );
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framegrab", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
