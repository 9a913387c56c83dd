use std::{
    io::Cursor,
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use framescribe_core::{
    AnalyzerConfig, BatchRunner, CaptionAdapter, Collaborators, FailurePolicy, Frame, Pipeline,
    SamplePoint, SamplingStrategy, Segment, format_description_readable,
};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::{
    decoder::FfmpegDecoder, oracle::HttpCaptionOracle, output::save_description, probe::FfprobeProber,
    provider::Provider, transcriber::WhisperTranscriber,
};

mod decoder;
mod oracle;
mod output;
mod probe;
mod provider;
mod transcriber;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Grok,
    Openai,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Grok => Provider::Grok,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Parser)]
#[command(name = "framescribe")]
#[command(about = "Describe video files with AI frame captions aggregated into structured JSON")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one or more videos and write <stem>_description.json for each
    Analyze(AnalyzeArgs),
    /// Check ffmpeg, ffprobe and the provider API key, then caption a test frame
    Init {
        /// AI provider for frame captioning
        #[arg(short, long, default_value = "grok")]
        provider: CliProvider,

        /// Vision model name (defaults to the provider's)
        #[arg(short, long)]
        model: Option<String>,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Video files
    #[arg(required = true)]
    videos: Vec<PathBuf>,

    /// Number of evenly spaced frames to caption per video
    #[arg(short, long, conflicts_with = "period")]
    frames: Option<usize>,

    /// Caption one frame every SECS seconds instead
    #[arg(long, value_name = "SECS")]
    period: Option<f64>,

    /// Directory for the JSON descriptions
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// AI provider for frame captioning
    #[arg(short, long, default_value = "grok")]
    provider: CliProvider,

    /// Vision model name (defaults to the provider's)
    #[arg(short, long)]
    model: Option<String>,

    /// Videos analyzed at once
    #[arg(long)]
    video_concurrency: Option<usize>,

    /// Oracle requests in flight across all videos
    #[arg(long)]
    oracle_concurrency: Option<usize>,

    /// Attach technical quality metrics to every caption
    #[arg(long)]
    frame_quality: bool,

    /// Transcribe the audio track with a local whisper model
    #[arg(long)]
    audio: bool,

    /// Whisper model file (downloaded into the cache dir when omitted)
    #[arg(long, value_name = "PATH", requires = "audio")]
    whisper_model: Option<PathBuf>,

    /// Stop the whole batch at the first failed video
    #[arg(long)]
    fail_fast: bool,

    /// JSON analyzer configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a readable summary of every description
    #[arg(long)]
    print: bool,
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("framescribe=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn load_config(args: &AnalyzeArgs) -> Result<AnalyzerConfig> {
    let mut config = match &args.config {
        Some(path) => AnalyzerConfig::load(path)
            .await
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => AnalyzerConfig::default(),
    };

    if let Some(frames) = args.frames {
        config.sampling = SamplingStrategy::FrameCount(frames);
    }
    if let Some(period) = args.period {
        config.sampling = SamplingStrategy::Periodic(period);
    }
    if let Some(n) = args.video_concurrency {
        config.video_concurrency = n;
    }
    if let Some(n) = args.oracle_concurrency {
        config.oracle_concurrency = n;
    }
    if args.frame_quality {
        config.frame_quality = true;
    }
    if args.audio {
        config.audio_transcription = true;
    }
    if args.fail_fast {
        config.failure_policy = FailurePolicy::Abort;
    }

    config.validate()?;
    Ok(config)
}

extern "C" fn whisper_log_callback(
    _level: u32,
    _message: *const std::ffi::c_char,
    _user_data: *mut std::ffi::c_void,
) {
    // silent
}

async fn load_transcriber(model: Option<&PathBuf>) -> Result<WhisperTranscriber> {
    let model_path = match model {
        Some(path) => path.clone(),
        None => {
            let spinner = create_spinner("Fetching whisper model...");
            let path = transcriber::ensure_model(&transcriber::model_dir()).await;
            spinner.finish_and_clear();
            path?
        }
    };
    info!(model = %model_path.display(), "loading whisper model");
    WhisperTranscriber::new(&model_path)
}

fn print_banner(subtitle: &str) {
    println!(
        "\n{}  {}\n",
        style("framescribe").cyan().bold(),
        style(subtitle).dim()
    );
}

async fn analyze(args: AnalyzeArgs) -> Result<ExitCode> {
    let provider: Provider = args.provider.into();

    // Validate API key early
    let api_key = match provider.validate_api_key() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let config = load_config(&args).await?;
    let oracle = HttpCaptionOracle::new(provider, args.model.clone(), api_key)?;

    print_banner("Video Describer");
    println!(
        "{} {} videos, {} via {}",
        style("✓").green().bold(),
        args.videos.len(),
        style(oracle.model()).yellow(),
        provider.name()
    );
    println!("{}", style("─".repeat(60)).dim());

    let mut pipeline = Pipeline::new(
        Collaborators {
            prober: Arc::new(FfprobeProber),
            decoder: Arc::new(FfmpegDecoder),
            oracle: Arc::new(oracle),
        },
        &config,
    );
    if config.audio_transcription {
        unsafe {
            whisper_rs::set_log_callback(Some(whisper_log_callback), std::ptr::null_mut());
        }
        let transcriber = load_transcriber(args.whisper_model.as_ref()).await?;
        pipeline = pipeline.with_transcriber(Arc::new(transcriber));
        println!("{} Audio transcription on", style("✓").green().bold());
    }
    let runner = BatchRunner::new(pipeline, &config);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl-C");
            let _ = shutdown_tx.send(());
        }
    });

    let total = args.videos.len();
    let total_start = Instant::now();
    let spinner = create_spinner(&format!("Describing 0/{total} videos..."));
    let mut settled = 0;

    let report = runner
        .run_with(args.videos.clone(), shutdown_rx, |outcome| {
            settled += 1;
            let name = outcome.path.display();
            match &outcome.result {
                Ok(_) => spinner.println(format!("{} {}", style("✓").green().bold(), name)),
                Err(e) => spinner.println(format!(
                    "{} {} {}",
                    style("✗").red().bold(),
                    name,
                    style(format!("[{}] {}", e.kind(), e)).dim()
                )),
            }
            spinner.set_message(format!("Describing {settled}/{total} videos..."));
        })
        .await;

    spinner.finish_and_clear();

    for (path, description) in report.succeeded() {
        let saved = save_description(description, &args.output_dir, path).await?;
        println!(
            "{} {}",
            style("Saved:").dim(),
            style(saved.display()).cyan()
        );
        if args.print {
            println!("{}", style("─".repeat(60)).dim());
            println!("{}", format_description_readable(description));
        }
    }

    let failed = report.failed().count();
    println!(
        "\n{} {} described, {} failed in {}\n",
        style("Done:").dim(),
        style(total - failed).green().bold(),
        if failed > 0 {
            style(failed).red().bold()
        } else {
            style(failed).dim()
        },
        style(format_duration(total_start.elapsed())).cyan().bold()
    );

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn black_test_frame() -> Result<Frame> {
    let image = image::RgbImage::new(64, 64);
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, image::ImageOutputFormat::Jpeg(85))?;
    Ok(Frame::new(0.0, bytes.into_inner()))
}

async fn init(provider: Provider, model: Option<String>) -> Result<ExitCode> {
    print_banner("Environment check");

    let mut ready = true;
    for tool in ["ffmpeg", "ffprobe"] {
        match which::which(tool) {
            Ok(path) => println!(
                "{} {} {}",
                style("✓").green().bold(),
                tool,
                style(path.display()).dim()
            ),
            Err(_) => {
                println!("{} {} not found on PATH", style("✗").red().bold(), tool);
                ready = false;
            }
        }
    }

    let api_key = match provider.validate_api_key() {
        Ok(key) => {
            println!(
                "{} {} API key ({})",
                style("✓").green().bold(),
                provider.name(),
                provider.config().env_var
            );
            key
        }
        Err(e) => {
            println!("{} {}", style("✗").red().bold(), e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let oracle = HttpCaptionOracle::new(provider, model, api_key)?;
    let spinner = create_spinner(&format!("Captioning a test frame with {}...", oracle.model()));
    let step_start = Instant::now();
    let frame = black_test_frame()?;
    let point = SamplePoint {
        index: 0,
        timestamp: 0.0,
        segment: Segment::new(0.0, 1.0),
    };

    match CaptionAdapter::new(&oracle).caption(&point, &frame).await {
        Ok(caption) => spinner.finish_with_message(format!(
            "{} Oracle answered: \"{}\" ({:.2}) {}",
            style("✓").green().bold(),
            caption.text,
            caption.confidence,
            style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
        )),
        Err(e) => {
            spinner.finish_with_message(format!("{} {}", style("✗").red().bold(), e));
            ready = false;
        }
    }

    Ok(if ready {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze(args) => analyze(args).await,
        Command::Init { provider, model } => init(provider.into(), model).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_are_short_and_readable() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn frames_and_period_are_exclusive() {
        let parsed = Cli::try_parse_from(["framescribe", "analyze", "a.mp4", "--frames", "3", "--period", "2"]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "framescribe",
            "analyze",
            "a.mp4",
            "b.mp4",
            "--period",
            "2.5",
            "--video-concurrency",
            "3",
            "--frame-quality",
            "--fail-fast",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };

        let config = load_config(&args).await.unwrap();
        assert_eq!(args.videos.len(), 2);
        assert_eq!(config.sampling, SamplingStrategy::Periodic(2.5));
        assert_eq!(config.video_concurrency, 3);
        assert_eq!(config.oracle_concurrency, 2);
        assert!(config.frame_quality);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(!config.audio_transcription);
    }

    #[tokio::test]
    async fn audio_flag_turns_on_transcription() {
        let cli = Cli::try_parse_from([
            "framescribe",
            "analyze",
            "a.mp4",
            "--audio",
            "--whisper-model",
            "/models/ggml-small.bin",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };

        let config = load_config(&args).await.unwrap();
        assert!(config.audio_transcription);
        assert_eq!(
            args.whisper_model,
            Some(PathBuf::from("/models/ggml-small.bin"))
        );
    }

    #[test]
    fn whisper_model_needs_audio() {
        let parsed =
            Cli::try_parse_from(["framescribe", "analyze", "a.mp4", "--whisper-model", "m.bin"]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn zero_frames_is_rejected() {
        let cli = Cli::try_parse_from(["framescribe", "analyze", "a.mp4", "--frames", "0"]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert!(load_config(&args).await.is_err());
    }

    #[test]
    fn test_frame_is_a_jpeg() {
        let frame = black_test_frame().unwrap();
        assert_eq!(frame.mime_type(), "image/jpeg");
        assert!(frame.data.starts_with(&[0xFF, 0xD8]));
    }
}
