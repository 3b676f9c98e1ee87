//! Redub - Automated Speech Dubbing
//!
//! Entry point for the redub command line tool, which turns timed subtitle
//! segments into a dubbed audio track using a translation engine, a speech
//! engine and ffmpeg.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use redub::cli::{Args, Commands};
use redub::config::{AudioFormat, Config};
use redub::error::RedubError;
use redub::media::MuxerFactory;
use redub::pipeline::{ExitStatus, JobReport};
use redub::workflow::{ensure_parent_dir, RunRequest, Workflow};

const DEFAULT_CONFIG_FILE: &str = "redub.toml";
const FATAL_EXIT_CODE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = setup_logging(args.verbose) {
        eprintln!("Failed to set up logging: {:#}", e);
    }

    match execute(args).await {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            match e.downcast_ref::<RedubError>() {
                Some(inner) if inner.is_fatal() => error!("Cannot start job: {}", inner),
                _ => error!("{:#}", e),
            }
            ExitCode::from(FATAL_EXIT_CODE)
        }
    }
}

async fn execute(args: Args) -> Result<ExitStatus> {
    info!("Starting Redub - Automated Speech Dubbing");

    let mut config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Default configuration written to {}", output.display());
        }
        Commands::Mux { video, audio, output } => {
            let muxer = MuxerFactory::create_muxer(config.media.clone());
            muxer.check_availability().await?;
            info!("Using {}", muxer.version_info().await?);
            ensure_parent_dir(&output).await?;
            muxer.mux(&video, &audio, &output).await?;
        }
        Commands::Languages => {
            let workflow = Workflow::new(config).await?;
            let languages = workflow.registry().languages();

            println!("\nInstalled Translation Languages:");
            println!("{:<8} {:<20} {:<40}", "Code", "Name", "Targets");
            println!("{}", "-".repeat(68));
            for language in languages {
                println!(
                    "{:<8} {:<20} {:<40}",
                    language.code,
                    language.name,
                    language.targets.join(", ")
                );
            }
        }
        Commands::Voices => {
            let workflow = Workflow::new(config).await?;
            let voices = workflow.registry().voices();

            println!("\nInstalled Voices:");
            println!("{:<40} {:<10}", "Voice", "Language");
            println!("{}", "-".repeat(50));
            for voice in voices {
                println!("{:<40} {:<10}", voice.id, voice.language.as_deref().unwrap_or("-"));
            }
        }
        Commands::Check { source_lang, target_lang, voice } => {
            let workflow = Workflow::new(config).await?;
            let models = workflow.registry().prepare_job(&source_lang, &target_lang, &voice)?;
            println!("Translation route: {}", models.route);
            println!("Voice: {}", models.voice);
        }
        Commands::Run {
            input,
            source_lang,
            target_lang,
            voice,
            output,
            audio_format,
            workers,
            video,
            video_output,
            report,
            subtitles_output,
        } => {
            if let Some(workers) = workers {
                config.pipeline.workers = workers;
            }
            if let Some(format) = audio_format {
                config.media.audio_format = format.parse::<AudioFormat>()?;
            }
            config.validate()?;

            info!("Dubbing {} ({} -> {}) into {}", input.display(), source_lang, target_lang, output.display());

            let cancel = CancellationToken::new();
            let signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, finishing segments already in progress");
                    signal.cancel();
                }
            });

            let request = RunRequest {
                input,
                source_lang,
                target_lang,
                voice,
                output,
                video: video.zip(video_output),
                report,
                subtitles_output,
                show_progress: true,
            };

            let workflow = Workflow::new(config).await?;

            if request.input.is_dir() {
                let batch = workflow.run_batch(&request, cancel).await?;
                for (input, report) in &batch.completed {
                    print_summary(input, report);
                }
                for (input, reason) in &batch.failed {
                    println!("{}: failed ({})", input.display(), reason);
                }
                for input in &batch.skipped {
                    println!("{}: not started (cancelled)", input.display());
                }
                return Ok(batch.exit_status());
            }

            let report = workflow.run(&request, cancel).await?;
            print_summary(&request.input, &report);
            return Ok(report.exit_status());
        }
    }

    Ok(ExitStatus::Success)
}

fn print_summary(input: &Path, report: &JobReport) {
    println!(
        "{}: dubbed {} of {} segments ({} failed, {} cancelled, {} slot overruns), {:.2}s track",
        input.display(),
        report.succeeded,
        report.segments.len(),
        report.failed,
        report.cancelled,
        report.slot_overruns,
        report.track_duration_secs
    );
}

/// `--config`, else `./redub.toml` when present, else defaults.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            if local.exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(&local)?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".redub").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "redub.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("redub.log").display()
    );

    Ok(())
}
