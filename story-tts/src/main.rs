//! story-tts - Turn a story text into one narrated WAV file with an external TTS engine

mod audio;
mod config;
mod driver;
mod pipeline;
mod task;
mod text;
mod tts;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Overrides, RunConfig};
use driver::{CancelFlag, ProgressEvent, ProgressSink};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use pipeline::Pipeline;
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use task::TaskFile;
use tokio::sync::mpsc::UnboundedReceiver;
use tts::{CommandEngine, SpeechEngine};

#[derive(Parser, Debug)]
#[command(name = "story-tts")]
#[command(about = "Turn a story text into one narrated WAV file", long_about = None)]
#[command(version)]
struct Args {
    /// Enable debug output
    #[arg(short, long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize the story described by a task file into a single WAV
    Run {
        /// Path to the task file
        #[arg(default_value = task::DEFAULT_TASK_FILE)]
        taskfile: PathBuf,

        /// Directory for the final file (default: the task file's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        chunking: ChunkArgs,

        /// File name prefix for per-chunk audio
        #[arg(long)]
        prefix: Option<String>,

        /// Engine program to run for each chunk
        #[arg(long)]
        engine: Option<String>,

        /// Keep per-chunk audio after merging
        #[arg(long)]
        keep_segments: bool,

        /// Print progress events and the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write one audio file per chunk without merging
    Generate {
        /// Story text file
        #[arg(long)]
        text: PathBuf,

        /// Reference voice audio
        #[arg(long)]
        voice: PathBuf,

        /// Directory for the chunk files
        #[arg(short, long)]
        output_dir: PathBuf,

        /// File name prefix for chunk files
        #[arg(long, default_value = "gen")]
        prefix: String,

        #[command(flatten)]
        chunking: ChunkArgs,

        /// Engine program to run for each chunk
        #[arg(long)]
        engine: Option<String>,

        /// Print progress events and the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how a text file would be chunked
    Chunk {
        /// Text file to chunk
        file: PathBuf,

        #[command(flatten)]
        chunking: ChunkArgs,
    },
    /// Concatenate WAV files that share one format
    Concat {
        /// Output WAV file
        output: PathBuf,

        /// Input WAV files, in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct ChunkArgs {
    /// Soft minimum chunk length in characters
    #[arg(long)]
    min_chars: Option<usize>,

    /// Hard maximum chunk length in characters
    #[arg(long)]
    max_chars: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    match args.command {
        Commands::Run {
            taskfile,
            output_dir,
            chunking,
            prefix,
            engine,
            keep_segments,
            json,
        } => {
            let task = TaskFile::load(&taskfile)?;
            let output_dir = output_dir.unwrap_or_else(|| parent_dir(&taskfile));
            let config = task.settings.clone().with_overrides(&Overrides {
                min_chars: chunking.min_chars,
                max_chars: chunking.max_chars,
                prefix,
                engine,
                keep_segments,
            });
            debug!("Task: {:?}", task);
            debug!("Settings: {:?}", config);

            let (pipeline, rx, cancel) = build_pipeline(config)?;
            let outcome = run_worker(rx, cancel, json, async move {
                pipeline.run(&task, &output_dir).await
            })
            .await?;

            if json {
                print_json(&outcome)?;
            } else {
                eprintln!(
                    "Output: {} ({:.1}s of audio)",
                    outcome.output.display(),
                    outcome.duration_secs
                );
                if !outcome.synthesis.failed.is_empty() {
                    eprintln!("Missing chunks: {:?}", outcome.synthesis.failed);
                }
            }
        }
        Commands::Generate {
            text,
            voice,
            output_dir,
            prefix,
            chunking,
            engine,
            json,
        } => {
            let config = RunConfig::default().with_overrides(&Overrides {
                min_chars: chunking.min_chars,
                max_chars: chunking.max_chars,
                prefix: Some(prefix),
                engine,
                keep_segments: false,
            });

            let (pipeline, rx, cancel) = build_pipeline(config)?;
            let report = run_worker(rx, cancel, json, async move {
                pipeline.generate(&text, &voice, &output_dir).await
            })
            .await?;

            if json {
                print_json(&report)?;
            } else {
                eprintln!(
                    "Generated {}/{} chunk files",
                    report.produced.len(),
                    report.total
                );
                if !report.failed.is_empty() {
                    eprintln!("Failed chunks: {:?}", report.failed);
                }
                if report.cancelled {
                    eprintln!("Cancelled; {} chunks were not generated", report.skipped());
                }
            }
        }
        Commands::Chunk { file, chunking } => {
            let defaults = RunConfig::default();
            let content = task::read_source("Text file", &file)?;
            let chunks = text::chunk_text(
                &content,
                chunking.min_chars.unwrap_or(defaults.min_chars),
                chunking.max_chars.unwrap_or(defaults.max_chars),
            )?;
            for chunk in &chunks {
                println!(
                    "{:>4}  {:>4}{}  {}",
                    chunk.ordinal(),
                    chunk.char_len(),
                    if chunk.hard_split { "*" } else { " " },
                    chunk.preview()
                );
            }
            eprintln!("Total chunks: {}", chunks.len());
        }
        Commands::Concat { output, inputs } => {
            let result = audio::concatenate_files(&inputs, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            eprintln!(
                "Output: {} ({} frames, {} Hz, {} ch)",
                result.path.display(),
                result.frames,
                result.format.frame_rate,
                result.format.channels
            );
        }
    }

    Ok(())
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Directory containing `path`, or `.` for a bare file name.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn build_pipeline(
    config: RunConfig,
) -> Result<(Pipeline, UnboundedReceiver<ProgressEvent>, CancelFlag)> {
    let engine: Arc<dyn SpeechEngine> = Arc::new(CommandEngine::new(&config.engine)?);
    let (sink, rx) = ProgressSink::channel();
    let cancel = CancelFlag::new();
    let pipeline = Pipeline::new(config, engine)
        .with_progress(sink)
        .with_cancel(cancel.clone());
    Ok((pipeline, rx, cancel))
}

/// Run `work` on a worker task while this task renders its progress.
async fn run_worker<T, F>(
    rx: UnboundedReceiver<ProgressEvent>,
    cancel: CancelFlag,
    json: bool,
    work: F,
) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    let worker = tokio::spawn(work);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current chunk");
            cancel.cancel();
        }
    });

    report_progress(rx, json).await;
    worker.await.context("Worker task panicked")?
}

/// Consume progress events until the worker drops its sender.
async fn report_progress(mut rx: UnboundedReceiver<ProgressEvent>, json: bool) {
    let pb = if json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    while let Some(event) = rx.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize progress event: {}", e),
            }
            continue;
        }

        match event {
            ProgressEvent::ChunksPlanned { total } => pb.set_length(total as u64),
            ProgressEvent::EngineReady { name } => pb.set_message(format!("engine: {}", name)),
            ProgressEvent::ChunkStarted { preview, .. } => pb.set_message(preview),
            ProgressEvent::ChunkRetry {
                ordinal, attempt, ..
            } => pb.println(format!("  chunk {}: attempt {} failed, retrying", ordinal, attempt)),
            ProgressEvent::ChunkCompleted { .. } => pb.inc(1),
            ProgressEvent::ChunkFailed { ordinal, error, .. } => {
                pb.inc(1);
                pb.println(format!("  chunk {} failed: {}", ordinal, error));
            }
            ProgressEvent::Cancelled { ordinal } => {
                pb.abandon_with_message(format!("cancelled before chunk {}", ordinal));
            }
            ProgressEvent::Concatenating { segments, .. } => {
                pb.set_message(format!("merging {} segments", segments));
            }
            ProgressEvent::Finished { .. } => pb.finish_with_message("done"),
        }
    }

    if !pb.is_finished() {
        pb.finish_and_clear();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
