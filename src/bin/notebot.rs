//! CLI binary for notebot.
//!
//! A thin shim over the library crate that maps CLI flags to `NoteConfig`
//! and runs the server, a batch, the startup checks, or the offline
//! structuring step.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use notebot::bootstrap::{prepare_directories, run_startup_checks};
use notebot::pipeline::llm::create_provider;
use notebot::pipeline::postprocess::sanitize_response;
use notebot::{
    is_error_marker, process_batch, BatchInput, FileStatus, NoteConfig, NoteSchema,
    ProcessingProgressCallback, ProgressCallback, StructuringStrategy,
};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar plus one log line per finished file. Files may finish out of
/// order when `--concurrency` is above 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Processing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map_or(0.0, |t| t.elapsed().as_secs_f64())
    }
}

impl ProcessingProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_files} file(s)…"))
        ));
    }

    fn on_file_start(&self, index: usize, _total: usize, filename: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(filename.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, filename: &str, notes_len: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            green("✓"),
            index,
            total,
            filename,
            dim(&format!("{notes_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, filename: &str, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index,
            total,
            filename,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let failed = total_files.saturating_sub(success_count);
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} file(s) processed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} file(s) processed  ({} failed)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the upload server on http://127.0.0.1:5000
  notebot serve

  # Process files from the command line
  notebot process meeting.txt whiteboard.jpg plan.docx

  # JSON report
  notebot process --json notes.pdf > report.json

  # Re-structure a saved model response offline
  cat response.md | notebot structure

  # Use the permissive strategy and a custom schema
  notebot --strategy permissive --schema schema.json process notes.txt

ENVIRONMENT VARIABLES:
  NOTEBOT_DATA_DIR      Data root (uploads/, outputs/, logs/, templates/)
  NOTEBOT_OLLAMA_HOST   Ollama base URL
  NOTEBOT_TEXT_MODEL    Structuring model
  NOTEBOT_VISION_MODEL  OCR model
  NOTEBOT_PROVIDER      edgequake-llm provider instead of Ollama (openai, anthropic, gemini, …)
  PDFIUM_LIB_PATH       Path to libpdfium (file or directory); system search path otherwise
  RUST_LOG              Overrides the log filter
"#;

/// Turn uploaded notes into structured Markdown project plans.
#[derive(Parser, Debug)]
#[command(
    name = "notebot",
    version,
    about = "Turn notes, documents and images into structured Markdown project plans",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Data root holding uploads/, outputs/, temp/, logs/, templates/, static/.
    #[arg(long, global = true, env = "NOTEBOT_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Ollama base URL.
    #[arg(long, global = true, env = "NOTEBOT_OLLAMA_HOST", default_value = "http://localhost:11434")]
    ollama_host: String,

    /// Model used to structure notes.
    #[arg(long, global = true, env = "NOTEBOT_TEXT_MODEL", default_value = "phi3:mini")]
    text_model: String,

    /// Vision model used to transcribe images.
    #[arg(long, global = true, env = "NOTEBOT_VISION_MODEL", default_value = "qwen2.5vl:7b")]
    vision_model: String,

    /// edgequake-llm provider to use instead of the built-in Ollama client.
    #[arg(long, global = true, env = "NOTEBOT_PROVIDER")]
    provider: Option<String>,

    /// Sampling temperature for structuring (0.0 to 2.0).
    #[arg(long, global = true, env = "NOTEBOT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Context window passed as `num_ctx`.
    #[arg(long, global = true, env = "NOTEBOT_NUM_CTX", default_value_t = 4096)]
    num_ctx: u32,

    /// Model call timeout in seconds.
    #[arg(long, global = true, env = "NOTEBOT_API_TIMEOUT", default_value_t = 600)]
    api_timeout: u64,

    /// Structuring strategy.
    #[arg(long, global = true, env = "NOTEBOT_STRATEGY", value_enum, default_value = "strict")]
    strategy: StrategyArg,

    /// JSON file overriding the note schema.
    #[arg(long, global = true, env = "NOTEBOT_SCHEMA")]
    schema: Option<PathBuf>,

    /// Files processed at once.
    #[arg(short, long, global = true, env = "NOTEBOT_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Enable DEBUG-level logs.
    #[arg(short, long, global = true, env = "NOTEBOT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "NOTEBOT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run startup checks, then serve the upload page and API.
    Serve {
        /// Listen address.
        #[arg(long, env = "NOTEBOT_BIND", default_value = "127.0.0.1:5000")]
        bind: String,

        /// Start without checking Ollama, models and the template.
        #[arg(long)]
        skip_checks: bool,
    },

    /// Process files and write notes to outputs/.
    Process {
        /// Files to process (.txt .doc .docx .pdf .png .jpg .jpeg .bmp .tiff .webp).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the batch report as JSON on stdout.
        #[arg(long)]
        json: bool,

        /// Disable the progress bar.
        #[arg(long, env = "NOTEBOT_NO_PROGRESS")]
        no_progress: bool,
    },

    /// Run the startup checks only.
    Check,

    /// Structure a model response offline (file or stdin) and print it.
    Structure {
        /// Response file; stdin when omitted.
        input: Option<PathBuf>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Strict,
    Permissive,
}

impl From<StrategyArg> for StructuringStrategy {
    fn from(v: StrategyArg) -> Self {
        match v {
            StrategyArg::Strict => StructuringStrategy::Strict,
            StrategyArg::Permissive => StructuringStrategy::Permissive,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let show_progress = matches!(
        cli.command,
        Command::Process { json: false, no_progress: false, .. }
    ) && !cli.quiet;
    init_logging(&cli, show_progress);

    match &cli.command {
        Command::Serve { bind, skip_checks } => run_serve(&cli, bind, *skip_checks).await,
        Command::Process { files, json, .. } => run_process(&cli, files, *json, show_progress).await,
        Command::Check => run_check(&cli).await,
        Command::Structure { input } => run_structure(&cli, input.as_deref()).await,
    }
}

// ── Subcommands ──────────────────────────────────────────────────────────────

async fn run_serve(cli: &Cli, bind: &str, skip_checks: bool) -> Result<()> {
    let config = build_config(cli, None).await?;
    info!("Project root: {}", config.paths.root.display());
    prepare_directories(&config.paths)
        .await
        .context("Failed to create data directories")?;

    if skip_checks {
        warn!("Startup checks skipped");
    } else if let Err(e) = run_startup_checks(&config).await {
        error!("{}", e);
        anyhow::bail!("Startup failed. Fix the errors above and try again.");
    } else {
        info!("All systems go! Launching NoteBot...");
    }

    notebot::server::serve(config, bind)
        .await
        .context("Server stopped")
}

async fn run_process(cli: &Cli, files: &[PathBuf], json: bool, show_progress: bool) -> Result<()> {
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ProcessingProgressCallback>)
    } else {
        None
    };
    let config = build_config(cli, progress).await?;
    prepare_directories(&config.paths)
        .await
        .context("Failed to create data directories")?;

    let inputs: Vec<BatchInput> = files.iter().cloned().map(BatchInput::from_path).collect();
    let report = process_batch(&inputs, &config)
        .await
        .context("Processing failed")?;

    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{out}");
    } else if !cli.quiet {
        for outcome in &report.outcomes {
            match (outcome.status, &outcome.output_path, &outcome.error) {
                (FileStatus::Success, Some(path), _) => {
                    eprintln!("{}  {}  →  {}", green("✔"), outcome.filename, bold(&path.display().to_string()))
                }
                (_, path, error) => {
                    eprintln!(
                        "{}  {}  {}",
                        red("✘"),
                        outcome.filename,
                        red(error.as_deref().unwrap_or("failed"))
                    );
                    if let Some(path) = path {
                        eprintln!("   fallback notes written to {}", dim(&path.display().to_string()));
                    }
                }
            }
        }
        eprintln!(
            "Processed {}/{} file(s) in {}ms",
            report.stats.succeeded, report.stats.total, report.stats.duration_ms
        );
    }

    if report.stats.total > 0 && report.stats.succeeded == 0 {
        anyhow::bail!("All {} file(s) failed", report.stats.total);
    }
    Ok(())
}

async fn run_check(cli: &Cli) -> Result<()> {
    let config = build_config(cli, None).await?;
    prepare_directories(&config.paths)
        .await
        .context("Failed to create data directories")?;
    let report = run_startup_checks(&config)
        .await
        .context("Startup checks failed")?;

    if !cli.quiet {
        for model in &report.models_present {
            eprintln!("{}  model {}", green("✔"), model);
        }
        for model in &report.models_pulled {
            eprintln!("{}  model {} (installed)", green("✔"), model);
        }
        if report.template_created {
            eprintln!("{}  created {}", green("✔"), config.paths.index_template().display());
        }
        eprintln!("{} All checks passed", green("✔"));
    }
    Ok(())
}

async fn run_structure(cli: &Cli, input: Option<&Path>) -> Result<()> {
    let config = build_config(cli, None).await?;
    let response = match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    if is_error_marker(&response) {
        anyhow::bail!("Input is an extraction error marker: {}", response.trim());
    }

    let document = config
        .strategy
        .apply(&sanitize_response(&response), &config.schema);
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(document.as_bytes())
        .context("Failed to write to stdout")?;
    if !document.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

// ── Setup ────────────────────────────────────────────────────────────────────

/// stderr logs plus a plain-text file under `<data_dir>/logs/`.
///
/// While the progress bar is active stderr only shows errors; the file
/// always receives `info` (or `debug` with `-v`).
fn init_logging(cli: &Cli, show_progress: bool) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    let file_level = if cli.verbose { "debug" } else { "info" };

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(env_filter(level));

    let file_layer = match &cli.command {
        Command::Structure { .. } => None,
        _ => open_log_file(&cli.data_dir.join("logs")).map(|file| {
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(env_filter(file_level))
        }),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn open_log_file(dir: &Path) -> Option<std::fs::File> {
    let name = format!("notebot_{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(name);
    let opened = std::fs::create_dir_all(dir).and_then(|()| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
    });
    match opened {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Could not open log file {}: {e}", path.display());
            None
        }
    }
}

/// Map CLI args to `NoteConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<NoteConfig> {
    let mut builder = NoteConfig::builder()
        .data_dir(&cli.data_dir)
        .ollama_host(&cli.ollama_host)
        .text_model(&cli.text_model)
        .vision_model(&cli.vision_model)
        .temperature(cli.temperature)
        .context_size(cli.num_ctx)
        .api_timeout_secs(cli.api_timeout)
        .strategy(cli.strategy.into())
        .concurrency(cli.concurrency);

    if let Some(ref path) = cli.schema {
        let schema = NoteSchema::from_json_file(path)
            .with_context(|| format!("Failed to load schema from {}", path.display()))?;
        builder = builder.schema(schema);
    }
    if let Some(ref name) = cli.provider {
        let provider = create_provider(name, &cli.text_model).context("Failed to create provider")?;
        builder = builder.provider(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
