//! CLI binary for sentinai.
//!
//! `sentinai serve` starts the web UI; `sentinai audit` runs one audit from
//! the terminal. Both map flags to `AuditConfig` and share one model client.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use sentinai::client::export_provider_key;
use sentinai::pipeline::frame::FfmpegDecoder;
use sentinai::web::{build_router, AppState};
use sentinai::{
    load_source, AuditConfig, AuditOutcome, AuditProgressCallback, AuditReport, AuditRequest,
    AuditStage, Auditor, LlmModelClient, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner with one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    stage_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_started: Mutex::new(None),
        })
    }

    /// Stop the spinner without a summary, e.g. before a fatal error prints.
    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl AuditProgressCallback for CliProgressCallback {
    fn on_audit_start(&self, topic: &str) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Auditing against the '{topic}' rule…"))
        ));
    }

    fn on_stage_start(&self, stage: AuditStage) {
        if let Ok(mut started) = self.stage_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message("🤖 AI Auditor is working…");
    }

    fn on_stage_complete(&self, stage: AuditStage, detail: &str) {
        let elapsed = self
            .stage_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);

        // Keep one line per stage even when the detail is a whole rule.
        let detail = if detail.chars().count() > 80 {
            let cut: String = detail.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            detail.to_string()
        };

        self.bar.println(format!(
            "  {} {:<20} {}  {}",
            green("✓"),
            stage.to_string(),
            dim(&detail),
            dim(&format!("{elapsed:.1}s")),
        ));
    }

    fn on_audit_complete(&self, _outcome: &AuditOutcome) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the web UI on http://127.0.0.1:8501
  sentinai serve

  # Listen on all interfaces, another port
  sentinai serve --host 0.0.0.0 --port 8080

  # Headless audit
  sentinai audit --manual safety.pdf --video floor-cam.mp4

  # Another rule, JSON report
  sentinai audit --manual safety.pdf --video clip.mp4 --topic "hard hat" --json

  # Inputs from URLs
  sentinai audit --manual https://example.com/manual.pdf --video https://example.com/clip.mp4

EXIT CODES (audit):
  0   verdict is pass-styled (contains "PASS")
  1   fatal error (bad input, missing tools, no credential)
  2   any other outcome (FAIL, model error, unreadable video, no frame)

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY      Gemini API key (required; GEMINI_API_KEY is accepted too)
  SENTINAI_PROVIDER   LLM provider (default: gemini)
  SENTINAI_MODEL      Model ID (default: gemini-flash-latest)
  SENTINAI_WORK_DIR   Directory for temporary video/frame files
  PDFIUM_LIB_PATH     Path to libpdfium (file or directory)
  RUST_LOG            Log filter, overrides -v / -q

A .env file in the working directory is loaded at startup.
"#;

/// Audit CCTV footage against rules from a PDF safety manual.
#[derive(Parser, Debug)]
#[command(
    name = "sentinai",
    version,
    about = "SentinAI: Industrial Compliance Auditor",
    long_about = "Extracts a rule from a PDF safety manual with a text LLM, samples the middle \
frame of an MP4 clip and asks a vision LLM whether the frame complies with the rule.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the web UI.
    Serve(ServeArgs),
    /// Run one audit and print the result.
    Audit(AuditArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// LLM model ID used for both calls.
    #[arg(long, global = true, env = "SENTINAI_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, …
    #[arg(long, global = true, env = "SENTINAI_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0). Provider default when omitted.
    #[arg(long, global = true, env = "SENTINAI_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max LLM output tokens per call.
    #[arg(long, global = true, env = "SENTINAI_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Directory for temporary video and frame files.
    #[arg(long, global = true, env = "SENTINAI_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// ffmpeg executable.
    #[arg(long, global = true, env = "SENTINAI_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// ffprobe executable.
    #[arg(long, global = true, env = "SENTINAI_FFPROBE", default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// Path to libpdfium (file or containing directory).
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// JPEG quality of the sampled frame (1–100).
    #[arg(long, global = true, env = "SENTINAI_JPEG_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SENTINAI_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SENTINAI_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind.
    #[arg(long, env = "SENTINAI_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "SENTINAI_PORT", default_value_t = 8501)]
    port: u16,

    /// Topic pre-filled in the form.
    #[arg(long, env = "SENTINAI_TOPIC", default_value = sentinai::config::DEFAULT_TOPIC)]
    topic: String,

    /// Maximum upload request size in MiB.
    #[arg(long, env = "SENTINAI_MAX_UPLOAD_MB", default_value_t = 200)]
    max_upload_mb: usize,
}

#[derive(Args, Debug)]
struct AuditArgs {
    /// Safety manual: local PDF path or HTTP/HTTPS URL.
    #[arg(long)]
    manual: String,

    /// CCTV clip: local MP4 path or HTTP/HTTPS URL.
    #[arg(long)]
    video: String,

    /// Rule topic to look up in the manual.
    #[arg(long, default_value = sentinai::config::DEFAULT_TOPIC)]
    topic: String,

    /// Print the full report as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "SENTINAI_NO_PROGRESS")]
    no_progress: bool,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "SENTINAI_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

fn main() -> Result<ExitCode> {
    // The environment is only touched here, before any runtime thread exists.
    dotenvy::dotenv().ok();
    export_provider_key();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = match &cli.command {
        Command::Audit(a) => !cli.common.quiet && !a.no_progress && !a.json,
        Command::Serve(_) => false,
    };
    let filter = if cli.common.verbose {
        "debug"
    } else if cli.common.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let Cli { command, common } = cli;
    let runtime = tokio::runtime::Runtime::new().context("Failed to start the tokio runtime")?;
    runtime.block_on(async move {
        match command {
            Command::Serve(args) => serve(&common, args).await.map(|_| ExitCode::SUCCESS),
            Command::Audit(args) => audit(&common, args, show_progress).await,
        }
    })
}

fn build_config(
    common: &CommonArgs,
    progress: Option<ProgressCallback>,
    customise: impl FnOnce(sentinai::AuditConfigBuilder) -> sentinai::AuditConfigBuilder,
) -> Result<AuditConfig> {
    let mut builder = AuditConfig::builder()
        .ffmpeg_path(&common.ffmpeg)
        .ffprobe_path(&common.ffprobe)
        .jpeg_quality(common.jpeg_quality);

    if let Some(ref model) = common.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = common.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(t) = common.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = common.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(ref dir) = common.work_dir {
        builder = builder.work_dir(dir);
    }
    if let Some(ref lib) = common.pdfium_lib {
        builder = builder.pdfium_lib_path(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    customise(builder).build().context("Invalid configuration")
}

fn build_auditor(config: AuditConfig) -> Result<Auditor> {
    let client = LlmModelClient::from_config(&config)
        .context("Failed to initialise the model client")?;

    let decoder = FfmpegDecoder::new(&config.ffmpeg_path, &config.ffprobe_path);
    if !decoder.is_available() {
        warn!(
            "ffmpeg/ffprobe not runnable ({} / {}); video audits will fail",
            config.ffmpeg_path.display(),
            config.ffprobe_path.display()
        );
    }

    Ok(Auditor::with_default_backends(Arc::new(client), config))
}

// ── serve ────────────────────────────────────────────────────────────────────

async fn serve(common: &CommonArgs, args: ServeArgs) -> Result<()> {
    let topic = args.topic.clone();
    let max_upload = args.max_upload_mb.saturating_mul(1024 * 1024);
    let config = build_config(common, None, |b| {
        b.default_topic(topic).max_upload_bytes(max_upload)
    })?;
    let auditor = build_auditor(config)?;

    let app = build_router(AppState::new(Arc::new(auditor)));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("SentinAI listening on http://{}", addr);
    if !common.quiet {
        eprintln!(
            "{} {}",
            cyan("◆"),
            bold(&format!("SentinAI auditor running at http://{addr}"))
        );
    }

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

// ── audit ────────────────────────────────────────────────────────────────────

async fn audit(common: &CommonArgs, args: AuditArgs, show_progress: bool) -> Result<ExitCode> {
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress = spinner.clone().map(|s| s as ProgressCallback);
    let timeout = args.download_timeout;
    let result = match build_config(common, progress, |b| b.download_timeout_secs(timeout))
        .and_then(build_auditor)
    {
        Ok(auditor) => run_audit(&auditor, &args).await,
        Err(e) => Err(e),
    };
    if let (Err(_), Some(spinner)) = (&result, &spinner) {
        spinner.clear();
    }
    let report = result?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print_report(&report);
    }

    Ok(if report.outcome.is_pass_styled() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

async fn run_audit(auditor: &Auditor, args: &AuditArgs) -> Result<AuditReport> {
    let timeout = auditor.config().download_timeout_secs;
    let manual = load_source(&args.manual, timeout)
        .await
        .with_context(|| format!("Failed to load manual '{}'", args.manual))?;
    let video = load_source(&args.video, timeout)
        .await
        .with_context(|| format!("Failed to load video '{}'", args.video))?;

    auditor
        .run(AuditRequest {
            manual: Some(manual),
            video: Some(video),
            topic: args.topic.clone(),
        })
        .await
        .context("Audit failed")
}

fn print_report(report: &AuditReport) {
    println!("{}  {}", bold("Topic:"), report.topic);
    println!("{}  {}", bold("Model:"), report.model);

    match &report.outcome {
        AuditOutcome::RuleUnavailable { failure } => {
            println!("{}", red(&failure.to_string()));
        }
        AuditOutcome::VideoUnreadable { rule, detail } => {
            println!("{}   {}", bold("Rule:"), green(rule.as_str()));
            println!("{}", red("Error: Could not load video file."));
            println!("{}", dim(detail));
        }
        AuditOutcome::NoFrame { rule, total_frames } => {
            println!("{}   {}", bold("Rule:"), green(rule.as_str()));
            println!(
                "{}",
                dim(&format!("No frame could be sampled ({total_frames} frames)."))
            );
        }
        AuditOutcome::Judged {
            rule,
            frame,
            judgment,
        } => {
            println!("{}   {}", bold("Rule:"), green(rule.as_str()));
            println!(
                "{}  {} of {} ({}×{})",
                bold("Frame:"),
                frame.index,
                frame.total_frames,
                frame.width,
                frame.height
            );
            println!();
            match judgment {
                Ok(verdict) if verdict.is_pass() => println!("{}", green(&verdict.text)),
                Ok(verdict) => println!("{}", red(&verdict.text)),
                Err(failure) => println!("{}", red(&failure.to_string())),
            }
        }
    }

    let s = &report.stats;
    eprintln!(
        "{}",
        dim(&format!(
            "{} pages · {} in / {} out tokens · {:.1}s",
            s.manual_pages,
            s.total_input_tokens,
            s.total_output_tokens,
            s.total_duration_ms as f64 / 1000.0
        ))
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_audit(extra: &[&str]) -> (CommonArgs, AuditArgs) {
        let mut argv = vec!["sentinai", "audit", "--manual", "m.pdf", "--video", "v.mp4"];
        argv.extend_from_slice(extra);
        let Cli { command, common } = Cli::try_parse_from(argv).unwrap();
        match command {
            Command::Audit(args) => (common, args),
            Command::Serve(_) => panic!("expected the audit subcommand"),
        }
    }

    #[test]
    fn download_timeout_flag_reaches_the_config() {
        let (common, args) = parse_audit(&["--download-timeout", "7"]);
        let timeout = args.download_timeout;
        let config = build_config(&common, None, |b| b.download_timeout_secs(timeout)).unwrap();
        assert_eq!(config.download_timeout_secs, 7);
    }

    #[test]
    fn clearing_the_spinner_finishes_it() {
        let spinner = CliProgressCallback::new();
        assert!(!spinner.bar.is_finished());
        spinner.clear();
        assert!(spinner.bar.is_finished());
    }
}
