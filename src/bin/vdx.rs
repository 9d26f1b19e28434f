//! CLI binary for voirdire-extract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, runs one job per input file, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use voirdire_extract::{
    extract_files, extract_from_file, ExtractError, ExtractionConfig, ExtractionMode,
    ExtractionProgressCallback, ExtractionSummary, JobOutcome, ProgressCallback, RecordKind,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar plus the
/// pipeline's per-unit phase labels ("Analyzing page 3 of 7...").
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose bar length is set by `on_job_start`.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_job_start(&self, total_units: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        self.bar.set_length(total_units as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Extracting");
    }

    fn on_unit_start(&self, _current: usize, _total: usize, phase_label: &str) {
        self.bar.set_message(phase_label.to_string());
    }

    fn on_unit_complete(&self, _current: usize, _total: usize, records_added: usize) {
        if records_added > 0 {
            self.bar
                .println(format!("{} {} records", green("✔"), records_added));
        }
        self.bar.inc(1);
    }

    fn on_unit_failed(&self, current: usize, _total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar
            .println(format!("{} unit {} failed: {}", red("✘"), current, error));
        self.bar.inc(1);
    }

    fn on_job_complete(&self, _total_units: usize, record_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} records extracted",
                green("✔"),
                bold(&record_count.to_string())
            );
        } else {
            eprintln!(
                "{} {} records extracted  ({} units failed)",
                cyan("⚠"),
                bold(&record_count.to_string()),
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract voir dire questions from a questionnaire PDF
  vdx questions.pdf

  # Extract juror rows from a pool sheet via the text pathway
  vdx --kind juror --mode text-batched pool-sheet.pdf

  # Up to five scanned pool-sheet photos, processed in parallel
  vdx --kind juror scan1.jpg scan2.jpg scan3.jpg

  # Write the summary as JSON
  vdx questions.pdf --out records.json

  # Treat a mid-job quota abort as a hard failure
  vdx --strict questions.pdf

ENVIRONMENT VARIABLES:
  VOIRDIRE_API_KEY    Extraction-service credential (required)
  VDX_ENDPOINT        Extraction-service URL
  PDFIUM_LIB_PATH     Path to an existing libpdfium

OUTCOMES:
  complete            every unit attempted, records extracted
  noRecordsFound      processing succeeded but nothing viable was found
  quotaExhausted      service quota hit mid-job; partial records returned
"#;

/// Extract voir dire questions or juror records from jury-pool documents.
#[derive(Parser, Debug)]
#[command(
    name = "vdx",
    version,
    about = "Extract voir dire questions and juror records from jury-pool PDFs and images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input PDF or image files. Multiple files run as parallel jobs (max 5).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Record schema to extract.
    #[arg(long, value_enum, default_value = "question")]
    kind: KindArg,

    /// Extraction pathway: image-individual or text-batched.
    #[arg(long, value_enum, default_value = "image-individual")]
    mode: ModeArg,

    /// Extraction-service URL.
    #[arg(long, env = "VDX_ENDPOINT", default_value = "http://localhost:3000/api/ai/extract")]
    endpoint: String,

    /// Extraction-service credential. Falls back to VOIRDIRE_API_KEY.
    #[arg(long, env = "VOIRDIRE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Write the JSON summary to this file instead of stdout.
    #[arg(short, long, env = "VDX_OUTPUT")]
    out: Option<PathBuf>,

    /// Page upscaling factor (1.5–4.0).
    #[arg(long, env = "VDX_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Pages per text batch.
    #[arg(long, env = "VDX_BATCH_SIZE", default_value_t = 3)]
    batch_size: usize,

    /// Delay between text batches in milliseconds.
    #[arg(long, env = "VDX_BATCH_DELAY_MS", default_value_t = 1000)]
    batch_delay_ms: u64,

    /// Tag ceiling per question (1–5).
    #[arg(long, env = "VDX_TAG_LIMIT", default_value_t = 3)]
    tag_limit: usize,

    /// Concurrent files in parallel mode (1–5).
    #[arg(long, env = "VDX_PARALLEL", default_value_t = 5)]
    parallel: usize,

    /// Per-extraction-call timeout in seconds.
    #[arg(long, env = "VDX_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Fail hard on a mid-job quota abort instead of keeping partial records.
    #[arg(long)]
    strict: bool,

    /// Disable the progress bar.
    #[arg(long, env = "VDX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "VDX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the JSON summary.
    #[arg(short, long, env = "VDX_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Question,
    Juror,
}

impl From<KindArg> for RecordKind {
    fn from(v: KindArg) -> Self {
        match v {
            KindArg::Question => RecordKind::Question,
            KindArg::Juror => RecordKind::Juror,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    ImageIndividual,
    TextBatched,
}

impl From<ModeArg> for ExtractionMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::ImageIndividual => ExtractionMode::ImageIndividual,
            ModeArg::TextBatched => ExtractionMode::TextBatched,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Suppress INFO-level library logs when the progress bar is active; the
    // bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && cli.inputs.len() == 1;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    if cli.inputs.len() == 1 {
        let summary = extract_from_file(&cli.inputs[0], &config)
            .await
            .context("Extraction failed")?;
        let summary = apply_strict(summary, cli.strict)?;
        report(&cli, &summary)?;
        emit(&cli, &serde_json::to_value(&summary)?).await?;
    } else {
        // Parallel mode: independent jobs, results in submission order.
        let results = extract_files(&cli.inputs, &config).await;
        let mut summaries = Vec::with_capacity(results.len());
        let mut any_failed = false;
        for (path, result) in cli.inputs.iter().zip(results) {
            match result {
                Ok(summary) => {
                    let summary = apply_strict(summary, cli.strict)?;
                    if !cli.quiet {
                        eprintln!(
                            "{} {}: {} records, {} failures",
                            green("✔"),
                            path.display(),
                            summary.records.len(),
                            summary.failures.len()
                        );
                    }
                    summaries.push(serde_json::json!({
                        "file": path.display().to_string(),
                        "summary": summary,
                    }));
                }
                Err(e) => {
                    any_failed = true;
                    eprintln!("{} {}: {}", red("✘"), path.display(), e);
                    summaries.push(serde_json::json!({
                        "file": path.display().to_string(),
                        "error": e.to_string(),
                    }));
                }
            }
        }
        emit(&cli, &serde_json::Value::Array(summaries)).await?;
        if any_failed && cli.strict {
            anyhow::bail!("one or more files failed");
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .mode(cli.mode.into())
        .record_kind(cli.kind.into())
        .endpoint(cli.endpoint.clone())
        .render_scale(cli.scale)
        .text_batch_size(cli.batch_size)
        .batch_delay_ms(cli.batch_delay_ms)
        .tag_limit(cli.tag_limit)
        .max_parallel_files(cli.parallel)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn apply_strict(summary: ExtractionSummary, strict: bool) -> Result<ExtractionSummary> {
    if strict {
        summary
            .into_strict()
            .map_err(|e: ExtractError| anyhow::anyhow!(e))
    } else {
        Ok(summary)
    }
}

/// Per-file human-readable summary on stderr.
fn report(cli: &Cli, summary: &ExtractionSummary) -> Result<()> {
    if cli.quiet {
        return Ok(());
    }
    match summary.outcome {
        JobOutcome::Complete if summary.failures.is_empty() => {}
        JobOutcome::Complete => eprintln!(
            "{} {} of {} units failed; results are partial",
            cyan("⚠"),
            summary.stats.units_failed,
            summary.stats.units_planned
        ),
        JobOutcome::NoRecordsFound => {
            eprintln!("{} no records found in this document", cyan("⚠"))
        }
        JobOutcome::QuotaExhausted => eprintln!(
            "{} quota exhausted after {}/{} units; partial records kept",
            cyan("⚠"),
            summary.stats.units_processed,
            summary.stats.units_planned
        ),
    }
    Ok(())
}

/// Write the JSON summary to `--out` (atomic tmp + rename) or stdout.
async fn emit(cli: &Cli, value: &serde_json::Value) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise summary")?;

    if let Some(ref path) = cli.out {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .with_context(|| format!("Failed to rename into {}", path.display()))?;
        if !cli.quiet {
            eprintln!("{} wrote {}", green("✔"), bold(&path.display().to_string()));
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(json.as_bytes())
            .context("Failed to write to stdout")?;
        handle.write_all(b"\n").ok();
    }
    Ok(())
}
