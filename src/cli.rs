use crate::{
    batch::{Coordinator, WorkerCount},
    capability::Capabilities,
    config::Config,
    discover::{collect_inputs, DiscoverOptions},
    extract::{BuiltinSchema, ExtractionSchema},
    pdf::{LopdfBackend, PdfBackend},
    report::{
        write_extraction_outputs, write_json, write_report, BatchReport, OutputFormat, RunMetadata,
        WriteOptions, ANALYZER_VERSION,
    },
    result::{FileResult, InspectionPayload, Payload},
    stats::{ErrorEntry, Statistics},
    task::{BatchOperation, FileTask, Operation, ProcessTask, TaskRunner},
    text::assemble_pages,
    util::{ensure_dir, format_bytes, format_pdf_date, now_rfc3339, sha256_hex, truncate_chars},
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILE: &str = "pdf-batch.log";
const PREVIEW_PAGES: u32 = 5;

#[derive(Parser, Debug)]
#[command(name = "pdf-batch")]
#[command(version, about = "Batch PDF inspection, text and structured data extraction")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./pdf-batch.toml if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also write logs to this file.
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    /// Debug logging and per-run statistics.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report which optional capabilities are available.
    Doctor {},
    /// Analyze a single PDF.
    Inspect {
        file: PathBuf,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
        /// Include a text preview from the first pages.
        #[arg(long)]
        text: bool,
        /// Preview length in characters.
        #[arg(long, default_value_t = 1000)]
        limit: usize,
        #[arg(long)]
        ocr: bool,
    },
    /// Process many PDFs concurrently and write one report.
    Batch(BatchArgs),
    /// Structured data extraction into per-file JSON documents.
    Extract(ExtractArgs),
}

#[derive(clap::Args, Debug)]
pub struct BatchArgs {
    /// Files and/or directories.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    #[arg(short, long)]
    pub output: PathBuf,
    /// json or csv.
    #[arg(short, long)]
    pub format: Option<String>,
    #[arg(short, long, allow_negative_numbers = true)]
    pub workers: Option<i64>,
    #[arg(short, long)]
    pub recursive: bool,
    /// File name glob used inside directories.
    #[arg(short, long)]
    pub pattern: Option<String>,
    /// Include statistics in the output.
    #[arg(short, long)]
    pub stats: bool,
    #[arg(long)]
    pub ocr: bool,
    #[arg(long, value_enum, default_value_t = BatchOperation::Inspect)]
    pub operation: BatchOperation,
    /// Batch deadline in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct ExtractArgs {
    #[arg(long, default_value = ".")]
    pub input: PathBuf,
    #[arg(long, default_value = "./extracted_data")]
    pub output: PathBuf,
    #[arg(long, value_enum, default_value_t = BuiltinSchema::Client)]
    pub schema: BuiltinSchema,
    /// Custom JSON schema; overrides --schema.
    #[arg(long)]
    pub schema_file: Option<PathBuf>,
    #[arg(long)]
    pub api_key: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(short, long, allow_negative_numbers = true)]
    pub workers: Option<i64>,
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = Config::resolve(args.config.as_deref())?;
    let log_path = resolve_log_path(&args, &cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Doctor {} => doctor(&cfg),
        Command::Inspect {
            file,
            json,
            text,
            limit,
            ocr,
        } => inspect(&cfg, file, *json, (*text).then_some(*limit), *ocr),
        Command::Batch(b) => batch(&args, &cfg, b),
        Command::Extract(e) => extract(&cfg, e),
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match (&args.log_level, args.verbose) {
        (Some(level), _) => level.as_str(),
        (None, true) => "debug",
        (None, false) => cfg.logging.level.as_str(),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(args: &Args, cfg: &Config) -> Option<PathBuf> {
    if let Some(p) = &args.log {
        return Some(p.clone());
    }
    if !cfg.logging.write_to_file {
        return None;
    }
    if cfg.logging.file_path.is_empty() {
        Some(PathBuf::from(DEFAULT_LOG_FILE))
    } else {
        Some(PathBuf::from(&cfg.logging.file_path))
    }
}

#[derive(Serialize)]
struct Doctor {
    version: &'static str,
    ocr: bool,
    pdftoppm: Option<PathBuf>,
    tesseract: Option<PathBuf>,
    extraction_service: bool,
    api_key_env: String,
    model: String,
}

fn doctor(cfg: &Config) -> Result<()> {
    let caps = Capabilities::detect(cfg, true, true, None)?.report();
    let diag = Doctor {
        version: ANALYZER_VERSION,
        ocr: caps.ocr,
        pdftoppm: which::which(&cfg.ocr.pdftoppm_exe).ok(),
        tesseract: which::which(&cfg.ocr.tesseract_exe).ok(),
        extraction_service: caps.extraction_service,
        api_key_env: cfg.extraction.api_key_env.clone(),
        model: cfg.extraction.model.clone(),
    };
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn inspect(cfg: &Config, file: &Path, json: bool, preview_limit: Option<usize>, ocr: bool) -> Result<()> {
    let ocr = ocr || cfg.inspect.enable_ocr;
    let backend: Arc<dyn PdfBackend> = Arc::new(LopdfBackend);
    let caps = Capabilities::detect(cfg, ocr, false, None)?;
    let runner = TaskRunner::new(cfg, backend.clone(), caps);

    let result = runner.process(&FileTask::new(file, Operation::Inspect).with_ocr(ocr));
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let success = match &result {
        FileResult::Success(s) => s,
        FileResult::Failure(f) => return Err(anyhow!("{}: {}", f.file_name, f.error)),
    };
    let Payload::Inspection(p) = &success.payload else {
        return Err(anyhow!("unexpected payload for inspect"));
    };

    print_inspection(&success.file_name, success.file_size_bytes, p);

    if let Some(limit) = preview_limit {
        let doc = backend.open(file)?;
        let pages = (0..doc.page_count().min(PREVIEW_PAGES))
            .map(|i| doc.page(i).map(|p| p.text))
            .collect::<Result<Vec<_>, _>>()?;
        let text = assemble_pages(cfg, &pages);
        println!("\nText preview (first {PREVIEW_PAGES} pages):");
        if text.trim().is_empty() {
            println!("  (no extractable text)");
        } else {
            let shown = truncate_chars(text.trim(), limit);
            println!("{shown}");
            if shown.len() < text.trim().len() {
                println!("... [truncated]");
            }
        }
    }
    Ok(())
}

fn print_inspection(name: &str, size: u64, p: &InspectionPayload) {
    println!("PDF Analysis: {name}");
    println!("{}", "=".repeat(50));
    println!("\nBasic Information:");
    println!("  Pages: {}", p.page_count);
    println!("  File size: {}", format_bytes(size));
    println!("  PDF version: {}", p.pdf_version.as_deref().unwrap_or("unknown"));
    println!("  Encrypted: {}", yes_no(p.is_encrypted));
    println!("  Has forms: {}", yes_no(p.has_forms));

    let fields = [
        ("Title", &p.title),
        ("Author", &p.author),
        ("Subject", &p.subject),
        ("Keywords", &p.keywords),
        ("Creator", &p.creator),
        ("Producer", &p.producer),
    ];
    if fields.iter().any(|(_, v)| v.is_some()) || p.creation_date.is_some() {
        println!("\nMetadata:");
        for (label, value) in fields {
            if let Some(v) = value {
                println!("  {label}: {v}");
            }
        }
        if let Some(d) = &p.creation_date {
            println!("  Created: {}", format_pdf_date(d));
        }
        if let Some(d) = &p.modification_date {
            println!("  Modified: {}", format_pdf_date(d));
        }
    }

    println!("\nPage Analysis:");
    println!("  Text characters: {}", p.total_text_length);
    println!("  Average text per page: {}", p.average_text_per_page);
    println!("  Images: {}", p.total_images);
    println!("  Links: {}", p.total_links);
    println!("  Form fields: {}", p.total_form_fields);
    println!("  Annotations: {}", yes_no(p.has_annotations));
    if !p.fonts.is_empty() {
        println!("  Fonts ({}): {}", p.fonts.len(), p.fonts.join(", "));
    }

    let mut sizes: BTreeMap<String, usize> = BTreeMap::new();
    for page in &p.page_details {
        *sizes
            .entry(format!("{:.0} x {:.0} pt", page.width, page.height))
            .or_default() += 1;
    }
    if !sizes.is_empty() {
        println!("\nPage Sizes:");
        for (dims, count) in sizes {
            println!("  {dims}: {count} page(s)");
        }
    }

    if let Some(sample) = &p.ocr_text_sample {
        println!("\nOCR sample:");
        println!("{sample}");
    } else if !p.first_page_preview.is_empty() {
        println!("\nFirst page: {}", p.first_page_preview);
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn batch(args: &Args, cfg: &Config, b: &BatchArgs) -> Result<()> {
    // Validate everything before touching any file.
    let format: OutputFormat = b.format.as_deref().unwrap_or(&cfg.output.format).parse()?;
    let workers = resolve_workers(cfg, b.workers)?;
    let opts = DiscoverOptions {
        pattern: b.pattern.clone().unwrap_or_else(|| cfg.batch.pattern.clone()),
        recursive: b.recursive || cfg.batch.recursive,
        reject_url_inputs: cfg.security.reject_url_inputs,
    };
    let files = collect_inputs(&b.inputs, &opts)?;
    let run_id = run_id(cfg, &files);
    info!("run_id={run_id} files={}", files.len());

    let ocr = b.ocr || cfg.inspect.enable_ocr;
    let caps = Capabilities::detect(cfg, ocr, false, None)?;
    let runner = Arc::new(TaskRunner::new(cfg, Arc::new(LopdfBackend), caps));
    let timeout = b.timeout.unwrap_or(cfg.batch.timeout_seconds);
    let coordinator = Coordinator::new(runner, workers).with_timeout(Some(Duration::from_secs(timeout)));

    let operation = Operation::from(b.operation);
    let tasks = files
        .iter()
        .map(|f| FileTask::new(f, operation.clone()).with_ocr(ocr))
        .collect();
    let report = coordinator.run(tasks);

    let include_stats = b.stats || cfg.output.include_stats;
    write_report(
        &report,
        &b.output,
        &WriteOptions {
            format,
            include_stats,
            run_id: &run_id,
            operation: operation.label(),
        },
    )?;

    if include_stats || args.verbose {
        log_statistics(&report);
    }
    info!(
        "done: {} succeeded, {} failed in {:.2}s",
        report.succeeded(),
        report.failed(),
        report.elapsed_seconds
    );
    Ok(())
}

fn resolve_workers(cfg: &Config, flag: Option<i64>) -> Result<WorkerCount> {
    let requested = flag.or((cfg.batch.workers != 0).then_some(cfg.batch.workers));
    Ok(WorkerCount::resolve(requested, cfg.batch.max_workers_cap)?)
}

/// Stable across runs with the same configuration and inputs.
fn run_id(cfg: &Config, files: &[PathBuf]) -> String {
    let mut inputs: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
    inputs.sort();
    let cfg_hash = sha256_hex(cfg.normalized_for_hash().as_bytes());
    sha256_hex(format!("{cfg_hash}:{}", inputs.join("\n")).as_bytes())
}

fn log_statistics(report: &BatchReport) {
    let stats = report.statistics();
    let s = &stats.summary;
    info!(
        "summary: total={} successful={} failed={} success_rate={}%",
        s.total_files, s.successful, s.failed, s.success_rate
    );
    let f = &stats.file_statistics;
    info!(
        "files: total={} MB average={} MB largest={} smallest={}",
        f.total_size_mb,
        f.average_size_mb,
        f.largest_file.as_deref().unwrap_or("-"),
        f.smallest_file.as_deref().unwrap_or("-")
    );
    let c = &stats.content_statistics;
    info!(
        "content: pages={} avg_pages={} text={} forms={} images={} encrypted={}",
        c.total_pages,
        c.average_pages,
        c.total_text_length,
        c.files_with_forms,
        c.files_with_images,
        c.encrypted_files
    );
    if report.elapsed_seconds > 0.0 {
        info!(
            "processing rate: {:.2} files/second",
            report.results.len() as f64 / report.elapsed_seconds
        );
    }
    for e in &stats.errors {
        info!("error: {}: {}", e.file, e.error);
    }
}

#[derive(Serialize)]
struct ExtractionSummary {
    metadata: RunMetadata,
    processed: Vec<String>,
    failed: Vec<ErrorEntry>,
    statistics: Statistics,
}

fn extract(cfg: &Config, e: &ExtractArgs) -> Result<()> {
    let mut cfg = cfg.clone();
    if let Some(model) = &e.model {
        cfg.extraction.model = model.clone();
    }

    let workers = resolve_workers(&cfg, e.workers)?;
    let schema = match &e.schema_file {
        Some(path) => ExtractionSchema::from_file(path, None)?,
        None => ExtractionSchema::builtin(e.schema),
    };
    let opts = DiscoverOptions {
        pattern: cfg.batch.pattern.clone(),
        recursive: true,
        reject_url_inputs: cfg.security.reject_url_inputs,
    };
    let files = collect_inputs(std::slice::from_ref(&e.input), &opts)?;
    ensure_dir(&e.output)?;

    let caps = Capabilities::detect(&cfg, false, true, e.api_key.clone())?;
    let runner = Arc::new(TaskRunner::new(&cfg, Arc::new(LopdfBackend), caps));
    let coordinator = Coordinator::new(runner, workers)
        .with_timeout(Some(Duration::from_secs(cfg.batch.timeout_seconds)));

    let operation = Operation::StructuredExtract(Arc::new(schema));
    let tasks = files
        .iter()
        .map(|f| FileTask::new(f, operation.clone()))
        .collect();
    let mut report = coordinator.run(tasks);
    report.sort_by_file_name();

    for dest in write_extraction_outputs(&report.results, &e.input, &e.output)? {
        info!("extracted: {}", dest.display());
    }
    let processed = report
        .results
        .iter()
        .filter(|r| r.is_success())
        .map(|r| r.file_name().to_string())
        .collect();

    let statistics = report.statistics();
    let summary = ExtractionSummary {
        metadata: RunMetadata {
            processing_date: now_rfc3339(),
            total_files: report.results.len(),
            analyzer_version: ANALYZER_VERSION.to_string(),
            workers_used: report.workers_used,
            run_id: run_id(&cfg, &files),
            operation: operation.label().to_string(),
        },
        processed,
        failed: statistics.errors.clone(),
        statistics,
    };
    let summary_path = e.output.join("extraction_summary.json");
    write_json(&summary_path, &summary)?;
    info!(
        "extraction complete: {} processed, {} failed; summary at {}",
        summary.processed.len(),
        summary.failed.len(),
        summary_path.display()
    );
    Ok(())
}
