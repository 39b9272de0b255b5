use crate::{
    error::BatchError,
    result::FileResult,
    stats::{summarize, Statistics},
    util::{ensure_dir, now_rfc3339},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

pub const ANALYZER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Results of one batch run, in completion order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results: Vec<FileResult>,
    pub workers_used: usize,
    pub started_at: String,
    pub elapsed_seconds: f64,
}

impl BatchReport {
    pub fn new(
        results: Vec<FileResult>,
        workers_used: usize,
        started_at: String,
        elapsed_seconds: f64,
    ) -> Self {
        Self {
            results,
            workers_used,
            started_at,
            elapsed_seconds,
        }
    }

    pub fn statistics(&self) -> Statistics {
        summarize(&self.results)
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn sort_by_file_name(&mut self) {
        self.results
            .sort_by(|a, b| a.file_name().cmp(b.file_name()).then(a.file_path().cmp(b.file_path())));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(BatchError::UnsupportedEncoding(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub processing_date: String,
    pub total_files: usize,
    pub analyzer_version: String,
    pub workers_used: usize,
    pub run_id: String,
    pub operation: String,
}

/// The JSON document written for `--format json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEnvelope {
    pub metadata: RunMetadata,
    pub results: Vec<FileResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
}

pub struct WriteOptions<'a> {
    pub format: OutputFormat,
    pub include_stats: bool,
    pub run_id: &'a str,
    pub operation: &'a str,
}

/// Writes the report and returns every file written.
pub fn write_report(report: &BatchReport, dest: &Path, opts: &WriteOptions<'_>) -> Result<Vec<PathBuf>> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let mut written = vec![dest.to_path_buf()];
    match opts.format {
        OutputFormat::Json => {
            let envelope = ReportEnvelope {
                metadata: RunMetadata {
                    processing_date: now_rfc3339(),
                    total_files: report.results.len(),
                    analyzer_version: ANALYZER_VERSION.to_string(),
                    workers_used: report.workers_used,
                    run_id: opts.run_id.to_string(),
                    operation: opts.operation.to_string(),
                },
                results: report.results.clone(),
                statistics: opts.include_stats.then(|| report.statistics()),
            };
            write_json(dest, &envelope)?;
        }
        OutputFormat::Csv => {
            write_csv(&report.results, dest)?;
            if opts.include_stats {
                let stats_path = stats_sidecar_path(dest);
                write_json(&stats_path, &report.statistics())?;
                info!("statistics saved to: {}", stats_path.display());
                written.push(stats_path);
            }
        }
    }
    info!("results saved to: {}", dest.display());
    Ok(written)
}

pub fn read_report(path: &Path) -> Result<ReportEnvelope> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading report: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing report: {}", path.display()))
}

/// `results.csv` -> `results.stats.json`
pub fn stats_sidecar_path(dest: &Path) -> PathBuf {
    dest.with_extension("stats.json")
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    std::fs::write(path, raw).with_context(|| format!("writing {}", path.display()))
}

/// `root/a/b/memo.pdf` -> `a_b_memo`. Files outside `root`, or `root`
/// itself, use their bare stem.
pub fn extraction_output_stem(root: &Path, file: &Path) -> String {
    let rel = match file.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel,
        _ => Path::new(file.file_name().unwrap_or(file.as_os_str())),
    };
    rel.with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("_")
}

/// Writes one `<stem>_extracted.json` per result, failures included, and
/// returns the paths in result order. Stems that still clash get a numeric
/// suffix.
pub fn write_extraction_outputs(
    results: &[FileResult],
    root: &Path,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    ensure_dir(out_dir)?;
    let mut used = HashSet::new();
    let mut written = Vec::with_capacity(results.len());
    for result in results {
        let base = extraction_output_stem(root, Path::new(result.file_path()));
        let mut stem = base.clone();
        let mut n = 2;
        while !used.insert(stem.clone()) {
            stem = format!("{base}_{n}");
            n += 1;
        }
        let dest = out_dir.join(format!("{stem}_extracted.json"));
        write_json(&dest, result)?;
        written.push(dest);
    }
    Ok(written)
}

const CSV_HEADER: [&str; 14] = [
    "file_name",
    "file_path",
    "file_size_mb",
    "page_count",
    "total_text_length",
    "total_images",
    "has_forms",
    "is_encrypted",
    "pdf_version",
    "title",
    "author",
    "creation_date",
    "error",
    "processing_time",
];

/// One flattened CSV row. `None` renders as an empty cell.
#[derive(Debug, Default, Serialize)]
struct CsvRow<'a> {
    file_name: &'a str,
    file_path: &'a str,
    file_size_mb: Option<f64>,
    page_count: Option<u32>,
    total_text_length: Option<usize>,
    total_images: Option<usize>,
    has_forms: Option<bool>,
    is_encrypted: Option<bool>,
    pdf_version: Option<&'a str>,
    title: Option<&'a str>,
    author: Option<&'a str>,
    creation_date: Option<&'a str>,
    error: Option<&'a str>,
    processing_time: Option<f64>,
}

impl<'a> CsvRow<'a> {
    fn from_result(result: &'a FileResult) -> Self {
        match result {
            FileResult::Failure(f) => CsvRow {
                file_name: &f.file_name,
                file_path: &f.file_path,
                error: Some(&f.error),
                ..Default::default()
            },
            FileResult::Success(s) => {
                let mut row = CsvRow {
                    file_name: &s.file_name,
                    file_path: &s.file_path,
                    file_size_mb: Some(s.file_size_mb),
                    page_count: Some(s.payload.page_count()),
                    total_text_length: Some(s.payload.text_length()),
                    processing_time: Some(s.processing_time_seconds),
                    ..Default::default()
                };
                if let Some(p) = s.payload.inspection() {
                    row.total_images = Some(p.total_images);
                    row.has_forms = Some(p.has_forms);
                    row.is_encrypted = Some(p.is_encrypted);
                    row.pdf_version = p.pdf_version.as_deref();
                    row.title = p.title.as_deref();
                    row.author = p.author.as_deref();
                    row.creation_date = p.creation_date.as_deref();
                }
                row
            }
        }
    }
}

pub fn write_csv(results: &[FileResult], dest: &Path) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(dest)
        .with_context(|| format!("creating {}", dest.display()))?;
    wtr.write_record(CSV_HEADER)?;
    for result in results {
        wtr.serialize(CsvRow::from_result(result))?;
    }
    wtr.flush()?;
    Ok(())
}
