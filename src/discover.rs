use crate::error::BatchError;
use globset::{Glob, GlobMatcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// How inputs are expanded into the file list.
#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    pub pattern: String,
    pub recursive: bool,
    pub reject_url_inputs: bool,
}

/// Expands files and directories into a de-duplicated, sorted list of PDF
/// paths.
///
/// Explicit paths that do not exist are kept so that they surface as
/// `not_found` results. Existing files that are not PDFs are skipped.
pub fn collect_inputs(inputs: &[PathBuf], opts: &DiscoverOptions) -> Result<Vec<PathBuf>, BatchError> {
    let matcher = compile(&opts.pattern)?;
    let mut found = BTreeSet::new();

    for input in inputs {
        let raw = input.display().to_string();
        if opts.reject_url_inputs && looks_like_url(&raw) {
            return Err(BatchError::InputRejected(format!("URL inputs are disabled: {raw}")));
        }

        if input.is_dir() {
            let before = found.len();
            found.extend(scan_dir(input, &matcher, opts.recursive));
            debug!("{}: {} matching files", input.display(), found.len() - before);
        } else if !input.exists() {
            warn!("input does not exist: {}", input.display());
            found.insert(input.clone());
        } else if is_pdf(input) {
            found.insert(input.clone());
        } else {
            warn!("skipping non-PDF file: {}", input.display());
        }
    }

    if found.is_empty() {
        return Err(BatchError::NoInputs);
    }
    Ok(found.into_iter().collect())
}

fn compile(pattern: &str) -> Result<GlobMatcher, BatchError> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| BatchError::InputRejected(format!("invalid pattern {pattern:?}: {e}")))
}

fn scan_dir(dir: &Path, matcher: &GlobMatcher, recursive: bool) -> Vec<PathBuf> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();

    walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!("walking {}: {err}", dir.display());
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| matcher.is_match(e.file_name()))
        .map(|e| e.into_path())
        .collect()
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

pub fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}
