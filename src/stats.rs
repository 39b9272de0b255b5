use crate::{
    result::FileResult,
    util::{bytes_to_mb, round2},
};
use serde::{Deserialize, Serialize};

/// Aggregate view of a result set. Always derived from the full result
/// list, never updated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub summary: Summary,
    pub file_statistics: FileStatistics,
    pub content_statistics: ContentStatistics,
    pub processing_statistics: ProcessingStatistics,
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    /// Percentage, two decimals.
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStatistics {
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    pub average_size_mb: f64,
    pub largest_file: Option<String>,
    pub largest_file_bytes: Option<u64>,
    pub smallest_file: Option<String>,
    pub smallest_file_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentStatistics {
    pub total_pages: u64,
    pub average_pages: f64,
    pub total_text_length: u64,
    pub average_text_length: f64,
    pub files_with_forms: usize,
    pub files_with_images: usize,
    pub encrypted_files: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatistics {
    pub total_processing_time: f64,
    pub average_processing_time: f64,
    pub files_requiring_ocr: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub file: String,
    pub error: String,
}

/// For reproducible largest/smallest picks, sort `results` by file name
/// first: ties go to the first result seen.
pub fn summarize(results: &[FileResult]) -> Statistics {
    if results.is_empty() {
        return Statistics::default();
    }

    let successes: Vec<_> = results.iter().filter_map(FileResult::as_success).collect();
    let errors: Vec<ErrorEntry> = results
        .iter()
        .filter_map(FileResult::as_failure)
        .map(|f| ErrorEntry {
            file: f.file_name.clone(),
            error: f.error.clone(),
        })
        .collect();

    let total = results.len();
    let ok = successes.len();

    let mut largest: Option<(&str, u64)> = None;
    let mut smallest: Option<(&str, u64)> = None;
    for s in successes.iter().copied() {
        let size = s.file_size_bytes;
        if largest.is_none_or(|(_, best)| size > best) {
            largest = Some((s.file_name.as_str(), size));
        }
        if smallest.is_none_or(|(_, best)| size < best) {
            smallest = Some((s.file_name.as_str(), size));
        }
    }

    let total_size: u64 = successes.iter().map(|s| s.file_size_bytes).sum();
    let total_pages: u64 = successes.iter().map(|s| s.payload.page_count() as u64).sum();
    let total_text: u64 = successes.iter().map(|s| s.payload.text_length() as u64).sum();
    let inspections = || successes.iter().filter_map(|s| s.payload.inspection());

    // Failures carry no timing, so they count as zero here.
    let total_time: f64 = successes.iter().map(|s| s.processing_time_seconds).sum();

    let per_success = |value: f64| if ok > 0 { round2(value / ok as f64) } else { 0.0 };

    Statistics {
        summary: Summary {
            total_files: total,
            successful: ok,
            failed: total - ok,
            success_rate: round2(ok as f64 / total as f64 * 100.0),
        },
        file_statistics: FileStatistics {
            total_size_bytes: total_size,
            total_size_mb: round2(bytes_to_mb(total_size)),
            average_size_mb: per_success(bytes_to_mb(total_size)),
            largest_file: largest.map(|(n, _)| n.to_string()),
            largest_file_bytes: largest.map(|(_, b)| b),
            smallest_file: smallest.map(|(n, _)| n.to_string()),
            smallest_file_bytes: smallest.map(|(_, b)| b),
        },
        content_statistics: ContentStatistics {
            total_pages,
            average_pages: per_success(total_pages as f64),
            total_text_length: total_text,
            average_text_length: per_success(total_text as f64),
            files_with_forms: inspections().filter(|p| p.has_forms).count(),
            files_with_images: inspections().filter(|p| p.total_images > 0).count(),
            encrypted_files: inspections().filter(|p| p.is_encrypted).count(),
        },
        processing_statistics: ProcessingStatistics {
            total_processing_time: round2(total_time),
            average_processing_time: round2(total_time / total as f64),
            files_requiring_ocr: inspections().filter(|p| p.ocr_performed).count(),
        },
        errors,
    }
}
