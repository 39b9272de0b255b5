use crate::{
    config::Config,
    error::FileError,
    ocr::OcrEngine,
    pdf::PdfBackend,
    result::{InspectionPayload, PageDetail},
    util::{round2, truncate_chars},
};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

// Only this much of page 1 is considered for the preview.
const FIRST_PAGE_SAMPLE_CHARS: usize = 500;
const OCR_SAMPLE_CHARS: usize = 200;

pub const NO_OCR_TEXT: &str = "No text found via OCR";

/// Thresholds and caps that shape an inspection.
#[derive(Debug, Clone)]
pub struct InspectPolicy {
    pub ocr_text_threshold: usize,
    pub ocr_max_pages: u32,
    pub ocr_scale: f32,
    pub preview_pages: usize,
    pub preview_chars: usize,
}

impl InspectPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            ocr_text_threshold: cfg.inspect.ocr_text_threshold,
            ocr_max_pages: cfg.inspect.ocr_max_pages,
            ocr_scale: cfg.inspect.ocr_scale,
            preview_pages: cfg.inspect.preview_pages,
            preview_chars: cfg.inspect.preview_chars,
        }
    }
}

impl Default for InspectPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Reads one document and reduces it to an [`InspectionPayload`].
pub fn inspect(
    backend: &dyn PdfBackend,
    ocr: Option<&dyn OcrEngine>,
    policy: &InspectPolicy,
    path: &Path,
    ocr_requested: bool,
) -> Result<InspectionPayload, FileError> {
    if !path.exists() {
        return Err(FileError::NotFound(path.to_path_buf()));
    }

    let doc = backend.open(path)?;
    let meta = doc.metadata();
    let page_count = doc.page_count();

    let mut out = InspectionPayload {
        page_count,
        is_encrypted: doc.is_encrypted(),
        pdf_version: meta.format,
        title: meta.title,
        author: meta.author,
        subject: meta.subject,
        keywords: meta.keywords,
        creator: meta.creator,
        producer: meta.producer,
        creation_date: meta.creation_date,
        modification_date: meta.modification_date,
        ..Default::default()
    };

    let mut fonts = BTreeSet::new();
    for i in 0..page_count {
        let page = doc.page(i)?;
        let text_length = page.text.chars().count();

        out.total_text_length += text_length;
        out.total_images += page.image_count;
        out.total_links += page.link_count;
        out.total_form_fields += page.form_fields;
        out.has_forms |= page.form_fields > 0;
        out.has_annotations |= page.annotation_count > 0;
        fonts.extend(page.fonts);

        if i == 0 {
            out.first_page_preview = preview(&page.text, policy.preview_chars);
        }

        if out.page_details.len() < policy.preview_pages {
            out.page_details.push(PageDetail {
                page_number: i + 1,
                text_length,
                image_count: page.image_count,
                link_count: page.link_count,
                form_fields: page.form_fields,
                width: page.width,
                height: page.height,
            });
        }
    }
    out.fonts = fonts.into_iter().collect();
    out.average_text_per_page = if page_count > 0 {
        round2(out.total_text_length as f64 / page_count as f64)
    } else {
        0.0
    };

    drop(doc);

    if ocr_requested && out.total_text_length < policy.ocr_text_threshold {
        match ocr {
            Some(engine) => {
                let pages = policy.ocr_max_pages.min(page_count);
                debug!(path = %path.display(), pages, "low text; running ocr");
                out.ocr_performed = true;
                out.ocr_text_sample = Some(ocr_sample(engine, path, pages, policy.ocr_scale));
            }
            None => debug!(path = %path.display(), "low text but no ocr engine available"),
        }
    }

    Ok(out)
}

fn preview(first_page_text: &str, max_chars: usize) -> String {
    if first_page_text.is_empty() {
        return String::new();
    }
    let sample = truncate_chars(first_page_text, FIRST_PAGE_SAMPLE_CHARS).replace('\n', " ");
    format!("{}...", truncate_chars(&sample, max_chars))
}

fn ocr_sample(engine: &dyn OcrEngine, path: &Path, pages: u32, scale: f32) -> String {
    let mut parts = Vec::new();
    for page_number in 1..=pages {
        match engine.recognize(path, page_number, scale) {
            Ok(text) if !text.trim().is_empty() => {
                parts.push(format!(
                    "Page {page_number}: {}...",
                    truncate_chars(&text, OCR_SAMPLE_CHARS)
                ));
            }
            Ok(_) => {}
            Err(err) => warn!(path = %path.display(), page_number, "ocr failed: {err:#}"),
        }
    }
    if parts.is_empty() {
        NO_OCR_TEXT.to_string()
    } else {
        parts.join("\n")
    }
}
