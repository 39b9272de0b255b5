use crate::{
    config::Config,
    error::FileError,
    pdf::PdfBackend,
    result::TextPayload,
};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Full document text with `--- Page N ---` markers.
pub fn extract_text(cfg: &Config, backend: &dyn PdfBackend, path: &Path) -> Result<TextPayload, FileError> {
    if !path.exists() {
        return Err(FileError::NotFound(path.to_path_buf()));
    }
    let doc = backend.open(path)?;
    let page_count = doc.page_count();
    let mut pages = Vec::with_capacity(page_count as usize);
    for i in 0..page_count {
        pages.push(doc.page(i)?.text);
    }
    drop(doc);

    let text = assemble_pages(cfg, &pages);
    Ok(TextPayload {
        page_count,
        text_length: text.chars().count(),
        text,
    })
}

/// Joins page texts, skipping empty pages, then applies the `[text]`
/// normalization switches.
pub fn assemble_pages(cfg: &Config, pages: &[String]) -> String {
    let mut merged = String::new();
    for (i, page) in pages.iter().enumerate() {
        if page.is_empty() {
            continue;
        }
        merged.push_str(&format!("\n--- Page {} ---\n", i + 1));
        merged.push_str(page);
    }

    if cfg.text.normalize_newlines {
        merged = merged.replace("\r\n", "\n");
    }

    if cfg.text.normalize_unicode {
        merged = merged.nfkc().collect::<String>();
    }

    if cfg.text.trim_trailing_whitespace {
        merged = merged
            .lines()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n");
    }

    merged
}
