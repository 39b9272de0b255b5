use super::{DocumentMetadata, PageContent, PdfBackend, PdfDocument};
use crate::error::PdfError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

// Page trees deeper than this are treated as malformed (guards Parent cycles).
const MAX_TREE_DEPTH: usize = 32;

// US Letter, used when no MediaBox is reachable.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Pure-Rust backend built on `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfBackend;

impl PdfBackend for LopdfBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, PdfError> {
        let bytes = std::fs::read(path).map_err(|source| PdfError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let doc = Document::load_mem(&bytes).map_err(|source| PdfError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let pages = doc.get_pages().into_iter().collect::<Vec<_>>();
        // lopdf does not decrypt on load, so the trailer keeps its Encrypt entry.
        let encrypted = doc.trailer.has(b"Encrypt");
        debug!(path = %path.display(), pages = pages.len(), "opened with lopdf");
        Ok(Box::new(LopdfDocument {
            doc,
            pages,
            encrypted,
        }))
    }
}

struct LopdfDocument {
    doc: Document,
    /// (1-based page number, page object)
    pages: Vec<(u32, ObjectId)>,
    encrypted: bool,
}

impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn metadata(&self) -> DocumentMetadata {
        let info = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|o| resolve_dict(&self.doc, o));
        let field = |key: &[u8]| -> Option<String> {
            let value = resolve(&self.doc, info?.get(key).ok()?)?;
            match value {
                Object::String(bytes, _) => {
                    let s = decode_pdf_string(bytes);
                    let s = s.trim();
                    (!s.is_empty()).then(|| s.to_string())
                }
                _ => None,
            }
        };
        DocumentMetadata {
            format: Some(format!("PDF {}", self.doc.version)),
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
            keywords: field(b"Keywords"),
            creator: field(b"Creator"),
            producer: field(b"Producer"),
            creation_date: field(b"CreationDate"),
            modification_date: field(b"ModDate"),
        }
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    fn page(&self, index: u32) -> Result<PageContent, PdfError> {
        let (number, id) = *self.pages.get(index as usize).ok_or(PdfError::Page {
            page: index + 1,
            message: "page index out of range".into(),
        })?;
        let page = match self.doc.get_object(id) {
            Ok(Object::Dictionary(d)) => d,
            Ok(_) => {
                return Err(PdfError::Page {
                    page: number,
                    message: "page object is not a dictionary".into(),
                });
            }
            Err(e) => {
                return Err(PdfError::Page {
                    page: number,
                    message: e.to_string(),
                });
            }
        };

        // Pages whose content streams lopdf cannot decode still count; they
        // just contribute no text.
        let text = match self.doc.extract_text(&[number]) {
            Ok(t) => t,
            Err(e) => {
                debug!(page = number, error = %e, "text extraction failed");
                String::new()
            }
        };

        let (width, height) = page_size(&self.doc, page);
        let resources = inherited(&self.doc, page, b"Resources").and_then(as_dict);
        let (link_count, form_fields, annotation_count) = count_annotations(&self.doc, page);

        Ok(PageContent {
            text,
            image_count: resources.map(|r| count_images(&self.doc, r)).unwrap_or(0),
            link_count,
            form_fields,
            annotation_count,
            fonts: resources.map(|r| font_names(&self.doc, r)).unwrap_or_default(),
            width,
            height,
        })
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn as_dict(obj: &Object) -> Option<&Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj).and_then(as_dict)
}

/// Looks `key` up on the page, then up the Pages tree.
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        node = resolve_dict(doc, node.get(b"Parent").ok()?)?;
    }
    None
}

fn name_is(obj: Option<&Object>, expected: &[u8]) -> bool {
    matches!(obj, Some(Object::Name(n)) if n.as_slice() == expected)
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f as f32),
        _ => None,
    }
}

fn page_size(doc: &Document, page: &Dictionary) -> (f32, f32) {
    let Some(Object::Array(bounds)) = inherited(doc, page, b"MediaBox") else {
        return DEFAULT_PAGE_SIZE;
    };
    let nums: Vec<f32> = bounds
        .iter()
        .filter_map(|o| resolve(doc, o).and_then(number))
        .collect();
    if nums.len() == 4 {
        ((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs())
    } else {
        DEFAULT_PAGE_SIZE
    }
}

fn count_images(doc: &Document, resources: &Dictionary) -> usize {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| resolve_dict(doc, o))
    else {
        return 0;
    };
    xobjects
        .iter()
        .filter_map(|(_, o)| resolve_dict(doc, o))
        .filter(|d| name_is(d.get(b"Subtype").ok(), b"Image"))
        .count()
}

fn font_names(doc: &Document, resources: &Dictionary) -> Vec<String> {
    let Some(fonts) = resources
        .get(b"Font")
        .ok()
        .and_then(|o| resolve_dict(doc, o))
    else {
        return Vec::new();
    };
    let names: BTreeSet<String> = fonts
        .iter()
        .filter_map(|(_, o)| resolve_dict(doc, o))
        .filter_map(|d| match d.get(b"BaseFont").ok()? {
            Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
            _ => None,
        })
        .collect();
    names.into_iter().collect()
}

/// (links, form widgets, all annotations)
fn count_annotations(doc: &Document, page: &Dictionary) -> (usize, usize, usize) {
    let Some(Object::Array(annots)) = page.get(b"Annots").ok().and_then(|o| resolve(doc, o))
    else {
        return (0, 0, 0);
    };
    let mut links = 0;
    let mut widgets = 0;
    let mut total = 0;
    for annot in annots.iter().filter_map(|o| resolve_dict(doc, o)) {
        total += 1;
        let subtype = annot.get(b"Subtype").ok();
        if name_is(subtype, b"Link") {
            links += 1;
        } else if name_is(subtype, b"Widget") {
            widgets += 1;
        }
    }
    (links, widgets, total)
}

/// Text strings are UTF-16BE with a BOM, UTF-8 with a BOM, or
/// PDFDocEncoding (approximated as Latin-1).
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}
