#![allow(dead_code)]

use pdf_batch::{
    error::{PdfError, ServiceError},
    extract::service::{ExtractionRequest, ExtractionService},
    ocr::OcrEngine,
    pdf::{DocumentMetadata, PageContent, PdfBackend, PdfDocument},
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Clone, Default)]
pub struct FakeDoc {
    pub metadata: DocumentMetadata,
    pub encrypted: bool,
    pub pages: Vec<PageContent>,
}

impl FakeDoc {
    pub fn with_texts(texts: &[&str]) -> Self {
        Self {
            metadata: DocumentMetadata {
                format: Some("PDF 1.7".into()),
                ..Default::default()
            },
            encrypted: false,
            pages: texts
                .iter()
                .map(|t| PageContent {
                    text: t.to_string(),
                    width: 612.0,
                    height: 792.0,
                    ..Default::default()
                })
                .collect(),
        }
    }
}

impl PdfDocument for FakeDoc {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn metadata(&self) -> DocumentMetadata {
        self.metadata.clone()
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    fn page(&self, index: u32) -> Result<PageContent, PdfError> {
        self.pages
            .get(index as usize)
            .cloned()
            .ok_or_else(|| PdfError::Page {
                page: index + 1,
                message: "out of range".into(),
            })
    }
}

/// Serves documents by file name. Unknown names fail to open.
#[derive(Default)]
pub struct FakeBackend {
    docs: HashMap<String, FakeDoc>,
    panic_on: Option<String>,
    delay: Option<std::time::Duration>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, doc: FakeDoc) -> Self {
        self.docs.insert(name.to_string(), doc);
        self
    }

    pub fn panicking_on(mut self, name: &str) -> Self {
        self.panic_on = Some(name.to_string());
        self
    }

    pub fn slow(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl PdfBackend for FakeBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, PdfError> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if self.panic_on.as_deref() == Some(name.as_str()) {
            panic!("backend exploded on {name}");
        }
        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }
        self.docs
            .get(&name)
            .cloned()
            .map(|d| Box::new(d) as Box<dyn PdfDocument>)
            .ok_or_else(|| PdfError::Invalid(format!("not a PDF: {name}")))
    }
}

/// Writes placeholder bytes so the runner can stat the file.
pub fn touch(dir: &Path, name: &str, bytes: usize) -> PathBuf {
    let p = dir.join(name);
    std::fs::write(&p, vec![b'%'; bytes]).unwrap();
    p
}

pub struct FakeOcr {
    pub text: String,
    pub calls: Mutex<Vec<u32>>,
    failing: Vec<u32>,
}

impl FakeOcr {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: Mutex::new(Vec::new()),
            failing: Vec::new(),
        }
    }

    /// Errors on these 1-based pages instead of returning text.
    pub fn failing_on(mut self, pages: &[u32]) -> Self {
        self.failing = pages.to_vec();
        self
    }
}

impl OcrEngine for FakeOcr {
    fn recognize(&self, _pdf: &Path, page_number: u32, _scale: f32) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(page_number);
        if self.failing.contains(&page_number) {
            anyhow::bail!("tesseract exited with status 1 on page {page_number}");
        }
        Ok(self.text.clone())
    }
}

pub enum Reply {
    Data(Value),
    Fail,
}

pub struct CountingService {
    pub calls: AtomicUsize,
    reply: Reply,
}

impl CountingService {
    pub fn new(reply: Reply) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reply,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExtractionService for CountingService {
    fn extract(&self, _request: &ExtractionRequest<'_>) -> Result<Value, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Data(v) => Ok(v.clone()),
            Reply::Fail => Err(ServiceError::Status {
                status: 529,
                body: "overloaded".into(),
            }),
        }
    }
}
