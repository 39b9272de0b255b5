pub mod lopdf_backend;

use crate::error::PdfError;
use std::path::Path;

pub use lopdf_backend::LopdfBackend;

/// Opens documents. Implementations must be shareable across worker threads;
/// the documents they return are not.
pub trait PdfBackend: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, PdfError>;
}

/// An open document. Native resources are released when the handle drops.
pub trait PdfDocument {
    fn page_count(&self) -> u32;
    fn metadata(&self) -> DocumentMetadata;
    fn is_encrypted(&self) -> bool;
    /// `index` is 0-based.
    fn page(&self, index: u32) -> Result<PageContent, PdfError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    /// e.g. `PDF 1.7`
    pub format: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub text: String,
    pub image_count: usize,
    pub link_count: usize,
    pub form_fields: usize,
    pub annotation_count: usize,
    pub fonts: Vec<String>,
    pub width: f32,
    pub height: f32,
}
