use crate::{
    error::FileError,
    extract::StructuredOutput,
    util::{file_name_of, now_rfc3339},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Outcome of one file task. Exactly one shape is populated; both carry the
/// path, the file name and a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileResult {
    Success(SuccessRecord),
    Failure(FailureRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessRecord {
    pub file_path: String,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub file_size_mb: f64,
    pub modified_date: Option<String>,
    pub analysis_timestamp: String,
    pub processing_time_seconds: f64,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub file_path: String,
    pub file_name: String,
    pub kind: FailureKind,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub analysis_timestamp: String,
    /// Best-effort structured output kept when the hosted service failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<StructuredOutput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    UnreadableDocument,
    InsufficientContent,
    ServiceFailure,
    Timeout,
    Internal,
}

impl FileResult {
    pub fn failure(path: &Path, err: FileError) -> Self {
        let kind = err.kind();
        let detail = error_chain(&err);
        let (error, fallback) = match err {
            FileError::Extract(crate::error::ExtractError::Service { message, fallback }) => {
                (message, Some(*fallback))
            }
            other => (other.to_string(), None),
        };
        FileResult::Failure(FailureRecord {
            file_path: path.display().to_string(),
            file_name: file_name_of(path),
            kind,
            error,
            detail,
            analysis_timestamp: now_rfc3339(),
            fallback,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileResult::Success(_))
    }

    pub fn file_path(&self) -> &str {
        match self {
            FileResult::Success(s) => &s.file_path,
            FileResult::Failure(f) => &f.file_path,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            FileResult::Success(s) => &s.file_name,
            FileResult::Failure(f) => &f.file_name,
        }
    }

    pub fn analysis_timestamp(&self) -> &str {
        match self {
            FileResult::Success(s) => &s.analysis_timestamp,
            FileResult::Failure(f) => &f.analysis_timestamp,
        }
    }

    pub fn as_success(&self) -> Option<&SuccessRecord> {
        match self {
            FileResult::Success(s) => Some(s),
            FileResult::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&FailureRecord> {
        match self {
            FileResult::Success(_) => None,
            FileResult::Failure(f) => Some(f),
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> Option<String> {
    let mut parts = Vec::new();
    let mut source = err.source();
    while let Some(s) = source {
        parts.push(s.to_string());
        source = s.source();
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(": "))
    }
}

/// Operation-specific part of a successful result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Inspection(InspectionPayload),
    Text(TextPayload),
    Extraction(ExtractionPayload),
}

impl Payload {
    pub fn page_count(&self) -> u32 {
        match self {
            Payload::Inspection(p) => p.page_count,
            Payload::Text(p) => p.page_count,
            Payload::Extraction(p) => p.page_count,
        }
    }

    pub fn text_length(&self) -> usize {
        match self {
            Payload::Inspection(p) => p.total_text_length,
            Payload::Text(p) => p.text_length,
            Payload::Extraction(p) => p.text_length,
        }
    }

    pub fn inspection(&self) -> Option<&InspectionPayload> {
        match self {
            Payload::Inspection(p) => Some(p),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectionPayload {
    pub page_count: u32,
    pub total_text_length: usize,
    pub average_text_per_page: f64,
    pub total_images: usize,
    pub total_links: usize,
    pub total_form_fields: usize,
    pub has_forms: bool,
    pub has_annotations: bool,
    pub is_encrypted: bool,
    pub pdf_version: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub fonts: Vec<String>,
    pub first_page_preview: String,
    pub page_details: Vec<PageDetail>,
    pub ocr_performed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_text_sample: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDetail {
    pub page_number: u32,
    pub text_length: usize,
    pub image_count: usize,
    pub link_count: usize,
    pub form_fields: usize,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    pub page_count: u32,
    pub text_length: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionPayload {
    pub schema: String,
    pub page_count: u32,
    pub text_length: usize,
    pub output: StructuredOutput,
}
