use crate::result::FailureKind;
use std::path::PathBuf;
use thiserror::Error;

/// Batch-level configuration errors. These abort the run before any output
/// is written.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no PDF files found to process")]
    NoInputs,
    #[error("unsupported output format: {0} (expected json or csv)")]
    UnsupportedEncoding(String),
    #[error("worker count must be at least 1, got {0}")]
    InvalidWorkerCount(i64),
    #[error("input rejected: {0}")]
    InputRejected(String),
}

/// Errors from the PDF collaborator. Backend failures keep their cause as
/// `source` so it reaches the failure record's `detail`.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },
    #[error("not a readable PDF: {0}")]
    Invalid(String),
    #[error("page {page}: {message}")]
    Page { page: u32, message: String },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Response(String),
}

/// Per-file failures. Each one becomes a `failure` result instead of
/// stopping the batch.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error(transparent)]
    UnreadableDocument(#[from] PdfError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("timed out before the file was processed")]
    Timeout,
    #[error("{0}")]
    Internal(String),
}

impl FileError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FileError::NotFound(_) => FailureKind::NotFound,
            FileError::UnreadableDocument(_) => FailureKind::UnreadableDocument,
            FileError::Extract(ExtractError::InsufficientContent { .. }) => {
                FailureKind::InsufficientContent
            }
            FileError::Extract(ExtractError::Service { .. }) => FailureKind::ServiceFailure,
            FileError::Timeout => FailureKind::Timeout,
            FileError::Internal(_) => FailureKind::Internal,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Not enough text extracted from document ({chars} < {min} characters)")]
    InsufficientContent { chars: usize, min: usize },
    #[error("structured extraction service failed: {message}")]
    Service {
        message: String,
        fallback: Box<crate::extract::StructuredOutput>,
    },
}

