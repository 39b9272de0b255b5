use crate::{
    capability::Capabilities,
    config::Config,
    error::{FileError, PdfError},
    extract::{ExtractionSchema, Extractor},
    inspect::{self, InspectPolicy},
    pdf::PdfBackend,
    result::{ExtractionPayload, FileResult, Payload, SuccessRecord},
    text,
    util::{bytes_to_mb, file_name_of, now_rfc3339, round2, system_time_rfc3339},
};
use clap::ValueEnum;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// One unit of batch work.
#[derive(Debug, Clone)]
pub struct FileTask {
    pub path: PathBuf,
    pub operation: Operation,
    pub ocr: bool,
}

impl FileTask {
    pub fn new(path: impl Into<PathBuf>, operation: Operation) -> Self {
        Self {
            path: path.into(),
            operation,
            ocr: false,
        }
    }

    pub fn with_ocr(mut self, ocr: bool) -> Self {
        self.ocr = ocr;
        self
    }
}

#[derive(Debug, Clone)]
pub enum Operation {
    Inspect,
    ExtractText,
    StructuredExtract(Arc<ExtractionSchema>),
}

impl Operation {
    pub fn label(&self) -> &str {
        match self {
            Operation::Inspect => "inspect",
            Operation::ExtractText => "text",
            Operation::StructuredExtract(s) => &s.id,
        }
    }
}

/// CLI-facing subset of [`Operation`] for the `batch` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOperation {
    Inspect,
    Text,
}

impl From<BatchOperation> for Operation {
    fn from(op: BatchOperation) -> Self {
        match op {
            BatchOperation::Inspect => Operation::Inspect,
            BatchOperation::Text => Operation::ExtractText,
        }
    }
}

/// Turns a task into exactly one result. Implementations must not panic
/// for ordinary failures; the coordinator still contains panics.
pub trait ProcessTask: Send + Sync {
    fn process(&self, task: &FileTask) -> FileResult;
}

/// Runs tasks against the real collaborators.
pub struct TaskRunner {
    cfg: Config,
    backend: Arc<dyn PdfBackend>,
    caps: Capabilities,
    policy: InspectPolicy,
    extractor: Extractor,
}

impl TaskRunner {
    pub fn new(cfg: &Config, backend: Arc<dyn PdfBackend>, caps: Capabilities) -> Self {
        let extractor = Extractor::new(cfg, caps.extraction.clone());
        Self {
            cfg: cfg.clone(),
            backend,
            policy: InspectPolicy::from_config(cfg),
            caps,
            extractor,
        }
    }

    fn payload(&self, task: &FileTask) -> Result<Payload, FileError> {
        match &task.operation {
            Operation::Inspect => inspect::inspect(
                self.backend.as_ref(),
                self.caps.ocr.as_deref(),
                &self.policy,
                &task.path,
                task.ocr,
            )
            .map(Payload::Inspection),
            Operation::ExtractText => {
                text::extract_text(&self.cfg, self.backend.as_ref(), &task.path).map(Payload::Text)
            }
            Operation::StructuredExtract(schema) => {
                let doc = text::extract_text(&self.cfg, self.backend.as_ref(), &task.path)?;
                let output = self.extractor.extract(
                    &doc.text,
                    &schema.schema,
                    schema.document_type.as_deref(),
                )?;
                Ok(Payload::Extraction(ExtractionPayload {
                    schema: schema.id.clone(),
                    page_count: doc.page_count,
                    text_length: doc.text_length,
                    output,
                }))
            }
        }
    }
}

impl ProcessTask for TaskRunner {
    fn process(&self, task: &FileTask) -> FileResult {
        let started = Instant::now();
        let meta = match std::fs::metadata(&task.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return FileResult::failure(&task.path, FileError::NotFound(task.path.clone()));
            }
            Err(e) => {
                return FileResult::failure(
                    &task.path,
                    FileError::UnreadableDocument(PdfError::Read {
                        path: task.path.clone(),
                        source: e,
                    }),
                );
            }
        };

        match self.payload(task) {
            Ok(payload) => success(&task.path, &meta, payload, started),
            Err(err) => FileResult::failure(&task.path, err),
        }
    }
}

fn success(path: &Path, meta: &std::fs::Metadata, payload: Payload, started: Instant) -> FileResult {
    FileResult::Success(SuccessRecord {
        file_path: path.display().to_string(),
        file_name: file_name_of(path),
        file_size_bytes: meta.len(),
        file_size_mb: round2(bytes_to_mb(meta.len())),
        modified_date: meta.modified().ok().map(system_time_rfc3339),
        analysis_timestamp: now_rfc3339(),
        processing_time_seconds: round2(started.elapsed().as_secs_f64()),
        payload,
    })
}
