pub mod patterns;
pub mod schema;
pub mod service;

use crate::{config::Config, error::ExtractError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service::{ExtractionRequest, ExtractionService};
use std::sync::Arc;
use tracing::{debug, warn};

pub use patterns::{extract_patterns, PatternExtraction, PatternMatches};
pub use schema::{BuiltinSchema, ExtractionSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Service,
    PatternFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredOutput {
    pub method: ExtractionMethod,
    pub confidence: Confidence,
    pub document_type: Option<String>,
    pub data: Value,
}

impl StructuredOutput {
    fn fallback(extraction: PatternExtraction, document_type: Option<&str>) -> Self {
        Self {
            method: ExtractionMethod::PatternFallback,
            confidence: Confidence::Low,
            document_type: document_type.map(str::to_string),
            data: serde_json::to_value(extraction).unwrap_or(Value::Null),
        }
    }
}

/// Turns document text into schema-shaped data, through the hosted service
/// when one is configured and local pattern matching otherwise.
#[derive(Clone)]
pub struct Extractor {
    service: Option<Arc<dyn ExtractionService>>,
    min_text_chars: usize,
    max_name_candidates: usize,
}

impl Extractor {
    pub fn new(cfg: &Config, service: Option<Arc<dyn ExtractionService>>) -> Self {
        Self {
            service,
            min_text_chars: cfg.extraction.min_text_chars,
            max_name_candidates: cfg.extraction.max_name_candidates,
        }
    }

    pub fn has_service(&self) -> bool {
        self.service.is_some()
    }

    pub fn extract(
        &self,
        text: &str,
        schema: &Value,
        document_type: Option<&str>,
    ) -> Result<StructuredOutput, ExtractError> {
        let chars = text.trim().chars().count();
        if chars < self.min_text_chars {
            return Err(ExtractError::InsufficientContent {
                chars,
                min: self.min_text_chars,
            });
        }

        let Some(service) = &self.service else {
            debug!("no extraction service; using pattern matching");
            return Ok(self.pattern_fallback(text, document_type));
        };

        let request = ExtractionRequest {
            text,
            schema,
            document_type,
        };
        match service.extract(&request) {
            Ok(data) => Ok(StructuredOutput {
                method: ExtractionMethod::Service,
                confidence: Confidence::High,
                document_type: document_type.map(str::to_string),
                data,
            }),
            Err(err) => {
                warn!("structured extraction failed: {err}");
                Err(ExtractError::Service {
                    message: err.to_string(),
                    fallback: Box::new(self.pattern_fallback(text, document_type)),
                })
            }
        }
    }

    pub fn pattern_fallback(&self, text: &str, document_type: Option<&str>) -> StructuredOutput {
        StructuredOutput::fallback(
            extract_patterns(text, document_type, self.max_name_candidates),
            document_type,
        )
    }
}
