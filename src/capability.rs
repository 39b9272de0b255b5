use crate::{
    config::Config,
    extract::service::{AnthropicService, ExtractionService},
    ocr::{OcrEngine, TesseractOcr},
};
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Optional collaborators available to this run. Built once at startup and
/// passed down explicitly; an absent entry means the capability is off.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub ocr: Option<Arc<dyn OcrEngine>>,
    pub extraction: Option<Arc<dyn ExtractionService>>,
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_extraction(mut self, service: Arc<dyn ExtractionService>) -> Self {
        self.extraction = Some(service);
        self
    }

    /// Probes the environment for what the command asked for. `api_key`
    /// overrides the configured env var.
    pub fn detect(
        cfg: &Config,
        want_ocr: bool,
        want_extraction: bool,
        api_key: Option<String>,
    ) -> Result<Self> {
        let mut caps = Self::none();

        if want_ocr {
            match TesseractOcr::detect(cfg) {
                Ok(ocr) => {
                    info!(
                        "ocr available pdftoppm={} tesseract={}",
                        ocr.pdftoppm_path().display(),
                        ocr.tesseract_path().display()
                    );
                    caps.ocr = Some(Arc::new(ocr));
                }
                Err(err) => warn!("ocr requested but unavailable: {err:#}"),
            }
        }

        if !want_extraction {
            return Ok(caps);
        }

        let key = api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| resolve_api_key(cfg));
        match key {
            Some(key) => {
                caps.extraction = Some(Arc::new(AnthropicService::new(cfg, key)?));
            }
            None => warn!(
                "{} not set; structured extraction will use pattern matching only",
                cfg.extraction.api_key_env
            ),
        }

        Ok(caps)
    }

    pub fn report(&self) -> CapabilityReport {
        CapabilityReport {
            ocr: self.ocr.is_some(),
            extraction_service: self.extraction.is_some(),
        }
    }
}

fn resolve_api_key(cfg: &Config) -> Option<String> {
    std::env::var(&cfg.extraction.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
}

#[derive(Debug, Clone, Serialize)]
pub struct CapabilityReport {
    pub ocr: bool,
    pub extraction_service: bool,
}
