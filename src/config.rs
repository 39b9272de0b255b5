use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "pdf-batch.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub batch: Batch,
    #[serde(default)]
    pub inspect: Inspect,
    #[serde(default)]
    pub ocr: Ocr,
    #[serde(default)]
    pub text: Text,
    #[serde(default)]
    pub extraction: Extraction,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Explicit path must exist; otherwise `./pdf-batch.toml` if present,
    /// else built-in defaults.
    pub fn resolve(user: Option<&Path>) -> Result<Self> {
        if let Some(p) = user {
            return Self::load(p);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default.exists() {
            Self::load(&default)
        } else {
            Ok(Self::default())
        }
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Batch {
    /// 0 picks `min(max_workers_cap, cpus)`.
    pub workers: i64,
    pub max_workers_cap: usize,
    /// 0 disables the batch deadline.
    pub timeout_seconds: u64,
    pub pattern: String,
    pub recursive: bool,
}
impl Default for Batch {
    fn default() -> Self {
        Self {
            workers: 0,
            max_workers_cap: 8,
            timeout_seconds: 0,
            pattern: "*.pdf".into(),
            recursive: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Inspect {
    pub enable_ocr: bool,
    pub ocr_text_threshold: usize,
    pub ocr_max_pages: u32,
    pub ocr_scale: f32,
    pub preview_pages: usize,
    pub preview_chars: usize,
}
impl Default for Inspect {
    fn default() -> Self {
        Self {
            enable_ocr: false,
            ocr_text_threshold: 100,
            ocr_max_pages: 3,
            ocr_scale: 2.0,
            preview_pages: 5,
            preview_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ocr {
    pub pdftoppm_exe: String,
    pub tesseract_exe: String,
    pub language: String,
    pub timeout_seconds: u64,
}
impl Default for Ocr {
    fn default() -> Self {
        Self {
            pdftoppm_exe: "pdftoppm".into(),
            tesseract_exe: "tesseract".into(),
            language: "eng".into(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Text {
    pub normalize_unicode: bool,
    pub normalize_newlines: bool,
    pub trim_trailing_whitespace: bool,
}
impl Default for Text {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            normalize_newlines: true,
            trim_trailing_whitespace: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Extraction {
    pub api_key_env: String,
    pub endpoint: String,
    pub api_version: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_seconds: u64,
    pub min_text_chars: usize,
    pub max_name_candidates: usize,
}
impl Default for Extraction {
    fn default() -> Self {
        Self {
            api_key_env: "ANTHROPIC_API_KEY".into(),
            endpoint: "https://api.anthropic.com/v1/messages".into(),
            api_version: "2023-06-01".into(),
            model: "claude-3-haiku-20240307".into(),
            max_tokens: 2500,
            temperature: 0.0,
            request_timeout_seconds: 120,
            min_text_chars: 10,
            max_name_candidates: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub format: String,
    pub include_stats: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            format: "json".into(),
            include_stats: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    pub reject_url_inputs: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
        }
    }
}
