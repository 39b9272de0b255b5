use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Renders one page and returns whatever text the recognizer finds.
/// Accuracy is not guaranteed.
pub trait OcrEngine: Send + Sync {
    /// `page_number` is 1-based; `scale` is relative to 72 dpi.
    fn recognize(&self, pdf: &Path, page_number: u32, scale: f32) -> Result<String>;
}

/// `pdftoppm` (poppler) for rasterizing, `tesseract` for recognition.
pub struct TesseractOcr {
    pdftoppm: PathBuf,
    tesseract: PathBuf,
    language: String,
    timeout: Duration,
}

impl TesseractOcr {
    /// Fails when either executable cannot be found on PATH.
    pub fn detect(cfg: &Config) -> Result<Self> {
        let pdftoppm = which::which(&cfg.ocr.pdftoppm_exe)
            .with_context(|| format!("locating {}", cfg.ocr.pdftoppm_exe))?;
        let tesseract = which::which(&cfg.ocr.tesseract_exe)
            .with_context(|| format!("locating {}", cfg.ocr.tesseract_exe))?;
        Ok(Self {
            pdftoppm,
            tesseract,
            language: cfg.ocr.language.clone(),
            timeout: Duration::from_secs(cfg.ocr.timeout_seconds.max(1)),
        })
    }

    pub fn pdftoppm_path(&self) -> &Path {
        &self.pdftoppm
    }

    pub fn tesseract_path(&self) -> &Path {
        &self.tesseract
    }

    fn run(&self, cmd: &mut Command) -> Result<Output> {
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        debug!(?cmd, "ocr subprocess");
        let mut child = cmd.spawn().with_context(|| format!("spawning {cmd:?}"))?;
        let output = wait_with_timeout(&mut child, self.timeout)?;
        if !output.status.success() {
            return Err(anyhow!(
                "{:?} exited with {}: {}",
                cmd.get_program(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(output)
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, pdf: &Path, page_number: u32, scale: f32) -> Result<String> {
        let scratch = tempfile::tempdir().with_context(|| "creating OCR scratch dir")?;
        let prefix = scratch.path().join("page");
        let dpi = (72.0 * scale).round().max(1.0) as u32;
        let page = page_number.to_string();

        self.run(
            Command::new(&self.pdftoppm)
                .args(["-f", page.as_str(), "-l", page.as_str()])
                .args(["-r", &dpi.to_string()])
                .args(["-png", "-singlefile"])
                .arg(pdf)
                .arg(&prefix),
        )?;

        let image = prefix.with_extension("png");
        let out = self.run(
            Command::new(&self.tesseract)
                .arg(&image)
                .arg("stdout")
                .args(["-l", &self.language]),
        )?;
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // Drain pipes while waiting so a chatty child can't block on a full buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).with_context(|| "read stdout")?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).with_context(|| "read stderr")?;
        }
        Ok(buf)
    });

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            let stdout = stdout_thread
                .join()
                .map_err(|_| anyhow!("stdout reader thread panicked"))??;
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            return Ok(Output {
                status,
                stdout,
                stderr,
            });
        }

        if start.elapsed() > timeout {
            warn!("ocr process timed out after {:?}", timeout);
            let _ = child.kill();
            child.wait().with_context(|| "wait after kill")?;
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            let _ = stdout_thread.join();
            return Err(anyhow!(
                "ocr process exceeded timeout ({:?}); stderr: {}",
                timeout,
                String::from_utf8_lossy(&stderr)
            ));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
