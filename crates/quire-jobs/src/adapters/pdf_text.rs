//! PdfText extraction adapter: per-page text from PDFs using `pdftotext` (poppler-utils).

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use quire_core::defaults::PDF_EXTRACT_TIMEOUT_SECS;
use quire_core::{Error, PdfExtractor, PdfPage, Result};

/// Page separator emitted by `pdftotext`.
const FORM_FEED: char = '\u{c}';

/// Adapter for extracting page text from PDF bytes with `pdftotext -layout - -`.
///
/// The document is streamed over stdin and the text read from stdout, so no
/// temporary files are involved. Each invocation is guarded by a timeout and
/// the child is killed if the timeout fires.
pub struct PdfTextAdapter {
    binary: String,
    timeout: Duration,
}

impl Default for PdfTextAdapter {
    fn default() -> Self {
        Self::new(Duration::from_secs(PDF_EXTRACT_TIMEOUT_SECS))
    }
}

impl PdfTextAdapter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            binary: "pdftotext".to_string(),
            timeout,
        }
    }

    /// Use a different executable, e.g. an absolute path.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Whether the `pdftotext` binary can be executed.
    pub async fn health_check(&self) -> bool {
        match Command::new(&self.binary).arg("-v").output().await {
            // pdftotext -v exits with 0 or 99 depending on the version.
            Ok(output) => output.status.success() || output.status.code() == Some(99),
            Err(_) => false,
        }
    }

    async fn run(&self, data: &[u8]) -> Result<String> {
        let mut child = Command::new(&self.binary)
            .args(["-layout", "-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Extraction(format!("Failed to start {}: {}", self.binary, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Extraction("pdftotext stdin unavailable".to_string()))?;
        let input = data.to_vec();
        let writer = async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        };

        let (written, output) = tokio::join!(writer, child.wait_with_output());
        let output =
            output.map_err(|e| Error::Extraction(format!("Failed to run pdftotext: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Extraction(format!(
                "pdftotext failed (exit {}): {}",
                output.status,
                stderr.trim()
            )));
        }
        if let Err(e) = written {
            warn!(subsystem = "jobs", component = "pdf_text", error = %e, "pdftotext closed stdin early");
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Split `pdftotext` output into 1-based pages.
///
/// Every page is terminated by a form feed, so a trailing empty segment is
/// not a page. Blank pages in the middle are kept.
pub fn split_pages(text: &str) -> Vec<PdfPage> {
    let mut segments: Vec<&str> = text.split(FORM_FEED).collect();
    if segments.len() > 1 && segments.last().is_some_and(|s| s.trim().is_empty()) {
        segments.pop();
    }
    segments
        .into_iter()
        .enumerate()
        .map(|(i, content)| PdfPage {
            page_number: (i + 1) as i32,
            content: content.to_string(),
        })
        .collect()
}

#[async_trait]
impl PdfExtractor for PdfTextAdapter {
    async fn extract_pages(&self, data: &[u8]) -> Result<Vec<PdfPage>> {
        if data.is_empty() {
            return Err(Error::InvalidInput(
                "Cannot extract text from empty PDF data".to_string(),
            ));
        }

        // Validate PDF magic bytes (%PDF)
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::InvalidInput(
                "File is not a valid PDF (missing %PDF header)".to_string(),
            ));
        }

        let text = tokio::time::timeout(self.timeout, self.run(data))
            .await
            .map_err(|_| {
                Error::Extraction(format!(
                    "pdftotext timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        let pages = split_pages(&text);
        debug!(
            subsystem = "jobs",
            component = "pdf_text",
            bytes = data.len(),
            page_count = pages.len(),
            "PDF text extracted"
        );
        Ok(pages)
    }
}
