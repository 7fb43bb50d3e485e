use crate::archive::util::run_command_with_optional_timeout;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_PDF_TEXT_BIN: &str = "pdftotext";

// Recognized phrasings on the first page of a filing, in precedence order.
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Report Date\s*\n\s*(\d{1,2}/\d{1,2}/\d{4})",
        r"(?is)DATE OF REPORT.*?(\d{1,2}/\d{1,2}/\d{4})",
        r"(?i)Filed\s+on\s+(\d{1,2}/\d{1,2}/\d{4})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid pattern"))
    .collect()
});

/// Where the true filing date of a document comes from. `Ok(None)` means
/// the document was readable but carried no recognizable date.
pub trait FilingDateSource {
    fn extract_filing_date(&self, document: &Path) -> Result<Option<String>>;
}

pub fn first_date_match(text: &str) -> Option<String> {
    DATE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Date source backed by a `pdftotext`-style binary run against the first
/// page of the document.
#[derive(Debug, Clone)]
pub struct PdfTextExtractor {
    bin: PathBuf,
    timeout_secs: Option<u64>,
}

impl PdfTextExtractor {
    pub fn new(bin: PathBuf, timeout_secs: Option<u64>) -> Self {
        Self { bin, timeout_secs }
    }

    pub fn from_env(timeout_secs: Option<u64>) -> Result<Self> {
        if let Ok(custom) = env::var("MECA_PDF_TEXT_BIN") {
            let trimmed = custom.trim();
            if !trimmed.is_empty() {
                return Ok(Self::new(PathBuf::from(trimmed), timeout_secs));
            }
        }

        let bin = which::which(DEFAULT_PDF_TEXT_BIN).with_context(|| {
            format!("set MECA_PDF_TEXT_BIN or put `{DEFAULT_PDF_TEXT_BIN}` on PATH")
        })?;
        Ok(Self::new(bin, timeout_secs))
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }
}

impl FilingDateSource for PdfTextExtractor {
    fn extract_filing_date(&self, document: &Path) -> Result<Option<String>> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-f")
            .arg("1")
            .arg("-l")
            .arg("1")
            .arg(document)
            .arg("-");

        let out = run_command_with_optional_timeout(&mut cmd, self.timeout_secs)
            .with_context(|| format!("failed to run text extraction on {}", document.display()))?;
        if !out.status.success() {
            anyhow::bail!(
                "text extraction failed for {}: {}",
                document.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }

        Ok(first_date_match(&String::from_utf8_lossy(&out.stdout)))
    }
}
