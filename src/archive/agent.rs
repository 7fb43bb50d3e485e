use crate::archive::codec::FilingKey;
use crate::archive::subject::SubjectContext;
use crate::error::WorkflowError;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub const DEFAULT_AGENT_BIN: &str = "mec-fetch-agent";

/// One report the remote site claims exists. The name is advisory and only
/// used to reconstruct a filename; identity is `(report_id, year)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExpectedFiling {
    pub report_id: String,
    pub report_name: String,
    pub year: i32,
}

impl ExpectedFiling {
    pub fn key(&self) -> FilingKey {
        FilingKey {
            report_id: self.report_id.clone(),
            year: self.year,
        }
    }
}

/// Result of one discovery pass. Name searches may resolve the MECID here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoveryOutcome {
    #[serde(default)]
    pub mecid: Option<String>,
    #[serde(default)]
    pub reports: Vec<ExpectedFiling>,
}

/// The browser-automation side of the system. Discovery is authoritative;
/// fetching is best-effort and its success signal advisory only.
pub trait AcquisitionAgent {
    fn discover_expected(&self, subject: &SubjectContext) -> Result<DiscoveryOutcome>;

    fn fetch_missing(&self, subject: &SubjectContext, downloads_dir: &Path) -> Result<bool>;
}

fn ensure_executable_path(path: &Path) -> Result<()> {
    let meta = fs::metadata(path)
        .with_context(|| format!("agent binary path does not exist: {}", path.display()))?;
    if !meta.is_file() {
        anyhow::bail!("agent binary path is not a file: {}", path.display());
    }
    Ok(())
}

/// Agent backed by an external automation binary. The binary owns its own
/// timing, retries, and timeouts; this wrapper only shapes arguments and
/// parses the JSON it prints.
#[derive(Debug, Clone)]
pub struct ProcessAgent {
    bin: PathBuf,
}

impl ProcessAgent {
    pub fn from_env() -> Result<Self> {
        if let Ok(custom) = env::var("MECA_AGENT_BIN") {
            let trimmed = custom.trim();
            if !trimmed.is_empty() {
                let bin = PathBuf::from(trimmed);
                ensure_executable_path(&bin)?;
                return Ok(Self { bin });
            }
        }

        let bin = which::which(DEFAULT_AGENT_BIN).map_err(|_| {
            WorkflowError::MissingAgentBinary(format!(
                "set MECA_AGENT_BIN or put `{DEFAULT_AGENT_BIN}` on PATH"
            ))
        })?;
        Ok(Self { bin })
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new(&self.bin)
            .args(args)
            .output()
            .with_context(|| format!("failed to run `{} {}`", self.bin.display(), args.join(" ")))
    }
}

impl AcquisitionAgent for ProcessAgent {
    fn discover_expected(&self, subject: &SubjectContext) -> Result<DiscoveryOutcome> {
        let mut args = vec![
            "discover".to_string(),
            "--search-type".to_string(),
            subject.mode().as_str().to_string(),
            "--query".to_string(),
            subject.search_value().to_string(),
            "--json".to_string(),
        ];
        if let Some(mecid) = subject.mecid() {
            args.push("--mecid".to_string());
            args.push(mecid.to_string());
        }

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self.run(&arg_refs)?;
        if !out.status.success() {
            anyhow::bail!(
                "agent discover failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }

        let parsed: DiscoveryOutcome =
            serde_json::from_slice(&out.stdout).context("invalid JSON from agent discover")?;
        Ok(parsed)
    }

    fn fetch_missing(&self, subject: &SubjectContext, downloads_dir: &Path) -> Result<bool> {
        let mecid = subject
            .mecid()
            .context("fetch requires a resolved MECID")?;
        let dir = downloads_dir.display().to_string();

        let out = self.run(&[
            "fetch",
            "--mecid",
            mecid,
            "--dir",
            &dir,
            "--prefix",
            subject.prefix(),
            "--json",
        ])?;
        if !out.status.success() {
            return Ok(false);
        }

        // Older agents print nothing on success; treat absent/odd output as ok.
        let Ok(parsed) = serde_json::from_slice::<Value>(&out.stdout) else {
            return Ok(true);
        };
        Ok(parsed.get("ok").and_then(Value::as_bool).unwrap_or(true))
    }
}
