use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::archive::agent::ProcessAgent;
use crate::archive::codec::FilenameCodec;
use crate::archive::config::{self, AuditConfig, load_config};
use crate::archive::extractor::PdfTextExtractor;
use crate::archive::inventory::scan_inventory;
use crate::archive::paths::{ArchivePaths, resolve_paths};
use crate::archive::subject::SubjectContext;
use crate::commands::CommandReport;

#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    pub mecid: Option<String>,
}

fn unknown_meca_env_keys() -> Vec<String> {
    let mut out = Vec::new();
    for (key, _) in env::vars() {
        if !key.starts_with("MECA_") {
            continue;
        }
        if config::env_allowlist::GENERATED_MECA_ENV_ALLOWLIST.contains(&key.as_str()) {
            continue;
        }
        out.push(key);
    }
    out.sort();
    out
}

fn file_hash(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Sweep one MECID folder for archive damage the filename grammar cannot
/// express: truncated downloads and byte-identical files filed under
/// different keys.
fn integrity_report(paths: &ArchivePaths, cfg: &AuditConfig, mecid: &str) -> Result<CommandReport> {
    let mut report = CommandReport::new("integrity");
    let subject = SubjectContext::by_mecid(mecid);
    let dir = paths.subject_dir(mecid);

    report.detail(format!("mecid={mecid}"));
    report.detail(format!("folder={}", dir.display()));
    if !dir.exists() {
        report.issue(format!("folder {} not found", dir.display()));
        return Ok(report);
    }

    let codec = FilenameCodec::new(subject.prefix())?;
    let inventory = scan_inventory(&dir, &codec)?;
    let total_bytes: u64 = inventory.values().map(|file| file.size_bytes).sum();
    report.detail(format!("archived_reports={}", inventory.len()));
    report.detail(format!("archived_bytes={total_bytes}"));

    let mut by_hash: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for file in inventory.values() {
        if file.size_bytes < cfg.validation.min_valid_size_bytes {
            report.issue(format!(
                "undersized file {} ({} bytes < {})",
                file.filename, file.size_bytes, cfg.validation.min_valid_size_bytes
            ));
        }
        let digest = file_hash(&file.path)?;
        by_hash
            .entry(digest)
            .or_default()
            .push(file.filename.clone());
    }
    for (digest, filenames) in by_hash {
        if filenames.len() > 1 {
            report.issue(format!(
                "identical content ({}): {}",
                &digest[..12],
                filenames.join(", ")
            ));
        }
    }

    Ok(report)
}

pub fn run(opts: &StatusOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("build_id={}", env!("BUILD_UUID")));
    report.detail(format!("base_dir={}", paths.base_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("max_retries={}", cfg.reconcile.max_retries));
    report.detail(format!(
        "retry_delay_secs={}",
        cfg.reconcile.retry_delay_secs
    ));
    report.detail(format!("site_url={}", cfg.acquisition.site_url));
    report.detail(format!(
        "min_valid_size_bytes={}",
        cfg.validation.min_valid_size_bytes
    ));

    match ProcessAgent::from_env() {
        Ok(agent) => report.detail(format!("agent_bin={}", agent.bin().display())),
        Err(err) => report.issue(format!("acquisition agent unavailable: {err:#}")),
    }
    match PdfTextExtractor::from_env(None) {
        Ok(extractor) => report.detail(format!("pdf_text_bin={}", extractor.bin().display())),
        Err(err) => report.issue(format!("text extractor unavailable: {err:#}")),
    }

    for key in unknown_meca_env_keys() {
        report.issue(format!("unknown MECA_* environment variable: {key}"));
    }

    if !paths.base_dir.exists() {
        report.detail("base dir does not exist yet (nothing archived)".to_string());
    }

    if let Some(mecid) = opts.mecid.as_deref() {
        report.merge(integrity_report(&paths, &cfg, mecid)?);
    }

    Ok(report)
}
