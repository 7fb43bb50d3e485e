use anyhow::Result;
use chrono::Utc;
use std::time::Duration;

use crate::archive::agent::{AcquisitionAgent, ProcessAgent};
use crate::archive::audit;
use crate::archive::codec::FilenameCodec;
use crate::archive::config::{AuditConfig, load_config};
use crate::archive::extractor::PdfTextExtractor;
use crate::archive::inventory::scan_inventory;
use crate::archive::lock::RunLock;
use crate::archive::paths::{ArchivePaths, resolve_paths};
use crate::archive::reconcile::{self, MISSING_PREVIEW_LIMIT, ReconcileStatus};
use crate::archive::subject::SubjectContext;
use crate::archive::validate::validate_archive;
use crate::commands::CommandReport;
use crate::error::WorkflowError;

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub committee: Option<String>,
    pub candidate: Option<String>,
    pub mecid_only: Option<String>,
    pub mecid: Option<String>,
}

fn subject_from_options(opts: &DownloadOptions) -> Result<SubjectContext> {
    if let Some(mecid) = &opts.mecid_only {
        return Ok(SubjectContext::by_mecid(mecid.trim()));
    }
    if let Some(candidate) = &opts.candidate {
        return Ok(SubjectContext::by_candidate(
            candidate.trim(),
            opts.mecid.as_deref(),
        ));
    }
    if let Some(committee) = &opts.committee {
        return Ok(SubjectContext::by_committee(
            committee.trim(),
            opts.mecid.as_deref(),
        ));
    }
    Err(WorkflowError::UnresolvedSubject(
        "no committee, candidate, or MECID was given".to_string(),
    )
    .into())
}

fn check_site_reachable(site_url: &str) -> Result<u16> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let response = client.head(site_url).send()?;
    Ok(response.status().as_u16())
}

fn run_validation_step(
    paths: &ArchivePaths,
    downloads_dir: &std::path::Path,
    codec: &FilenameCodec,
    cfg: &AuditConfig,
    mecid: &str,
) -> Result<Vec<String>> {
    let extractor = PdfTextExtractor::from_env(Some(cfg.validation.extractor_timeout_secs))?;
    let outcome = validate_archive(downloads_dir, codec, &extractor)?;

    let mut lines = Vec::new();
    lines.push(format!(
        "validated_files={} flagged_ids={} inspected={}",
        outcome.scanned_files,
        outcome.flagged_ids.len(),
        outcome.inspected_files
    ));
    if outcome.all_valid {
        lines.push("validation: all reports OK".to_string());
    } else {
        for issue in &outcome.issues {
            lines.push(format!(
                "[{}] {}: {}",
                issue.status.as_str(),
                issue.filename,
                issue.message
            ));
        }
        lines.push(format!(
            "[warning] validation found {} issue(s); review needed",
            outcome.issues.len()
        ));
    }

    audit::append_event(
        paths,
        "validate",
        if outcome.all_valid { "ok" } else { "degraded" },
        &format!("mecid={mecid} issues={}", outcome.issues.len()),
    )?;
    Ok(lines)
}

/// STEP 1 discover, STEP 2 reconcile, STEP 3 validate. Only discovery
/// failure (or an unresolvable subject) is fatal; exhausted retries and
/// validation findings degrade the report without failing the run.
pub fn run(opts: &DownloadOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("download");

    let subject = subject_from_options(opts)?;
    let paths = resolve_paths()?;
    let cfg = load_config()?;

    report.detail(format!("target={}", subject.display_name()));
    report.detail(format!("search_type={}", subject.mode().as_str()));
    report.detail(format!("file_prefix={}", subject.prefix()));
    report.detail(format!("max_retries={}", cfg.reconcile.max_retries));
    report.detail(format!("started_at={}", Utc::now().to_rfc3339()));

    if cfg.acquisition.site_check_enabled {
        match check_site_reachable(&cfg.acquisition.site_url) {
            Ok(code) => report.detail(format!("site_check=ok status={code}")),
            Err(err) => report.detail(format!("[warning] site check failed: {err:#}")),
        }
    }

    let agent = ProcessAgent::from_env()?;
    report.detail(format!("agent_bin={}", agent.bin().display()));

    report.detail("step 1: checking what reports should exist".to_string());
    let discovery = agent.discover_expected(&subject)?;
    if discovery.reports.is_empty() {
        audit::append_event(
            &paths,
            "discover",
            "failed",
            &format!("subject={} expected=0", subject.search_value()),
        )?;
        return Err(WorkflowError::EmptyDiscovery(subject.display_name()).into());
    }

    let resolved_mecid = subject
        .mecid()
        .map(str::to_string)
        .or(discovery.mecid.clone())
        .ok_or_else(|| WorkflowError::UnresolvedSubject(subject.display_name()))?;
    let subject = subject.with_resolved_mecid(&resolved_mecid);

    let downloads_dir = paths.ensure_subject_dir(&resolved_mecid)?;
    let _lock = RunLock::acquire(&downloads_dir)?;

    report.detail(format!("mecid={resolved_mecid}"));
    report.detail(format!("downloads_dir={}", downloads_dir.display()));
    report.detail(format!("expected_reports={}", discovery.reports.len()));
    audit::append_event(
        &paths,
        "discover",
        "ok",
        &format!("mecid={resolved_mecid} expected={}", discovery.reports.len()),
    )?;

    report.detail("step 2: download loop".to_string());
    let codec = FilenameCodec::new(subject.prefix())?;
    let outcome = reconcile::converge(
        &agent,
        &subject,
        &codec,
        &downloads_dir,
        &discovery.reports,
        cfg.reconcile.max_retries,
        Duration::from_secs(cfg.reconcile.retry_delay_secs),
    )?;

    for attempt in &outcome.attempts {
        report.detail(format!(
            "attempt {}/{}: existing={} missing={} fetch_ok={}",
            attempt.attempt,
            cfg.reconcile.max_retries,
            attempt.existing,
            attempt.missing,
            attempt.fetch_ok
        ));
    }

    match outcome.status {
        ReconcileStatus::Converged => {
            report.detail(format!(
                "all {} expected reports are present",
                outcome.expected_total
            ));
            audit::append_event(
                &paths,
                "reconcile",
                "ok",
                &format!("mecid={resolved_mecid} fetch_calls={}", outcome.fetch_calls),
            )?;
        }
        ReconcileStatus::Exhausted => {
            report.detail(format!(
                "[warning] retries exhausted; still missing {} of {} reports",
                outcome.remaining.len(),
                outcome.expected_total
            ));
            for filename in reconcile::missing_preview(
                &discovery.reports,
                &outcome.remaining,
                &codec,
                MISSING_PREVIEW_LIMIT,
            ) {
                report.detail(format!("  missing {filename}"));
            }
            if outcome.remaining.len() > MISSING_PREVIEW_LIMIT {
                report.detail(format!(
                    "  ... and {} more",
                    outcome.remaining.len() - MISSING_PREVIEW_LIMIT
                ));
            }
            audit::append_event(
                &paths,
                "reconcile",
                "degraded",
                &format!(
                    "mecid={resolved_mecid} missing={} fetch_calls={}",
                    outcome.remaining.len(),
                    outcome.fetch_calls
                ),
            )?;
        }
    }

    report.detail("step 3: validating reports".to_string());
    match run_validation_step(&paths, &downloads_dir, &codec, &cfg, &resolved_mecid) {
        Ok(lines) => {
            for line in lines {
                report.detail(line);
            }
        }
        Err(err) => report.detail(format!("[warning] validation failed: {err:#}")),
    }

    let final_inventory = scan_inventory(&downloads_dir, &codec)?;
    report.detail(format!(
        "final_count={}/{}",
        final_inventory.len(),
        outcome.expected_total
    ));

    Ok(report)
}
