use anyhow::Result;

use crate::archive::audit;
use crate::archive::codec::FilenameCodec;
use crate::archive::config::load_config;
use crate::archive::extractor::PdfTextExtractor;
use crate::archive::paths::resolve_paths;
use crate::archive::subject::SubjectContext;
use crate::archive::validate::validate_archive;
use crate::commands::CommandReport;

#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub mecid: String,
}

/// Standalone validation pass over one MECID folder. Every finding is an
/// issue, so the process exits non-zero unless the archive is fully valid.
pub fn run(opts: &ValidateOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("validate");

    let mecid = opts.mecid.trim();
    if mecid.is_empty() {
        report.issue("a MECID is required");
        return Ok(report);
    }

    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let subject = SubjectContext::by_mecid(mecid);
    let downloads_dir = paths.subject_dir(mecid);

    report.detail(format!("mecid={mecid}"));
    report.detail(format!("folder={}", downloads_dir.display()));

    if !downloads_dir.exists() {
        report.issue(format!("folder {} not found", downloads_dir.display()));
        return Ok(report);
    }

    let codec = FilenameCodec::new(subject.prefix())?;
    let extractor = PdfTextExtractor::from_env(Some(cfg.validation.extractor_timeout_secs))?;
    let outcome = validate_archive(&downloads_dir, &codec, &extractor)?;

    report.detail(format!("checked_files={}", outcome.scanned_files));
    if outcome.flagged_ids.is_empty() {
        report.detail("no duplicate report ids with conflicting years found".to_string());
    } else {
        report.detail(format!(
            "report ids with multiple year versions: {}",
            outcome.flagged_ids.join(", ")
        ));
        report.detail(format!("inspected_files={}", outcome.inspected_files));
    }

    for issue in &outcome.issues {
        report.issue(format!(
            "[{}] {}: {}",
            issue.status.as_str(),
            issue.filename,
            issue.message
        ));
    }
    if outcome.all_valid {
        report.detail("all reports validated successfully".to_string());
    }

    audit::append_event(
        &paths,
        "validate",
        if outcome.all_valid { "ok" } else { "degraded" },
        &format!("mecid={mecid} issues={}", outcome.issues.len()),
    )?;

    Ok(report)
}
