use crate::archive::codec::FilenameCodec;
use crate::archive::extractor::FilingDateSource;
use crate::archive::inventory::{ArchivedFile, scan_inventory};
use crate::archive::warn;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStatus {
    Error,
    Mismatch,
}

impl IssueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Mismatch => "MISMATCH",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub filename: String,
    pub report_id: String,
    pub report_name: String,
    pub status: IssueStatus,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub all_valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub scanned_files: usize,
    pub flagged_ids: Vec<String>,
    pub inspected_files: usize,
}

/// Year component of an `MM/DD/YYYY` date string.
pub fn filing_year_from_date(date: &str) -> Option<i32> {
    date.split('/').nth(2)?.trim().parse::<i32>().ok()
}

fn issue_for(file: &ArchivedFile, status: IssueStatus, message: String) -> ValidationIssue {
    ValidationIssue {
        filename: file.filename.clone(),
        report_id: file.report_id.clone(),
        report_name: file.report_name.clone(),
        status,
        message,
    }
}

/// Cross-check filename-encoded years against the dates recorded inside the
/// documents, restricted to report ids that are genuinely ambiguous.
///
/// Only groups with more than one file AND more than one distinct year are
/// inspected; everything else is assumed consistent, which keeps document
/// reads bounded to the re-filed/amended cases. One unreadable document
/// becomes an issue for that file and never aborts the pass.
pub fn validate_archive(
    downloads_dir: &Path,
    codec: &FilenameCodec,
    dates: &dyn FilingDateSource,
) -> Result<ValidationOutcome> {
    let inventory = scan_inventory(downloads_dir, codec)?;
    let scanned_files = inventory.len();

    let mut by_report_id: BTreeMap<String, Vec<ArchivedFile>> = BTreeMap::new();
    for file in inventory.into_values() {
        by_report_id
            .entry(file.report_id.clone())
            .or_default()
            .push(file);
    }

    let mut flagged_ids = Vec::new();
    for (report_id, files) in &by_report_id {
        if files.len() < 2 {
            continue;
        }
        let years: BTreeSet<i32> = files.iter().map(|file| file.year).collect();
        if years.len() > 1 {
            flagged_ids.push(report_id.clone());
        }
    }

    let mut issues = Vec::new();
    let mut inspected_files = 0usize;

    for report_id in &flagged_ids {
        let Some(files) = by_report_id.get(report_id) else {
            continue;
        };
        for file in files {
            inspected_files += 1;

            let extracted = match dates.extract_filing_date(&file.path) {
                Ok(extracted) => extracted,
                Err(err) => {
                    warn::emit(
                        "EXTRACT_FAILED",
                        "validate",
                        "extract-filing-date",
                        report_id,
                        &file.filename,
                        &format!("{err:#}"),
                    );
                    None
                }
            };

            let Some(date) = extracted else {
                issues.push(issue_for(
                    file,
                    IssueStatus::Error,
                    "could not extract filing date".to_string(),
                ));
                continue;
            };

            let Some(filing_year) = filing_year_from_date(&date) else {
                issues.push(issue_for(
                    file,
                    IssueStatus::Error,
                    format!("could not parse year from {date}"),
                ));
                continue;
            };

            if filing_year != file.year {
                issues.push(issue_for(
                    file,
                    IssueStatus::Mismatch,
                    format!("filename year {} != filing year {}", file.year, filing_year),
                ));
            }
        }
    }

    Ok(ValidationOutcome {
        all_valid: issues.is_empty(),
        issues,
        scanned_files,
        flagged_ids,
        inspected_files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    /// Date source answering from a filename-keyed script, counting calls.
    struct ScriptedDates {
        by_filename: BTreeMap<String, Option<String>>,
        fail_on: Option<String>,
        calls: Cell<usize>,
    }

    impl ScriptedDates {
        fn new(entries: &[(&str, Option<&str>)]) -> Self {
            Self {
                by_filename: entries
                    .iter()
                    .map(|&(name, date)| (name.to_string(), date.map(str::to_string)))
                    .collect(),
                fail_on: None,
                calls: Cell::new(0),
            }
        }
    }

    impl FilingDateSource for ScriptedDates {
        fn extract_filing_date(&self, document: &Path) -> Result<Option<String>> {
            self.calls.set(self.calls.get() + 1);
            let name = document
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string();
            if self.fail_on.as_deref() == Some(name.as_str()) {
                anyhow::bail!("document unreadable");
            }
            Ok(self.by_filename.get(&name).cloned().flatten())
        }
    }

    fn write_pdfs(dir: &Path, filenames: &[&str]) {
        for filename in filenames {
            fs::write(dir.join(filename), b"pdf").expect("write");
        }
    }

    #[test]
    fn unambiguous_ids_never_reach_the_date_source() {
        let tmp = tempdir().expect("tempdir");
        let codec = FilenameCodec::new("FHF").expect("codec");
        write_pdfs(
            tmp.path(),
            &[
                "FHF_April_Quarterly_11111_2024.pdf",
                "FHF_October_Quarterly_22222_2024.pdf",
            ],
        );

        let dates = ScriptedDates::new(&[]);
        let outcome = validate_archive(tmp.path(), &codec, &dates).expect("validate");

        assert!(outcome.all_valid);
        assert!(outcome.flagged_ids.is_empty());
        assert_eq!(outcome.inspected_files, 0);
        assert_eq!(dates.calls.get(), 0);
    }

    #[test]
    fn conflicting_years_yield_one_mismatch_for_the_stale_file() {
        let tmp = tempdir().expect("tempdir");
        let codec = FilenameCodec::new("C2116").expect("codec");
        write_pdfs(
            tmp.path(),
            &[
                "C2116_Amended_12345_2023.pdf",
                "C2116_Amended_12345_2024.pdf",
            ],
        );

        let dates = ScriptedDates::new(&[
            ("C2116_Amended_12345_2023.pdf", Some("03/15/2024")),
            ("C2116_Amended_12345_2024.pdf", Some("03/15/2024")),
        ]);
        let outcome = validate_archive(tmp.path(), &codec, &dates).expect("validate");

        assert!(!outcome.all_valid);
        assert_eq!(outcome.flagged_ids, vec!["12345".to_string()]);
        assert_eq!(outcome.issues.len(), 1);
        let issue = &outcome.issues[0];
        assert_eq!(issue.filename, "C2116_Amended_12345_2023.pdf");
        assert_eq!(issue.status, IssueStatus::Mismatch);
        assert!(issue.message.contains("2023"));
        assert!(issue.message.contains("2024"));
        assert_eq!(dates.calls.get(), 2);
    }

    #[test]
    fn a_missing_date_becomes_an_error_issue() {
        let tmp = tempdir().expect("tempdir");
        let codec = FilenameCodec::new("C2116").expect("codec");
        write_pdfs(
            tmp.path(),
            &[
                "C2116_Amended_12345_2023.pdf",
                "C2116_Amended_12345_2024.pdf",
            ],
        );

        let dates = ScriptedDates::new(&[
            ("C2116_Amended_12345_2023.pdf", None),
            ("C2116_Amended_12345_2024.pdf", Some("03/15/2024")),
        ]);
        let outcome = validate_archive(tmp.path(), &codec, &dates).expect("validate");

        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].status, IssueStatus::Error);
        assert_eq!(outcome.issues[0].message, "could not extract filing date");
    }

    #[test]
    fn an_unparsable_year_names_the_offending_value() {
        let tmp = tempdir().expect("tempdir");
        let codec = FilenameCodec::new("C2116").expect("codec");
        write_pdfs(
            tmp.path(),
            &[
                "C2116_Amended_12345_2023.pdf",
                "C2116_Amended_12345_2024.pdf",
            ],
        );

        let dates = ScriptedDates::new(&[
            ("C2116_Amended_12345_2023.pdf", Some("03/15/20xy")),
            ("C2116_Amended_12345_2024.pdf", Some("03/15/2024")),
        ]);
        let outcome = validate_archive(tmp.path(), &codec, &dates).expect("validate");

        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].status, IssueStatus::Error);
        assert!(outcome.issues[0].message.contains("03/15/20xy"));
    }

    #[test]
    fn a_failing_extraction_does_not_abort_the_pass() {
        let tmp = tempdir().expect("tempdir");
        let codec = FilenameCodec::new("C2116").expect("codec");
        write_pdfs(
            tmp.path(),
            &[
                "C2116_Amended_12345_2023.pdf",
                "C2116_Amended_12345_2024.pdf",
            ],
        );

        let mut dates = ScriptedDates::new(&[
            ("C2116_Amended_12345_2023.pdf", Some("01/01/2023")),
            ("C2116_Amended_12345_2024.pdf", Some("03/15/2024")),
        ]);
        dates.fail_on = Some("C2116_Amended_12345_2023.pdf".to_string());
        let outcome = validate_archive(tmp.path(), &codec, &dates).expect("validate");

        assert_eq!(dates.calls.get(), 2);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].status, IssueStatus::Error);
        assert_eq!(outcome.issues[0].filename, "C2116_Amended_12345_2023.pdf");
    }

    #[test]
    fn an_empty_folder_is_trivially_valid() {
        let tmp = tempdir().expect("tempdir");
        let codec = FilenameCodec::new("C2116").expect("codec");
        let dates = ScriptedDates::new(&[]);
        let outcome = validate_archive(tmp.path(), &codec, &dates).expect("validate");

        assert!(outcome.all_valid);
        assert_eq!(outcome.scanned_files, 0);
    }

    #[test]
    fn filing_year_parses_the_third_component() {
        assert_eq!(filing_year_from_date("03/15/2024"), Some(2024));
        assert_eq!(filing_year_from_date("3/5/1999"), Some(1999));
        assert_eq!(filing_year_from_date("03/15"), None);
        assert_eq!(filing_year_from_date("garbage"), None);
        assert_eq!(filing_year_from_date("03/15/twenty"), None);
    }
}
