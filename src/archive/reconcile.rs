use crate::archive::agent::{AcquisitionAgent, ExpectedFiling};
use crate::archive::codec::{FilenameCodec, FilingKey};
use crate::archive::inventory::scan_inventory;
use crate::archive::subject::SubjectContext;
use crate::archive::warn;
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::Path;
use std::thread;
use std::time::Duration;

pub const MISSING_PREVIEW_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStatus {
    /// Every expected filing key is present in the local inventory.
    Converged,
    /// The retry bound fell through with keys still missing. Non-fatal;
    /// callers proceed with a degraded-completeness warning.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub existing: usize,
    pub missing: usize,
    pub fetch_ok: bool,
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub status: ReconcileStatus,
    pub fetch_calls: u32,
    pub attempts: Vec<AttemptRecord>,
    pub remaining: Vec<FilingKey>,
    pub expected_total: usize,
    pub final_existing: usize,
}

pub fn expected_keys(expected: &[ExpectedFiling]) -> BTreeSet<FilingKey> {
    expected.iter().map(ExpectedFiling::key).collect()
}

/// Reconstruct filenames for up to `limit` missing keys, using the advisory
/// report name from discovery where one is known.
pub fn missing_preview(
    expected: &[ExpectedFiling],
    missing: &[FilingKey],
    codec: &FilenameCodec,
    limit: usize,
) -> Vec<String> {
    missing
        .iter()
        .take(limit)
        .map(|key| {
            let name = expected
                .iter()
                .find(|filing| filing.report_id == key.report_id && filing.year == key.year)
                .map(|filing| filing.report_name.as_str())
                .unwrap_or("Unknown");
            codec.encode(name, &key.report_id, key.year)
        })
        .collect()
}

fn missing_from(
    wanted: &BTreeSet<FilingKey>,
    inventory_keys: &BTreeSet<FilingKey>,
) -> Vec<FilingKey> {
    wanted.difference(inventory_keys).cloned().collect()
}

/// Non-terminal states of the convergence loop. `attempt` counts fetch
/// attempts and is bounded by `max_retries`; the terminal states live in
/// `ReconcileStatus`.
#[derive(Debug, Clone)]
enum LoopState {
    Checking { attempt: u32 },
    Fetching { attempt: u32, existing: usize, missing: usize },
}

/// Drive the local archive toward the expected set within `max_retries`
/// fetch attempts.
///
/// Every `Checking` entry re-scans the directory rather than trusting a
/// cached snapshot; the agent may land files outside our observed control
/// flow. All non-convergence causes look the same from here (the loop only
/// sees the before/after inventory diff), so an agent error, a failure
/// signal, and a silent no-op fetch are consumed identically and retried.
pub fn converge(
    agent: &dyn AcquisitionAgent,
    subject: &SubjectContext,
    codec: &FilenameCodec,
    downloads_dir: &Path,
    expected: &[ExpectedFiling],
    max_retries: u32,
    retry_delay: Duration,
) -> Result<ReconcileOutcome> {
    let wanted = expected_keys(expected);
    let mut attempts = Vec::new();
    let mut fetch_calls = 0u32;
    let mut state = LoopState::Checking { attempt: 1 };

    loop {
        match state {
            LoopState::Checking { attempt } => {
                let inventory = scan_inventory(downloads_dir, codec)?;
                let present: BTreeSet<FilingKey> = inventory.keys().cloned().collect();
                let missing = missing_from(&wanted, &present);

                if missing.is_empty() {
                    return Ok(ReconcileOutcome {
                        status: ReconcileStatus::Converged,
                        fetch_calls,
                        attempts,
                        remaining: Vec::new(),
                        expected_total: wanted.len(),
                        final_existing: inventory.len(),
                    });
                }

                if attempt > max_retries {
                    return Ok(ReconcileOutcome {
                        status: ReconcileStatus::Exhausted,
                        fetch_calls,
                        attempts,
                        remaining: missing,
                        expected_total: wanted.len(),
                        final_existing: inventory.len(),
                    });
                }

                state = LoopState::Fetching {
                    attempt,
                    existing: inventory.len(),
                    missing: missing.len(),
                };
            }
            LoopState::Fetching {
                attempt,
                existing,
                missing,
            } => {
                let fetch_ok = match agent.fetch_missing(subject, downloads_dir) {
                    Ok(ok) => ok,
                    Err(err) => {
                        warn::emit(
                            "FETCH_FAILED",
                            "reconcile",
                            "fetch-missing",
                            subject.search_value(),
                            &format!("attempt-{attempt}"),
                            &format!("{err:#}"),
                        );
                        false
                    }
                };
                fetch_calls += 1;
                attempts.push(AttemptRecord {
                    attempt,
                    existing,
                    missing,
                    fetch_ok,
                });

                thread::sleep(retry_delay);
                state = LoopState::Checking {
                    attempt: attempt + 1,
                };
            }
        }
    }
}
