use thiserror::Error;

/// Failures that terminate the download workflow early. Everything else
/// (fetch attempts, extraction, odd filenames) degrades into warnings or
/// per-file issues instead.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("discovery returned no expected filings for {0}")]
    EmptyDiscovery(String),
    #[error("could not resolve a MECID for {0}")]
    UnresolvedSubject(String),
    #[error("acquisition agent unavailable: {0}")]
    MissingAgentBinary(String),
}
