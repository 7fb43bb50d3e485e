use crate::archive::codec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Committee,
    Candidate,
    Mecid,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Committee => "committee",
            Self::Candidate => "candidate",
            Self::Mecid => "mecid",
        }
    }
}

/// Immutable description of the subject a run operates on. Built once from
/// the command line and threaded as a value through the codec, scanner,
/// reconciliation loop, and validation engine; resolving a MECID later
/// produces a new context instead of mutating this one.
#[derive(Debug, Clone)]
pub struct SubjectContext {
    mode: SearchMode,
    query: String,
    mecid: Option<String>,
    prefix: String,
}

impl SubjectContext {
    pub fn by_committee(name: &str, mecid: Option<&str>) -> Self {
        Self {
            mode: SearchMode::Committee,
            query: name.to_string(),
            mecid: mecid.map(str::to_string),
            prefix: codec::derive_prefix(name),
        }
    }

    pub fn by_candidate(name: &str, mecid: Option<&str>) -> Self {
        Self {
            mode: SearchMode::Candidate,
            query: name.to_string(),
            mecid: mecid.map(str::to_string),
            prefix: codec::derive_prefix(name),
        }
    }

    /// MECID searches use the id itself as the filename prefix.
    pub fn by_mecid(mecid: &str) -> Self {
        Self {
            mode: SearchMode::Mecid,
            query: mecid.to_string(),
            mecid: Some(mecid.to_string()),
            prefix: mecid.to_string(),
        }
    }

    pub fn with_resolved_mecid(&self, mecid: &str) -> Self {
        let mut next = self.clone();
        next.mecid = Some(mecid.to_string());
        next
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn search_value(&self) -> &str {
        &self.query
    }

    pub fn mecid(&self) -> Option<&str> {
        self.mecid.as_deref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn display_name(&self) -> String {
        match self.mode {
            SearchMode::Committee => format!("Committee: {}", self.query),
            SearchMode::Candidate => format!("Candidate: {}", self.query),
            SearchMode::Mecid => format!("MECID: {}", self.query),
        }
    }
}
