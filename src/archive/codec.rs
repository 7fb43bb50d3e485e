use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Fallback used when a report name is empty before or after cleaning.
pub const UNKNOWN_REPORT: &str = "Unknown_Report";

pub const MAX_NAME_LEN: usize = 50;

const MAX_PREFIX_LEN: usize = 10;

const STOP_WORDS: &[&str] = &["for", "to", "the", "of", "and", "a", "an", "elect"];

static NAME_STRIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid pattern"));
static NAME_COLLAPSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s-]+").expect("valid pattern"));

/// Identity of a single archived filing. Amendments and refilings keep the
/// same report id across years, so the year is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilingKey {
    pub report_id: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFiling {
    pub report_name: String,
    pub report_id: String,
    pub year: i32,
}

impl DecodedFiling {
    pub fn key(&self) -> FilingKey {
        FilingKey {
            report_id: self.report_id.clone(),
            year: self.year,
        }
    }
}

/// Derive the short uppercase filename prefix from a subject name.
///
/// Initials of the non-stop words; if that leaves fewer than two
/// characters, the first word stripped to alphanumerics is used instead.
pub fn derive_prefix(subject_name: &str) -> String {
    let words: Vec<&str> = subject_name.split_whitespace().collect();
    if words.is_empty() {
        return "UNKNOWN".to_string();
    }

    let initials: String = words
        .iter()
        .filter(|word| !STOP_WORDS.contains(&word.to_lowercase().as_str()))
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    let prefix = if initials.chars().count() < 2 {
        words[0]
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(MAX_PREFIX_LEN)
            .collect::<String>()
            .to_uppercase()
    } else {
        initials
    };

    prefix.chars().take(MAX_PREFIX_LEN).collect()
}

/// Reduce a raw report name to the filename-safe form.
pub fn clean_report_name(raw_name: &str, max_length: usize) -> String {
    if raw_name.is_empty() {
        return UNKNOWN_REPORT.to_string();
    }

    let stripped = NAME_STRIP_RE.replace_all(raw_name, "");
    let collapsed = NAME_COLLAPSE_RE.replace_all(stripped.trim(), "_");
    let trimmed = collapsed.trim_matches('_');

    let cleaned = if trimmed.chars().count() > max_length {
        let cut: String = trimmed.chars().take(max_length).collect();
        cut.trim_end_matches('_').to_string()
    } else {
        trimmed.to_string()
    };

    if cleaned.is_empty() {
        UNKNOWN_REPORT.to_string()
    } else {
        cleaned
    }
}

/// Encode/decode between filing identity and archive filenames for one
/// subject prefix. Built once per run; the decode pattern is compiled once.
#[derive(Debug, Clone)]
pub struct FilenameCodec {
    prefix: String,
    decode_re: Regex,
}

impl FilenameCodec {
    pub fn new(prefix: &str) -> Result<Self> {
        let pattern = format!(r"^{}_(.+?)_(\d+)_(\d{{4}})\.pdf$", regex::escape(prefix));
        let decode_re = Regex::new(&pattern)
            .with_context(|| format!("invalid filename pattern for prefix {prefix}"))?;
        Ok(Self {
            prefix: prefix.to_string(),
            decode_re,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn encode(&self, raw_name: &str, report_id: &str, year: i32) -> String {
        let clean_name = clean_report_name(raw_name, MAX_NAME_LEN);
        format!("{}_{}_{}_{}.pdf", self.prefix, clean_name, report_id, year)
    }

    /// A filename that does not match the grammar is simply not part of the
    /// archive; `None` here is not an error.
    pub fn decode(&self, filename: &str) -> Option<DecodedFiling> {
        let caps = self.decode_re.captures(filename)?;
        let year = caps.get(3)?.as_str().parse::<i32>().ok()?;
        Some(DecodedFiling {
            report_name: caps.get(1)?.as_str().to_string(),
            report_id: caps.get(2)?.as_str().to_string(),
            year,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_recovers_identity_from_encoded_filename() {
        let codec = FilenameCodec::new("FHF").expect("codec");
        for (name, id, year) in [
            ("October Quarterly Report", "261218", 2025),
            ("Amended", "12345", 2023),
            ("8 Day Report - General", "9000001", 1999),
        ] {
            let filename = codec.encode(name, id, year);
            let decoded = codec.decode(&filename).expect("decodes");
            assert_eq!(decoded.report_id, id);
            assert_eq!(decoded.year, year);
        }
    }

    #[test]
    fn decode_matches_the_documented_example() {
        let codec = FilenameCodec::new("FHF").expect("codec");
        let decoded = codec
            .decode("FHF_October_Quarterly_Report_261218_2025.pdf")
            .expect("decodes");
        assert_eq!(decoded.report_name, "October_Quarterly_Report");
        assert_eq!(decoded.report_id, "261218");
        assert_eq!(decoded.year, 2025);
    }

    #[test]
    fn decode_rejects_foreign_or_malformed_names() {
        let codec = FilenameCodec::new("FHF").expect("codec");
        assert!(codec.decode("ABC_Report_12345_2025.pdf").is_none());
        assert!(codec.decode("FHF_Report_12345_25.pdf").is_none());
        assert!(codec.decode("FHF_Report_12345_2025.txt").is_none());
        assert!(codec.decode("FHF_Report__2025.pdf").is_none());
        assert!(codec.decode("notes.pdf").is_none());
    }

    #[test]
    fn decode_escapes_regex_metacharacters_in_the_prefix() {
        let codec = FilenameCodec::new("A+B").expect("codec");
        let filename = codec.encode("Quarterly", "55555", 2024);
        let decoded = codec.decode(&filename).expect("decodes");
        assert_eq!(decoded.report_id, "55555");
        assert!(codec.decode("AXB_Quarterly_55555_2024.pdf").is_none());
    }

    #[test]
    fn derive_prefix_drops_stop_words_case_insensitively() {
        assert_eq!(derive_prefix("Committee to Elect Jane Doe"), "CJD");
        assert_eq!(derive_prefix("Committee TO ELECT Jane Doe"), "CJD");
        assert_eq!(derive_prefix("Francis Howell Families"), "FHF");
    }

    #[test]
    fn derive_prefix_falls_back_to_the_first_token() {
        // Single surviving initial is too short to be a useful prefix.
        assert_eq!(derive_prefix("Jane"), "JANE");
        assert_eq!(derive_prefix("O'Malley"), "OMALLEY");
    }

    #[test]
    fn derive_prefix_truncates_to_ten_characters() {
        let prefix = derive_prefix("Alpha Beta Gamma Delta Epsilon Zeta Eta Theta Iota Kappa Lambda Mu");
        assert_eq!(prefix.chars().count(), 10);
    }

    #[test]
    fn derive_prefix_is_a_pure_function() {
        let name = "Citizens for Better Roads";
        assert_eq!(derive_prefix(name), derive_prefix(name));
    }

    #[test]
    fn derive_prefix_handles_empty_names() {
        assert_eq!(derive_prefix(""), "UNKNOWN");
        assert_eq!(derive_prefix("   "), "UNKNOWN");
    }

    #[test]
    fn clean_report_name_falls_back_when_empty() {
        assert_eq!(clean_report_name("", MAX_NAME_LEN), UNKNOWN_REPORT);
        assert_eq!(clean_report_name("!!!", MAX_NAME_LEN), UNKNOWN_REPORT);
    }

    #[test]
    fn clean_report_name_collapses_separators() {
        assert_eq!(
            clean_report_name(" October -- Quarterly  Report ", MAX_NAME_LEN),
            "October_Quarterly_Report"
        );
    }

    #[test]
    fn clean_report_name_truncates_without_a_trailing_underscore() {
        let long = "Alpha Beta Gamma Delta Epsilon Zeta Eta Theta Iota Kappa";
        let cleaned = clean_report_name(long, 11);
        assert_eq!(cleaned, "Alpha_Beta");
        assert!(!cleaned.ends_with('_'));
    }
}
