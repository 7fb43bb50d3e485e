use crate::archive::codec::{FilenameCodec, FilingKey};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One decodable PDF in the subject folder.
#[derive(Debug, Clone)]
pub struct ArchivedFile {
    pub filename: String,
    pub report_id: String,
    pub report_name: String,
    pub year: i32,
    pub size_bytes: u64,
    pub path: PathBuf,
}

/// Materialize the on-disk archive as filing keys. Entries that are not
/// PDFs or do not decode under the subject prefix are skipped silently;
/// for duplicate keys the last-seen entry wins. Read-only.
pub fn scan_inventory(
    dir: &Path,
    codec: &FilenameCodec,
) -> Result<BTreeMap<FilingKey, ArchivedFile>> {
    let mut inventory = BTreeMap::new();
    if !dir.exists() {
        return Ok(inventory);
    }

    let read_dir =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("pdf") {
            continue;
        }
        let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Some(decoded) = codec.decode(filename) else {
            continue;
        };
        let size_bytes = entry.metadata()?.len();

        inventory.insert(
            decoded.key(),
            ArchivedFile {
                filename: filename.to_string(),
                report_id: decoded.report_id,
                report_name: decoded.report_name,
                year: decoded.year,
                size_bytes,
                path,
            },
        );
    }

    Ok(inventory)
}
