use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ArchivePaths {
    pub base_dir: PathBuf,
    pub logs_dir: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<ArchivePaths> {
    let home = required_home_dir()?;
    let base_dir = env_or_default_path(
        "MECA_BASE_DIR",
        home.join("Downloads").join("MEC_Reports"),
    );
    let logs_dir = env_or_default_path("MECA_LOGS_DIR", base_dir.join("logs"));

    Ok(ArchivePaths { base_dir, logs_dir })
}

impl ArchivePaths {
    /// Each subject archives into a folder named after its MECID.
    pub fn subject_dir(&self, mecid: &str) -> PathBuf {
        self.base_dir.join(mecid)
    }

    pub fn ensure_subject_dir(&self, mecid: &str) -> Result<PathBuf> {
        if mecid.trim().is_empty() {
            anyhow::bail!("a MECID is required to resolve the subject folder");
        }
        let dir = self.subject_dir(mecid);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(dir)
    }

    pub fn with_base(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            logs_dir: base_dir.join("logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn subject_dir_nests_under_the_base_dir() {
        let paths = ArchivePaths::with_base(Path::new("/archives"));
        assert_eq!(paths.subject_dir("C2116"), PathBuf::from("/archives/C2116"));
    }

    #[test]
    fn ensure_subject_dir_rejects_an_empty_mecid() {
        let tmp = tempdir().expect("tempdir");
        let paths = ArchivePaths::with_base(tmp.path());
        assert!(paths.ensure_subject_dir(" ").is_err());
    }

    #[test]
    fn ensure_subject_dir_creates_the_folder() {
        let tmp = tempdir().expect("tempdir");
        let paths = ArchivePaths::with_base(tmp.path());
        let dir = paths.ensure_subject_dir("C2116").expect("ensure");
        assert!(dir.is_dir());
    }
}
