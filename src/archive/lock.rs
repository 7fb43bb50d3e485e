use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

pub const LOCK_FILE_NAME: &str = ".mecaudit.lock";

/// Exclusive lock on a subject folder for the duration of a download run.
/// A second run against the same archive fails fast instead of interleaving
/// fetches with the first.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        file.try_lock_exclusive()
            .with_context(|| format!("another download run holds {}", path.display()))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn a_held_lock_blocks_a_second_acquire() {
        let tmp = tempdir().expect("tempdir");
        let held = RunLock::acquire(tmp.path()).expect("first acquire");
        assert!(RunLock::acquire(tmp.path()).is_err());
        drop(held);
        assert!(RunLock::acquire(tmp.path()).is_ok());
    }

    #[test]
    fn acquire_creates_the_folder_and_lock_file() {
        let tmp = tempdir().expect("tempdir");
        let dir = tmp.path().join("C2116");
        let lock = RunLock::acquire(&dir).expect("acquire");
        assert!(lock.path().exists());
        assert!(dir.is_dir());
    }
}
