use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(base_dir: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(base) = base_dir {
        return Some(base.join(".env"));
    }
    Some(home_dir?.join(".mecaudit").join(".env"))
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("MECA_BASE_DIR").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::fallback_dotenv_path;
    use std::path::PathBuf;

    #[test]
    fn fallback_prefers_the_archive_base_dir() {
        let got = fallback_dotenv_path(
            Some(PathBuf::from("/archives")),
            Some(PathBuf::from("/home/alice")),
        );

        let want = Some(PathBuf::from("/archives/.env"));
        assert_eq!(got, want);
    }

    #[test]
    fn fallback_uses_home_when_base_dir_unset() {
        let got = fallback_dotenv_path(None, Some(PathBuf::from("/home/alice")));
        let want = Some(PathBuf::from("/home/alice/.mecaudit/.env"));
        assert_eq!(got, want);
    }
}
