use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_stub_bin(bin_path: &Path) {
    fs::write(bin_path, "#!/usr/bin/env bash\nexit 0\n").expect("write stub");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(bin_path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(bin_path, perms).expect("chmod");
    }
}

#[test]
fn status_sweeps_a_mecid_folder() {
    let tmp = tempdir().expect("tempdir");
    let base = tmp.path().join("reports");
    let folder = base.join("C2116");
    fs::create_dir_all(&folder).expect("mkdir");
    fs::write(folder.join("C2116_Amended_12345_2023.pdf"), b"pdf-a").expect("write");
    fs::write(folder.join("C2116_April_Quarterly_22222_2024.pdf"), b"pdf-bb").expect("write");

    let agent = tmp.path().join("agent");
    let pdftotext = tmp.path().join("pdftotext");
    write_stub_bin(&agent);
    write_stub_bin(&pdftotext);

    assert_cmd::cargo::cargo_bin_cmd!("mecaudit")
        .current_dir(tmp.path())
        .env("MECA_BASE_DIR", &base)
        .env("MECA_CONFIG_PATH", tmp.path().join("no-config.toml"))
        .env("MECA_AGENT_BIN", &agent)
        .env("MECA_PDF_TEXT_BIN", &pdftotext)
        .env("MECA_MIN_VALID_SIZE_BYTES", "1")
        .arg("status")
        .arg("--mecid")
        .arg("C2116")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_dir="))
        .stdout(predicate::str::contains("archived_reports=2"))
        .stdout(predicate::str::contains("archived_bytes=11"));
}

#[test]
fn status_flags_undersized_and_duplicate_content() {
    let tmp = tempdir().expect("tempdir");
    let base = tmp.path().join("reports");
    let folder = base.join("C2116");
    fs::create_dir_all(&folder).expect("mkdir");
    // Two distinct keys holding the same bytes, both below the size floor.
    fs::write(folder.join("C2116_Amended_12345_2023.pdf"), b"pdf").expect("write");
    fs::write(folder.join("C2116_Amended_12345_2024.pdf"), b"pdf").expect("write");

    let agent = tmp.path().join("agent");
    let pdftotext = tmp.path().join("pdftotext");
    write_stub_bin(&agent);
    write_stub_bin(&pdftotext);

    assert_cmd::cargo::cargo_bin_cmd!("mecaudit")
        .current_dir(tmp.path())
        .env("MECA_BASE_DIR", &base)
        .env("MECA_CONFIG_PATH", tmp.path().join("no-config.toml"))
        .env("MECA_AGENT_BIN", &agent)
        .env("MECA_PDF_TEXT_BIN", &pdftotext)
        .arg("status")
        .arg("--mecid")
        .arg("C2116")
        .assert()
        .failure()
        .stderr(predicate::str::contains("undersized file"))
        .stderr(predicate::str::contains("identical content"));
}

#[test]
fn status_rejects_unknown_meca_environment_variables() {
    let tmp = tempdir().expect("tempdir");
    let base = tmp.path().join("reports");
    fs::create_dir_all(&base).expect("mkdir");

    let agent = tmp.path().join("agent");
    let pdftotext = tmp.path().join("pdftotext");
    write_stub_bin(&agent);
    write_stub_bin(&pdftotext);

    assert_cmd::cargo::cargo_bin_cmd!("mecaudit")
        .current_dir(tmp.path())
        .env("MECA_BASE_DIR", &base)
        .env("MECA_CONFIG_PATH", tmp.path().join("no-config.toml"))
        .env("MECA_AGENT_BIN", &agent)
        .env("MECA_PDF_TEXT_BIN", &pdftotext)
        .env("MECA_RETRY_DELAY", "5")
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "unknown MECA_* environment variable: MECA_RETRY_DELAY",
        ));
}
