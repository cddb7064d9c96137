use std::process::Command;

#[test]
fn missing_dataset_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_card_enricher"))
        .current_dir(dir.path())
        .args(["listing", "--cards", "missing/cards.json"])
        .output()
        .expect("run CLI");

    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("failed to read dataset"),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn bad_site_config_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("site.yaml"), "base_url: [").unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_card_enricher"))
        .current_dir(dir.path())
        .args(["detail", "--site-config", "site.yaml"])
        .output()
        .expect("run CLI");

    assert!(!output.status.success());
}
