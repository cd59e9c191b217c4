//! Startup failures of the `pinpad` binary.

use std::process::Command;

fn pinpad() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pinpad"))
}

#[test]
fn test_missing_serial_device_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = pinpad()
        .args(["--device", "/dev/pinpad-does-not-exist"])
        .arg("--pin-path")
        .arg(dir.path().join("pins.json"))
        .arg("--socket")
        .arg(dir.path().join("ctrl.sock"))
        .env("RUST_LOG", "info")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pinpad-does-not-exist"), "stdout: {stdout}");
}

#[test]
fn test_corrupt_credential_file_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let pins = dir.path().join("pins.json");
    std::fs::write(&pins, b"{not json").unwrap();

    let output = pinpad().arg("--pin-path").arg(&pins).output().unwrap();

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("credential file"), "stdout: {stdout}");
}

#[test]
fn test_invalid_config_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("pinpad.toml");
    std::fs::write(&config, "[sync]\nfailure_threshold = 0\n").unwrap();

    let output = pinpad().arg("--config").arg(&config).output().unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failure_threshold"), "stderr: {stderr}");
}
