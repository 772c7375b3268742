use std::fs;
use std::process::Command;

fn phi_sim() -> Command {
    Command::new(env!("CARGO_BIN_EXE_phi-sim"))
}

#[test]
fn forecast_command_writes_artefacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("run.yaml");
    fs::write(&config, "forecast:\n  n_k: 10\nsystematics:\n  sigma_bias: 0.02\n")
        .expect("config");
    let out = dir.path().join("out");
    let status = phi_sim()
        .args(["forecast", "--config"])
        .arg(&config)
        .arg("--out")
        .arg(&out)
        .status()
        .expect("run phi-sim forecast");
    assert!(status.success(), "forecast command failed");
    assert!(out.join("report.json").exists());
    assert!(out.join("forecast.csv").exists());
}

#[test]
fn invalid_range_exits_non_zero_with_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("run.yaml");
    fs::write(&config, "forecast:\n  k_min: 0.5\n  k_max: 0.1\n").expect("config");
    let output = phi_sim()
        .args(["forecast", "--config"])
        .arg(&config)
        .arg("--out")
        .arg(dir.path().join("out"))
        .output()
        .expect("run phi-sim forecast");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error[InvalidRange]"), "{stderr}");
    assert!(stderr.contains("k_min=0.5"), "{stderr}");
}

#[test]
fn sweep_accepts_comma_separated_amplitudes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("run.yaml");
    fs::write(&config, "forecast:\n  n_k: 10\n").expect("config");
    let status = phi_sim()
        .args(["sweep", "--amplitudes", "0.001,0.02", "--config"])
        .arg(&config)
        .arg("--out")
        .arg(dir.path())
        .status()
        .expect("run phi-sim sweep");
    assert!(status.success());
    let table = fs::read_to_string(dir.path().join("sweep.csv")).expect("sweep table");
    assert_eq!(table.lines().count(), 3);
}
