//! Tests for profile load/save and resolution logic (non-interactive paths only)
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use fleettop::profiles::ProfilesFile;

// Global lock to serialize tests that share the profiles directory layout.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn run_fleettop(config_home: &Path, args: &[&str]) -> (bool, String) {
    let exe = env!("CARGO_BIN_EXE_fleettop");
    let output = Command::new(exe)
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env("FLEETTOP_LOG", config_home.join("fleettop.log"))
        .output()
        .expect("run fleettop");
    let ok = output.status.success();
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    (ok, text)
}

fn profiles_path(config_home: &Path) -> PathBuf {
    config_home.join("fleettop").join("profiles.json")
}

fn read_profiles(config_home: &Path) -> ProfilesFile {
    let data = fs::read_to_string(profiles_path(config_home)).expect("profiles.json");
    serde_json::from_str(&data).expect("valid profiles.json")
}

#[test]
fn test_profile_created_on_first_use() {
    let _guard = ENV_LOCK.lock().unwrap();
    let td = tempfile::tempdir().unwrap();
    let (ok, out) = run_fleettop(
        td.path(),
        &["--profile", "unittest", "http://example:9080", "--dry-run"],
    );
    assert!(ok, "{out}");
    assert!(out.contains("Resolved: http://example:9080"), "{out}");
    let pf = read_profiles(td.path());
    assert_eq!(pf.profiles["unittest"].url, "http://example:9080");
}

#[test]
fn test_profile_overwrite_only_when_changed() {
    let _guard = ENV_LOCK.lock().unwrap();
    let td = tempfile::tempdir().unwrap();
    run_fleettop(td.path(), &["--profile", "prod", "http://one:9080", "--dry-run"]);
    let first = fs::read_to_string(profiles_path(td.path())).unwrap();

    // Identical input leaves the file untouched
    run_fleettop(td.path(), &["--profile", "prod", "http://one:9080", "--dry-run"]);
    let second = fs::read_to_string(profiles_path(td.path())).unwrap();
    assert_eq!(first, second, "Profile file changed despite identical input");

    // Different URL with --save overwrites without prompting
    run_fleettop(
        td.path(),
        &["--profile", "prod", "--save", "http://two:9080", "--dry-run"],
    );
    let pf = read_profiles(td.path());
    assert_eq!(pf.profiles["prod"].url, "http://two:9080");
}

#[test]
fn test_profile_fields_persisted_and_reused() {
    let _guard = ENV_LOCK.lock().unwrap();
    let td = tempfile::tempdir().unwrap();
    run_fleettop(
        td.path(),
        &[
            "--profile",
            "secureX",
            "--tls-ca",
            "/tmp/cert.pem",
            "--env",
            "jira-prod",
            "--interval",
            "45",
            "https://monitor.example/dash",
            "--dry-run",
        ],
    );
    let pf = read_profiles(td.path());
    let entry = &pf.profiles["secureX"];
    assert_eq!(entry.tls_ca.as_deref(), Some("/tmp/cert.pem"));
    assert_eq!(entry.env.as_deref(), Some("jira-prod"));
    assert_eq!(entry.interval, Some(45));

    // Name alone loads the saved entry
    let (ok, out) = run_fleettop(td.path(), &["-P", "secureX", "--dry-run"]);
    assert!(ok, "{out}");
    assert!(out.contains("Resolved: https://monitor.example/dash"), "{out}");
}
