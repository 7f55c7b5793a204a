//! End-to-end tests of the `ecoarch` binary.
//!
//! External tools are pointed at missing binaries so every command runs on
//! its offline path.

use std::path::Path;
use std::process::{Command, Output};

fn ecoarch(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ecoarch"))
        .args(args)
        .current_dir(dir)
        .env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .env("INFRACOST_BIN", "/nonexistent/infracost")
        .env("TERRAFORM_BIN", "/nonexistent/terraform")
        .env("ECOARCH_DEMO_DELAY_MS", "0")
        .output()
        .expect("failed to run ecoarch")
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

const CART: &str = r#"[
    {"type": "compute", "machine_type": "e2-micro", "disk_size": 20, "software_stack": "web-nginx"},
    {"type": "sql", "db_tier": "db-f1-micro", "db_version": "POSTGRES_15"},
    {"type": "storage", "storage_class": "STANDARD"}
]"#;

#[test]
fn test_recommend_json() {
    let dir = tempfile::tempdir().unwrap();
    let out = ecoarch(
        &["recommend", "--environment", "prod", "--traffic", "high", "--format", "json"],
        dir.path(),
    );
    assert!(out.status.success());

    let rec: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(rec["high_availability"], true);
    assert!(rec["resources"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["type"] == "load_balancer"));
}

#[test]
fn test_recommend_rejects_unknown_choice() {
    let dir = tempfile::tempdir().unwrap();
    let out = ecoarch(&["recommend", "--traffic", "huge"], dir.path());
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_validate_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "cart.json", CART);
    write(dir.path(), "bad.json", r#"[{"type": "compute", "machine_type": "x1-mega"}]"#);

    let ok = ecoarch(&["validate", "--file", "cart.json"], dir.path());
    assert!(ok.status.success());
    let normalized: serde_json::Value = serde_json::from_slice(&ok.stdout).unwrap();
    assert_eq!(normalized.as_array().unwrap().len(), 3);

    let bad = ecoarch(&["validate", "--file", "bad.json"], dir.path());
    assert_eq!(bad.status.code(), Some(3));

    let bad_id = ecoarch(
        &["validate", "--file", "cart.json", "--deployment-id", "Bad_ID"],
        dir.path(),
    );
    assert_eq!(bad_id.status.code(), Some(3));
}

#[test]
fn test_simulate_uses_offline_prices() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "cart.json", CART);

    let out = ecoarch(
        &["simulate", "--file", "cart.json", "--format", "json", "--output", "report.json"],
        dir.path(),
    );
    assert!(out.status.success());

    let result: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(result["monthly_cost"], 18.19);
    assert_eq!(result["details"]["_source"], "offline-fallback");
    assert!(dir.path().join("report.json").exists());
}

#[test]
fn test_budget_gate() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "infracost-report.json",
        r#"{"totalMonthlyCost": "142.50", "currency": "USD", "projects": []}"#,
    );

    let over = ecoarch(&["budget-gate"], dir.path());
    assert_eq!(over.status.code(), Some(6));

    let within = ecoarch(&["budget-gate", "--limit", "150"], dir.path());
    assert!(within.status.success());

    let missing = ecoarch(&["budget-gate", "--report", "nope.json"], dir.path());
    assert_eq!(missing.status.code(), Some(2));
}

#[test]
fn test_deploy_and_destroy_in_demo_mode() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "cart.json", CART);

    let out = ecoarch(
        &["deploy", "--file", "cart.json", "--deployment-id", "abc-123", "--format", "json"],
        dir.path(),
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Deployment abc-123 complete!"));

    let destroy = ecoarch(&["destroy", "--deployment-id", "abc-123"], dir.path());
    assert!(destroy.status.success());
    assert!(String::from_utf8_lossy(&destroy.stdout).contains("Destruction abc-123 complete!"));
}

#[test]
fn test_deploy_over_budget() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "cart.json", CART);

    let out = ecoarch(&["deploy", "--file", "cart.json", "--budget", "10"], dir.path());
    assert_eq!(out.status.code(), Some(6));
}

#[test]
fn test_status_requires_an_id() {
    let dir = tempfile::tempdir().unwrap();
    let out = ecoarch(&["status"], dir.path());
    assert_eq!(out.status.code(), Some(2));
}
