//! Integration and unit tests for the relay binary
mod end_to_end_tests;

use assert_cmd::Command;
use predicates::str::contains;

fn required_env() -> Vec<(&'static str, &'static str)> {
    vec![
        ("TOKENGATE_TOKEN_URL", "http://localhost:3001/oauth2/v1/token"),
        ("TOKENGATE_CLIENT_ID", "client_id"),
        ("TOKENGATE_CLIENT_SECRET", "client_secret"),
        ("TOKENGATE_REDIRECT_URI", "http://localhost:8080/redirect"),
        ("TOKENGATE_UPSTREAM_URL", "http://localhost:9000"),
    ]
}

#[test]
fn check_config_fails_fast_without_required_vars() {
    let mut cmd = Command::cargo_bin("tokengate").unwrap();
    cmd.env_clear().arg("check-config");
    cmd.assert()
        .failure()
        .stderr(contains("TOKENGATE_TOKEN_URL"))
        .stderr(contains("Required variable is missing or empty"));
}

#[test]
fn check_config_reports_effective_configuration() {
    let mut cmd = Command::cargo_bin("tokengate").unwrap();
    cmd.env_clear().envs(required_env()).arg("check-config");
    cmd.assert()
        .success()
        .stdout(contains("Configuration OK"))
        .stdout(contains("http://localhost:9000"))
        .stdout(contains("/api"));
}

#[test]
fn check_config_rejects_invalid_port() {
    let mut cmd = Command::cargo_bin("tokengate").unwrap();
    cmd.env_clear()
        .envs(required_env())
        .env("TOKENGATE_PORT", "not-a-port")
        .arg("check-config");
    cmd.assert()
        .failure()
        .stderr(contains("Invalid port number"));
}

#[test]
fn check_config_rejects_invalid_header_prefix() {
    let mut cmd = Command::cargo_bin("tokengate").unwrap();
    cmd.env_clear()
        .envs(required_env())
        .env("TOKENGATE_HEADER_PREFIX", "Not A Prefix")
        .arg("check-config");
    cmd.assert().failure().stderr(contains("TOKENGATE_HEADER_PREFIX"));
}
