use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONNECTION_ENV: &[&str] = &[
    "REDSHIFT_HOST",
    "PGHOST",
    "REDSHIFT_PORT",
    "PGPORT",
    "REDSHIFT_DATABASE",
    "PGDATABASE",
    "REDSHIFT_USER",
    "PGUSER",
    "REDSHIFT_PASSWORD",
    "PGPASSWORD",
    "PGSSLMODE",
    "RUST_LOG",
];

/// A binary running with an empty home directory.
fn cmd(bin: &str, home: &Path) -> Command {
    let mut cmd = Command::cargo_bin(bin).unwrap();
    cmd.current_dir(home).env("HOME", home);
    for key in CONNECTION_ENV {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn athena_help_lists_aws_flags() {
    let home = TempDir::new().unwrap();
    cmd("athenacli", home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--s3-staging-dir"))
        .stdout(predicate::str::contains("--result-reuse-minutes"))
        .stdout(predicate::str::contains("--table-format"));
}

#[test]
fn redshift_help_is_long_only() {
    let home = TempDir::new().unwrap();
    cmd("redshiftcli", home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--host"))
        .stdout(predicate::str::contains("-U, --user"));
}

#[test]
fn first_run_writes_default_config() {
    let home = TempDir::new().unwrap();
    cmd("athenacli", home.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Welcome to athenacli!"))
        .stdout(predicate::str::contains("run athenacli again"));

    let rc = home.path().join(".athenacli").join("athenaclirc");
    let written = fs::read_to_string(rc).unwrap();
    assert!(written.contains("[aws_profile.default]"));
}

#[test]
fn redshift_first_run_writes_its_own_config() {
    let home = TempDir::new().unwrap();
    cmd("redshiftcli", home.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Welcome to redshiftcli!"));
    assert!(home
        .path()
        .join(".redshiftcli")
        .join("redshiftclirc")
        .exists());
}

#[test]
fn connection_failure_exits_with_message() {
    let home = TempDir::new().unwrap();
    let rc = home.path().join("redshiftclirc");
    let log = home.path().join("redshiftcli.log");
    fs::write(
        &rc,
        format!(
            "[main]\nlog_file = {:?}\n\n[redshift_profile.default]\nuser = \"IAM:alice\"\n",
            log.display().to_string()
        ),
    )
    .unwrap();

    cmd("redshiftcli", home.path())
        .arg("--redshiftclirc")
        .arg(&rc)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Cannot extract cluster identifier from host",
        ))
        .stderr(predicate::str::contains(
            "There was an error while connecting to Redshift",
        ))
        .stderr(predicate::str::contains("run redshiftcli again"));
    assert!(log.exists());
}

#[test]
fn unknown_table_format_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    cmd("athenacli", home.path())
        .args(["--table-format", "xml", "-e", "select 1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("xml"));
}

#[test]
fn piped_session_runs_commands_until_quit() {
    let home = TempDir::new().unwrap();
    let rc = home.path().join("athenaclirc");
    fs::write(
        &rc,
        format!(
            "[main]\nlog_file = {:?}\nhistory_file = {:?}\ntiming = false\n\n\
             [aws_profile.default]\nregion = \"us-east-1\"\n\
             aws_access_key_id = \"AKIDEXAMPLE\"\n\
             aws_secret_access_key = \"secret\"\n\
             s3_staging_dir = \"s3://bucket/results/\"\n",
            home.path().join("athenacli.log").display().to_string(),
            home.path().join("history").display().to_string(),
        ),
    )
    .unwrap();

    cmd("athenacli", home.path())
        .arg("--athenaclirc")
        .arg(&rc)
        // The background completion refresh must fail fast and offline.
        .env("AWS_ENDPOINT_URL", "http://127.0.0.1:9")
        .env("AWS_EC2_METADATA_DISABLED", "true")
        .write_stdin("\\?\n\\T csv\n\\q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Shortcut"))
        .stdout(predicate::str::contains("Changed table format to csv"))
        .stdout(predicate::str::contains("Goodbye!"));
}

