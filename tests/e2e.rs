use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

fn ipsift() -> Command {
    let mut cmd = Command::cargo_bin("ipsift").unwrap();
    cmd.env_remove("LOG_FILE_PATH")
        .env_remove("MONGODB_URI")
        .env_remove("MONGODB_DATABASE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn dry_run_reports_counts_and_cross_check() {
    let tmp = tempdir().unwrap();
    let log_path = tmp.path().join("sample.log");
    {
        let mut f = fs::File::create(&log_path).unwrap();
        writeln!(f, "req from 192.168.1.10 to 8.8.8.8 and 192.168.1.10 again").unwrap();
        writeln!(f, "bogus 999.1.1.1").unwrap();
        writeln!(f, "from 172.16.0.4 via 10.0.0.1").unwrap();
    }

    let mut cmd = ipsift();
    cmd.arg("--dry-run").arg("--log-file").arg(&log_path);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Total lines processed: 3"))
        .stderr(predicate::str::contains("Total IPs found: 5"))
        .stderr(predicate::str::contains("Within-file duplicates: 1"))
        .stderr(predicate::str::contains("New public IPs stored: 1"))
        .stderr(predicate::str::contains("New private IPs stored: 3"))
        .stderr(predicate::str::contains("Cross-check passed"));
}

#[test]
fn log_file_path_is_read_from_environment() {
    let tmp = tempdir().unwrap();
    let log_path = tmp.path().join("env.log");
    fs::write(&log_path, "one 1.1.1.1\n").unwrap();

    let mut cmd = ipsift();
    cmd.env("LOG_FILE_PATH", &log_path).arg("--dry-run");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Total IPs found: 1"));
}

#[test]
fn empty_file_succeeds_with_zero_counters() {
    let tmp = tempdir().unwrap();
    let log_path = tmp.path().join("empty.log");
    fs::write(&log_path, "").unwrap();

    let mut cmd = ipsift();
    cmd.arg("--dry-run").arg("-f").arg(&log_path);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Total lines processed: 0"))
        .stderr(predicate::str::contains("Cross-check - should equal: 0"));
}

#[test]
fn invalid_utf8_bytes_do_not_abort_the_scan() {
    let tmp = tempdir().unwrap();
    let log_path = tmp.path().join("binary.log");
    fs::write(&log_path, b"\xff\xfe garbage 8.8.8.8\n\x80 10.0.0.7\n").unwrap();

    let mut cmd = ipsift();
    cmd.arg("--dry-run")
        .arg("--mmap-threshold")
        .arg("1")
        .arg("-f")
        .arg(&log_path);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Total IPs found: 2"));
}

#[test]
fn quiet_hides_summary() {
    let tmp = tempdir().unwrap();
    let log_path = tmp.path().join("q.log");
    fs::write(&log_path, "1.2.3.4\n").unwrap();

    let mut cmd = ipsift();
    cmd.arg("--dry-run").arg("-q").arg("-f").arg(&log_path);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Total IPs found").not());
}

#[test]
fn missing_log_file_causes_non_zero_exit() {
    let tmp = tempdir().unwrap();
    let missing = tmp.path().join("missing.log");
    let mut cmd = ipsift();
    cmd.arg("--dry-run").arg("-f").arg(&missing);
    cmd.assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("cannot open log file"));
}

#[test]
fn malformed_connection_string_fails_before_scanning() {
    let tmp = tempdir().unwrap();
    let log_path = tmp.path().join("sample.log");
    fs::write(&log_path, "1.2.3.4\n").unwrap();

    let mut cmd = ipsift();
    cmd.arg("-f")
        .arg(&log_path)
        .arg("--mongodb-uri")
        .arg("not-a-connection-string");
    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Total lines processed").not());
}

#[test]
fn unreachable_store_causes_non_zero_exit() {
    let tmp = tempdir().unwrap();
    let log_path = tmp.path().join("sample.log");
    fs::write(&log_path, "1.2.3.4\n").unwrap();

    let mut cmd = ipsift();
    cmd.arg("-f")
        .arg(&log_path)
        .arg("--mongodb-uri")
        .arg("mongodb://127.0.0.1:1/")
        .arg("--timeout")
        .arg("1");
    cmd.assert().failure().code(2);
}
