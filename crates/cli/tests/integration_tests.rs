//! End-to-end tests driving the CLI binary through piped stdin, the same
//! way scripted usage does.

use std::path::Path;
use tempfile::tempdir;

fn run_cli(data_dir: &Path, commands: &str) -> String {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut child = Command::new(env!("CARGO_BIN_EXE_cli"))
        .env("MINIKV_PATH", data_dir)
        .env("MINIKV_SYNC", "always")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn CLI");

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        stdin.write_all(commands.as_bytes()).unwrap();
        stdin.write_all(b"EXIT\n").unwrap();
    }

    let output = child.wait_with_output().expect("failed to read output");
    assert!(output.status.success(), "CLI exited with failure");
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn set_and_get() {
    let dir = tempdir().unwrap();
    let output = run_cli(dir.path(), "SET name alice\nGET name\n");
    assert!(output.contains("OK"));
    assert!(output.contains("alice"));
}

#[test]
fn get_missing_prints_nil() {
    let dir = tempdir().unwrap();
    let output = run_cli(dir.path(), "GET ghost\n");
    assert!(output.contains("(nil)"));
}

#[test]
fn delete_removes_key() {
    let dir = tempdir().unwrap();
    let output = run_cli(dir.path(), "SET k v\nDEL k\nGET k\nEXISTS k\n");
    assert!(output.contains("(nil)"));
    assert!(output.contains("false"));
}

#[test]
fn data_persists_across_runs() {
    let dir = tempdir().unwrap();
    run_cli(dir.path(), "SET persistent yes\n");
    let output = run_cli(dir.path(), "GET persistent\n");
    assert!(output.contains("yes"));
}

#[test]
fn counter_commands() {
    let dir = tempdir().unwrap();
    let output = run_cli(dir.path(), "INCR n\nINCR n\nINCRBY n 10\nDECR n\nGET n\n");
    assert!(output.contains("12"));
    assert!(output.contains("11"));
}

#[test]
fn scan_prints_sorted_pairs() {
    let dir = tempdir().unwrap();
    let output = run_cli(
        dir.path(),
        "SET user:2 b\nSET user:1 a\nSET other x\nSCAN user:\n",
    );
    let scan_start = output.find("user:1 -> a").expect("first key missing");
    let second = output.find("user:2 -> b").expect("second key missing");
    assert!(scan_start < second);
    assert!(output.contains("(2 entries)"));
}

#[test]
fn compact_then_reopen() {
    let dir = tempdir().unwrap();
    run_cli(dir.path(), "SET a 1\nSET b 2\nCOMPACT\nSET c 3\n");
    assert!(dir.path().join("snapshots").exists());
    let output = run_cli(dir.path(), "GET a\nGET b\nGET c\nCOUNT\n");
    assert!(output.contains("1"));
    assert!(output.contains("2"));
    assert!(output.contains("3"));
}

#[test]
fn cas_and_getset() {
    let dir = tempdir().unwrap();
    let output = run_cli(
        dir.path(),
        "SET k old\nCAS k wrong new\nCAS k old new\nGETSET k newest\nGET k\n",
    );
    assert!(output.contains("false"));
    assert!(output.contains("true"));
    assert!(output.contains("new"));
    assert!(output.contains("newest"));
}
