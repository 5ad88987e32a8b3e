//! End-to-end scenarios driven against the compiled `presi` binary, in the
//! same style as the teacher's own `tests/signal_handling.rs` and
//! `tests/job_control_regressions.rs`: spawn the real binary, feed it a
//! batch file, and assert on its stdout.
//!
//! Batch mode is used throughout rather than the interactive prompt so
//! these tests never need a pseudo-tty, and every pipeline here uses
//! `/bin/cat` as its converter so the tests don't depend on real
//! conversion tools (ps2pdf, etc.) being installed on the runner.

use std::io::Write;
use std::process::Command;
use std::time::Duration;

fn run_batch(dir: &std::path::Path, commands: &str) -> String {
    let script_path = dir.join("script.txt");
    std::fs::write(&script_path, commands).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_presi"))
        .arg("--batch")
        .arg(&script_path)
        .arg("--spool-dir")
        .arg(dir.join("spool"))
        .output()
        .expect("failed to run presi");

    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn wait_for_file(path: &std::path::Path, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if path.exists() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    path.exists()
}

#[test]
fn s1_direct_print() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("doc.pdf"), b"hello").unwrap();

    let script = format!(
        "type pdf\nprinter alice pdf\nenable alice\nprint {}\n",
        dir.path().join("doc.pdf").display()
    );
    let stdout = run_batch(dir.path(), &script);

    assert!(stdout.contains("PRINTER: id=0, name=alice, type=pdf, status=disabled"));
    assert!(stdout.contains("PRINTER: id=0, name=alice, type=pdf, status=idle"));
    assert!(wait_for_file(&dir.path().join("spool/alice.out"), Duration::from_secs(2)));
}

#[test]
fn s2_conversion_chain_is_registered_and_used() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("paper.ps"), b"content").unwrap();

    let script = format!(
        "type ps\ntype pdf\nconversion ps pdf /bin/cat\nprinter bob pdf\nenable bob\nprint {}\n",
        dir.path().join("paper.ps").display()
    );
    let stdout = run_batch(dir.path(), &script);

    assert!(stdout.contains("PRINTER: id=0, name=bob, type=pdf, status=idle"));
    assert!(wait_for_file(&dir.path().join("spool/bob.out"), Duration::from_secs(2)));
}

#[test]
fn s3_deferred_scheduling_waits_for_enable() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"text").unwrap();

    let script = format!(
        "type txt\nprinter carol txt\nprint {}\njobs\nenable carol\njobs\n",
        dir.path().join("notes.txt").display()
    );
    let stdout = run_batch(dir.path(), &script);

    // Before `enable carol`, the job must still be Created (never reaches
    // Running in the first `jobs` listing).
    let first_jobs_idx = stdout.find("JOB[0]:").unwrap();
    let enable_idx = stdout
        .find("PRINTER: id=0, name=carol, type=txt, status=idle")
        .unwrap();
    assert!(first_jobs_idx < enable_idx);
    assert!(stdout[first_jobs_idx..enable_idx].contains("Created"));
}

#[test]
fn s5_incompatible_submit_stays_pending() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("photo.jpg"), b"img").unwrap();

    let script = format!(
        "type pdf\ntype jpg\nprinter dan pdf\nenable dan\nprint {}\njobs\n",
        dir.path().join("photo.jpg").display()
    );
    let stdout = run_batch(dir.path(), &script);

    assert!(stdout.contains("JOB[0]:"));
    assert!(!dir.path().join("spool/dan.out").exists());
}

#[test]
fn s6_capacity_rejects_overflow() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
    std::fs::write(dir.path().join("b.txt"), b"b").unwrap();

    let script = format!(
        "type txt\nprint {}\nprint {}\n",
        dir.path().join("a.txt").display(),
        dir.path().join("b.txt").display()
    );

    let script_path = dir.path().join("script.txt");
    std::fs::write(&script_path, &script).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_presi"))
        .arg("--batch")
        .arg(&script_path)
        .arg("--spool-dir")
        .arg(dir.path().join("spool"))
        .arg("--max-jobs")
        .arg("1")
        .output()
        .expect("failed to run presi");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("Command error: print (failed)"));
}

#[test]
fn help_prints_one_line_summary() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_batch(dir.path(), "help\n");
    assert!(stdout.contains("Commands are: help quit type printer conversion"));
}

#[test]
fn unrecognized_command_reports_name() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_batch(dir.path(), "frobnicate\n");
    assert_eq!(stdout.trim(), "Unrecognized command: frobnicate");
}

#[test]
fn wrong_arg_count_matches_standard_format() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_batch(dir.path(), "type\n");
    assert_eq!(
        stdout.trim(),
        "Wrong number of args (given: 0, required: 1) for CLI command 'type'"
    );
}

#[test]
fn pause_and_cancel_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    // sleep keeps the pipeline alive long enough for pause/cancel to land
    // before it would otherwise exit on its own.
    std::fs::write(dir.path().join("big.txt"), b"x".repeat(1024)).unwrap();

    let script = format!(
        "type txt\nprinter erin txt\nenable erin\nprint {}\npause 0\ncancel 0\njobs\n",
        dir.path().join("big.txt").display()
    );
    let stdout = run_batch(dir.path(), &script);
    assert!(stdout.contains("JOB[0]:"));
}
